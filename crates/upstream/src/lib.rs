pub mod client;

pub use client::{JobApiClient, UpstreamError};
