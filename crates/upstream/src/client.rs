use std::time::Duration;

use jobboard_core::{Job, JobId, TalentId, TalentProfile};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Client for the remote job/talent API.
#[derive(Clone)]
pub struct JobApiClient {
    http: Client,
    base_url: Url,
}

impl JobApiClient {
    /// Creates a client rooted at `base_url`. A trailing slash is appended when
    /// missing so relative joins stay under the base path.
    pub fn new(base_url: Url, http: Client) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(base_url),
        }
    }

    /// Builds a client with its own connection pool and request timeout.
    pub fn with_timeout(base_url: Url, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(base_url, http))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches every job posting. Entries that cannot be read as a job are
    /// skipped so one bad record does not hide the rest.
    pub async fn list_jobs(&self) -> Result<Vec<Job>, UpstreamError> {
        let url = self.base_url.join("jobs/")?;
        let response = self.http.get(url).send().await?;
        let raw: Vec<serde_json::Value> = parse_json(response).await?;
        let total = raw.len();

        let jobs: Vec<Job> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<Job>(value) {
                Ok(job) => Some(job),
                Err(err) => {
                    warn!(stage = "upstream", index, error = %err, "skipping unreadable job");
                    None
                }
            })
            .collect();
        debug!(stage = "upstream", count = jobs.len(), skipped = total - jobs.len(), "jobs fetched");
        Ok(jobs)
    }

    /// Fetches a single job posting.
    pub async fn get_job(&self, job_id: &JobId) -> Result<Job, UpstreamError> {
        let url = self.resource_url("jobs", job_id.as_str())?;
        let response = self.http.get(url).send().await?;
        parse_json(response).await
    }

    /// Fetches a talent profile.
    pub async fn get_talent(&self, talent_id: &TalentId) -> Result<TalentProfile, UpstreamError> {
        let url = self.resource_url("talents", talent_id.as_str())?;
        let response = self.http.get(url).send().await?;
        parse_json(response).await
    }

    /// `{base}/{collection}/{id}/` with `id` percent-encoded as a single segment.
    fn resource_url(&self, collection: &str, id: &str) -> Result<Url, UpstreamError> {
        if matches!(id, "" | "." | "..") {
            return Err(UpstreamError::InvalidId(id.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::CannotBeABase)?
            .pop_if_empty()
            .push(collection)
            .push(id)
            .push("");
        Ok(url)
    }
}

/// Errors produced by the job API client.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments")]
    CannotBeABase,
    #[error("identifier '{0}' cannot address a resource")]
    InvalidId(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl UpstreamError {
    /// Returns `true` when the API answered 404 or the identifier could not
    /// name a resource at all.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == StatusCode::NOT_FOUND,
            Self::InvalidId(_) => true,
            _ => false,
        }
    }
}

async fn parse_json<T>(response: Response) -> Result<T, UpstreamError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(UpstreamError::Status { status, body });
    }

    Ok(response.json().await?)
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
