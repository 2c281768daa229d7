//! Domain layer for the job board feed.
//!
//! Everything here is synchronous and free of I/O: job and talent types, skill
//! normalization, the reaction store and the matching pipeline that derives
//! the feed and reactions views.

pub mod matching;
pub mod reactions;
pub mod skills;
pub mod types;
pub mod view;

pub use matching::{list_reacted_jobs, list_visible_jobs, FilterParams, JobFilters};
pub use reactions::{Reaction, ReactionChange, ReactionMode, ReactionStore, STORAGE_KEY};
pub use skills::{SkillSet, SkillsField};
pub use types::{CompanyRef, EntityId, Job, JobId, JobType, TalentId, TalentProfile, WorkplaceType};
pub use view::ViewState;
