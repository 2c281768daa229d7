use std::{collections::HashMap, str::FromStr, sync::Arc, time::Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use jobboard_core::matching::is_skill_match;
use jobboard_core::{
    Job, JobFilters, JobId, Reaction, ReactionStore, SkillSet, TalentId, ViewState,
};
use jobboard_upstream::{JobApiClient, UpstreamError};

/// Which job list a request asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedView {
    #[default]
    All,
    Matches,
}

impl FeedView {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Matches => "matches",
        }
    }
}

impl FromStr for FeedView {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "matches" => Ok(Self::Matches),
            other => Err(format!("unknown view '{other}'")),
        }
    }
}

/// Job as presented to the UI: the posting plus its reaction and display defaults.
#[derive(Debug, Clone, Serialize)]
pub struct JobCard {
    #[serde(flatten)]
    pub job: Job,
    pub reaction: Option<Reaction>,
    pub matched: bool,
    pub logo_url: String,
    pub description_text: String,
}

impl JobCard {
    pub fn new(job: Job, reactions: &ReactionStore, skills: &SkillSet) -> Self {
        Self {
            reaction: reactions.get(&job.id),
            matched: is_skill_match(&job, skills),
            logo_url: job.logo_url().to_string(),
            description_text: job.display_description().to_string(),
            job,
        }
    }
}

pub type JobsView = ViewState<Arc<Vec<Job>>, String>;

/// Fetches upstream data for view activations.
#[derive(Clone)]
pub struct FeedService {
    client: JobApiClient,
    skills: Arc<RwLock<HashMap<TalentId, SkillSet>>>,
}

impl FeedService {
    pub fn new(client: JobApiClient) -> Self {
        Self {
            client,
            skills: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetches the job list once. Failures become a failed view.
    pub async fn fetch_jobs(&self) -> JobsView {
        let result = observe("jobs", self.client.list_jobs())
            .await
            .map(Arc::new)
            .map_err(|err| {
                warn!(stage = "feed", error = %err, "failed to fetch jobs");
                err.to_string()
            });
        ViewState::from_result(result)
    }

    pub async fn fetch_job(&self, job_id: &JobId) -> Result<Job, UpstreamError> {
        observe("job", self.client.get_job(job_id)).await
    }

    /// Skill set of a talent, fetched on first use and cached afterwards.
    /// Fetch failures yield an empty set, which disables ranking.
    pub async fn talent_skills(&self, talent_id: &TalentId) -> SkillSet {
        if let Some(skills) = self.skills.read().await.get(talent_id) {
            return skills.clone();
        }

        match observe("talent", self.client.get_talent(talent_id)).await {
            Ok(profile) => {
                debug!(stage = "feed", talent_id = %talent_id, skills = profile.skills.len(), "talent skills cached");
                self.skills
                    .write()
                    .await
                    .insert(talent_id.clone(), profile.skills.clone());
                profile.skills
            }
            Err(err) => {
                warn!(stage = "feed", talent_id = %talent_id, error = %err, "failed to fetch talent; ranking disabled");
                SkillSet::new()
            }
        }
    }
}

/// Derives the feed for a view activation.
pub fn visible_cards(
    jobs: &[Job],
    skills: &SkillSet,
    filters: &JobFilters,
    reactions: &ReactionStore,
) -> Vec<JobCard> {
    jobboard_core::list_visible_jobs(jobs, skills, filters)
        .into_iter()
        .map(|job| JobCard::new(job, reactions, skills))
        .collect()
}

async fn observe<T, F>(endpoint: &'static str, request: F) -> Result<T, UpstreamError>
where
    F: std::future::Future<Output = Result<T, UpstreamError>>,
{
    let started = Instant::now();
    let result = request.await;
    histogram!("upstream_request_seconds", "endpoint" => endpoint)
        .record(started.elapsed().as_secs_f64());
    let outcome = if result.is_ok() { "ok" } else { "error" };
    counter!("upstream_requests_total", "endpoint" => endpoint, "result" => outcome).increment(1);
    result
}
