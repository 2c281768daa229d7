use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{sse::KeepAlive, sse::Sse, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use jobboard_core::{
    list_reacted_jobs, FilterParams, JobFilters, JobId, Reaction, ReactionChange, ReactionMode,
    SkillSet, TalentId, ViewState,
};
use jobboard_storage::Database;

use crate::feed::{visible_cards, FeedService, FeedView, JobCard};
use crate::problem::ProblemResponse;
use crate::reactions::{ReactionHub, ReactionSnapshot, ReactionStream};
use crate::telemetry;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    reactions: ReactionHub,
    feed: FeedService,
    sse_heartbeat: Duration,
}

impl AppState {
    pub async fn new(
        metrics: PrometheusHandle,
        database: Database,
        feed: FeedService,
        sse_heartbeat: Duration,
    ) -> Self {
        let clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync> = Arc::new(Utc::now);
        let reactions = ReactionHub::load(database.kv(), clock).await;
        Self {
            metrics,
            reactions,
            feed,
            sse_heartbeat,
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn reactions(&self) -> &ReactionHub {
        &self.reactions
    }

    pub fn feed(&self) -> &FeedService {
        &self.feed
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_endpoint))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/reactions", get(list_reactions).delete(clear_all_reactions))
        .route("/reactions/state", get(reaction_state))
        .route("/reactions/stream", get(reaction_stream))
        .route("/reactions/jobs/:job_id", get(get_reaction).delete(clear_reaction))
        .route("/reactions/jobs/:job_id/like", post(toggle_like))
        .route("/reactions/jobs/:job_id/dislike", post(toggle_dislike))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct JobsQuery {
    #[serde(default)]
    view: Option<String>,
    #[serde(default)]
    talent_id: Option<String>,
    #[serde(flatten)]
    filters: FilterParams,
}

#[derive(Debug, Serialize)]
struct FeedPayload {
    view: FeedView,
    count: usize,
    jobs: Vec<JobCard>,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<ViewState<FeedPayload, String>>, ProblemResponse> {
    let view: FeedView = query
        .view
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ProblemResponse::invalid_query)?;
    let talent_id = query
        .talent_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(TalentId::from);
    if view == FeedView::Matches && talent_id.is_none() {
        return Err(ProblemResponse::invalid_query(
            "talent_id is required for the matches view",
        ));
    }
    let filters = JobFilters::from_params(&query.filters);

    let skills_future = async {
        match (&view, &talent_id) {
            (FeedView::Matches, Some(id)) => state.feed().talent_skills(id).await,
            _ => SkillSet::new(),
        }
    };
    let (jobs, skills) = tokio::join!(state.feed().fetch_jobs(), skills_future);
    let reactions = state.reactions().store().await;

    let result = jobs.map(|jobs| {
        let cards = visible_cards(&jobs, &skills, &filters, &reactions);
        FeedPayload {
            view,
            count: cards.len(),
            jobs: cards,
        }
    });

    counter!("feed_requests_total", "view" => view.as_str(), "state" => result.as_str())
        .increment(1);
    info!(
        stage = "feed",
        view = view.as_str(),
        state = result.as_str(),
        count = result.loaded().map(|payload| payload.count).unwrap_or(0),
        filtered = !filters.is_empty(),
        "feed derived"
    );
    Ok(Json(result))
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobCard>, ProblemResponse> {
    let job_id = JobId::from(job_id);
    let job = state.feed().fetch_job(&job_id).await.map_err(|err| {
        if err.is_not_found() {
            ProblemResponse::job_not_found(format!("job {job_id} does not exist"))
        } else {
            warn!(stage = "feed", job_id = %job_id, error = %err, "failed to fetch job");
            ProblemResponse::upstream_unavailable("job service is unavailable")
        }
    })?;
    let reactions = state.reactions().store().await;
    Ok(Json(JobCard::new(job, &reactions, &SkillSet::new())))
}

#[derive(Debug, Deserialize)]
struct ReactionsQuery {
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReactionsPayload {
    mode: ReactionMode,
    count: usize,
    jobs: Vec<JobCard>,
}

async fn list_reactions(
    State(state): State<AppState>,
    Query(query): Query<ReactionsQuery>,
) -> Result<Json<ViewState<ReactionsPayload, String>>, ProblemResponse> {
    let mode: ReactionMode = query
        .mode
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ProblemResponse::invalid_query)?;

    let jobs = state.feed().fetch_jobs().await;
    let reactions = state.reactions().store().await;
    let no_skills = SkillSet::new();

    let result = jobs.map(|jobs| {
        let cards: Vec<JobCard> = list_reacted_jobs(&jobs, &reactions, mode)
            .into_iter()
            .map(|job| JobCard::new(job, &reactions, &no_skills))
            .collect();
        ReactionsPayload {
            mode,
            count: cards.len(),
            jobs: cards,
        }
    });

    counter!("feed_requests_total", "view" => "reactions", "state" => result.as_str())
        .increment(1);
    Ok(Json(result))
}

async fn reaction_state(State(state): State<AppState>) -> Json<ReactionSnapshot> {
    Json(state.reactions().snapshot().await)
}

async fn reaction_stream(
    State(state): State<AppState>,
) -> Result<Sse<ReactionStream>, ProblemResponse> {
    let stream = state.reactions().stream().await.map_err(|err| {
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "stream_unavailable",
            format!("failed to build reaction snapshot: {err}"),
        )
    })?;

    let keep_alive = KeepAlive::new()
        .interval(state.sse_heartbeat)
        .text("heartbeat");
    Ok(Sse::new(stream).keep_alive(keep_alive))
}

#[derive(Debug, Serialize)]
struct ReactionView {
    job_id: JobId,
    reaction: Option<Reaction>,
}

async fn get_reaction(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<ReactionView> {
    let job_id = JobId::from(job_id);
    let reaction = state.reactions().get(&job_id).await;
    Json(ReactionView { job_id, reaction })
}

#[derive(Debug, Serialize)]
struct MutationResponse {
    #[serde(flatten)]
    change: ReactionChange,
    changed: bool,
}

impl From<ReactionChange> for MutationResponse {
    fn from(change: ReactionChange) -> Self {
        Self {
            changed: change.changed(),
            change,
        }
    }
}

async fn toggle_like(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<MutationResponse> {
    let change = state.reactions().toggle_like(&JobId::from(job_id)).await;
    Json(change.into())
}

async fn toggle_dislike(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<MutationResponse> {
    let change = state.reactions().toggle_dislike(&JobId::from(job_id)).await;
    Json(change.into())
}

async fn clear_reaction(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Json<MutationResponse> {
    let change = state.reactions().clear(&JobId::from(job_id)).await;
    Json(change.into())
}

async fn clear_all_reactions(State(state): State<AppState>) -> Json<MutationResponse> {
    let change = state.reactions().clear_all().await;
    Json(change.into())
}
