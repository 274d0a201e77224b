use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{Job, JobStatus, Stage};
use crate::error::RewardsServiceError;
use crate::state::AppState;
use crate::usecase::ops::{ListJobsUseCase, RetriggerStageUseCase, RunAuditUseCase};
use crate::usecase::scheduler::TickOutcome;

#[derive(Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub trigger_type: &'static str,
    pub stage: &'static str,
    pub status: &'static str,
    pub attempts: i32,
    #[serde(serialize_with = "patron_core::serde::to_rfc3339_ms")]
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "patron_core::serde::opt_to_rfc3339_ms")]
    pub locked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub context: serde_json::Value,
    pub last_error: Option<String>,
    #[serde(serialize_with = "patron_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "patron_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            correlation_id: job.correlation_id,
            trigger_type: job.trigger_type.as_str(),
            stage: job.stage.as_str(),
            status: job.status.as_str(),
            attempts: job.attempts,
            scheduled_at: job.scheduled_at,
            locked_at: job.locked_at,
            context: serde_json::to_value(&job.context).unwrap_or_default(),
            last_error: job.last_error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

// ── GET /ops/jobs ────────────────────────────────────────────────────────────

fn default_limit() -> u64 {
    50
}

#[derive(Deserialize)]
pub struct ListJobsQuery {
    pub status: String,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobResponse>>, RewardsServiceError> {
    let status = JobStatus::parse(&query.status)
        .ok_or_else(|| RewardsServiceError::UnknownStatus(query.status.clone()))?;
    let usecase = ListJobsUseCase {
        jobs: state.job_store(),
    };
    let jobs = usecase.execute(status, query.limit).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

// ── GET /ops/runs/{correlation_id} ───────────────────────────────────────────

pub async fn run_audit(
    State(state): State<AppState>,
    Path(correlation_id): Path<Uuid>,
) -> Result<Json<Vec<JobResponse>>, RewardsServiceError> {
    let usecase = RunAuditUseCase {
        jobs: state.job_store(),
    };
    let jobs = usecase.execute(correlation_id).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

// ── POST /ops/retrigger ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RetriggerRequest {
    pub correlation_id: Uuid,
    pub stage: String,
}

#[derive(Serialize)]
pub struct RetriggerResponse {
    pub job_id: Uuid,
}

pub async fn retrigger_stage(
    State(state): State<AppState>,
    Json(body): Json<RetriggerRequest>,
) -> Result<(StatusCode, Json<RetriggerResponse>), RewardsServiceError> {
    let stage = Stage::parse(&body.stage)
        .ok_or_else(|| RewardsServiceError::UnknownStage(body.stage.clone()))?;
    let usecase = RetriggerStageUseCase {
        jobs: state.job_store(),
    };
    let job_id = usecase.execute(body.correlation_id, stage).await?;
    Ok((StatusCode::ACCEPTED, Json(RetriggerResponse { job_id })))
}

// ── POST /ops/tick ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct TickResponse {
    pub claimed: usize,
    pub completed: usize,
    pub rescheduled: usize,
    pub failed: usize,
}

impl From<TickOutcome> for TickResponse {
    fn from(outcome: TickOutcome) -> Self {
        Self {
            claimed: outcome.claimed,
            completed: outcome.completed,
            rescheduled: outcome.rescheduled,
            failed: outcome.failed,
        }
    }
}

/// Run one scheduler pass on demand. Same code path as the timer loop,
/// so operators can drain a backlog without waiting for the interval.
pub async fn run_tick(
    State(state): State<AppState>,
) -> Result<Json<TickResponse>, RewardsServiceError> {
    let outcome = state.tick_usecase().execute(chrono::Utc::now()).await?;
    Ok(Json(outcome.into()))
}
