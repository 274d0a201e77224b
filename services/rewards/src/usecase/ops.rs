use uuid::Uuid;

use crate::domain::repository::JobStore;
use crate::domain::types::{Job, JobContext, JobStatus, NewJob, Stage, TriggerType};
use crate::error::RewardsServiceError;

// ── ListJobs ─────────────────────────────────────────────────────────────────

/// Operational job listing, primarily for backlog and stuck-job
/// monitoring (`status=error` is the operator's inbox).
pub struct ListJobsUseCase<J: JobStore> {
    pub jobs: J,
}

impl<J: JobStore> ListJobsUseCase<J> {
    pub async fn execute(
        &self,
        status: JobStatus,
        limit: u64,
    ) -> Result<Vec<Job>, RewardsServiceError> {
        self.jobs.list_by_status(status, limit).await
    }
}

// ── RunAudit ─────────────────────────────────────────────────────────────────

/// Everything the pipeline did for one correlation id, oldest first.
/// The audit "run record" is a projection over the jobs table; no
/// separate table exists.
pub struct RunAuditUseCase<J: JobStore> {
    pub jobs: J,
}

impl<J: JobStore> RunAuditUseCase<J> {
    pub async fn execute(&self, correlation_id: Uuid) -> Result<Vec<Job>, RewardsServiceError> {
        self.jobs.list_by_correlation(correlation_id).await
    }
}

// ── RetriggerStage ───────────────────────────────────────────────────────────

/// Operator recovery: re-enqueue a stage for a correlation id after a
/// terminal `error`. The new job reuses the failed job's context; stage
/// preconditions make re-running an already-succeeded stage harmless.
pub struct RetriggerStageUseCase<J: JobStore> {
    pub jobs: J,
}

impl<J: JobStore> RetriggerStageUseCase<J> {
    pub async fn execute(
        &self,
        correlation_id: Uuid,
        stage: Stage,
    ) -> Result<Uuid, RewardsServiceError> {
        let previous = self
            .jobs
            .find_latest(correlation_id, stage)
            .await?
            .ok_or(RewardsServiceError::JobNotFound)?;
        let context: JobContext = previous.context;
        self.jobs
            .enqueue(&NewJob::due_now(
                correlation_id,
                TriggerType::Manual,
                stage,
                context,
            ))
            .await
    }
}
