use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::domain::repository::JobStore;
use crate::domain::types::{Job, PipelineSettings};
use crate::error::{RewardsServiceError, StageError};

/// Seam between the claim loop and the stage executors, so the tick
/// use case can be exercised without a full pipeline behind it.
#[allow(async_fn_in_trait)]
pub trait StageDispatch: Send + Sync {
    async fn run(&self, job: &Job) -> Result<(), StageError>;
}

/// Exponential retry delay: `base * 2^(attempts-1)`, capped.
pub fn backoff(settings: &PipelineSettings, attempts: i32) -> Duration {
    let exp = attempts.saturating_sub(1).clamp(0, 16) as u32;
    let secs = settings
        .backoff_base
        .num_seconds()
        .saturating_mul(1i64 << exp);
    Duration::seconds(secs.min(settings.backoff_max.num_seconds()))
}

/// Outcome counters for one scheduler tick.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub claimed: usize,
    pub completed: usize,
    pub rescheduled: usize,
    pub failed: usize,
}

/// One scheduler tick: claim due (and stale-running) jobs, run each
/// stage, and persist the outcome. The use case holds no state beyond
/// its settings — the trigger can be a timer, an HTTP hit, or a test.
pub struct RunTickUseCase<J, D>
where
    J: JobStore,
    D: StageDispatch,
{
    pub jobs: J,
    pub dispatch: D,
    pub settings: PipelineSettings,
}

impl<J, D> RunTickUseCase<J, D>
where
    J: JobStore,
    D: StageDispatch,
{
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<TickOutcome, RewardsServiceError> {
        let claimed = self
            .jobs
            .claim_due(now, self.settings.staleness, self.settings.batch_size)
            .await?;

        let mut outcome = TickOutcome {
            claimed: claimed.len(),
            ..Default::default()
        };

        for job in &claimed {
            match self.dispatch.run(job).await {
                Ok(()) => {
                    self.jobs.complete(job.id, job.attempts).await?;
                    outcome.completed += 1;
                    info!(
                        job_id = %job.id,
                        correlation_id = %job.correlation_id,
                        stage = job.stage.as_str(),
                        attempts = job.attempts,
                        "job completed"
                    );
                }
                Err(stage_error @ StageError::Transient(_))
                    if job.attempts < self.settings.max_attempts =>
                {
                    // Persist the same classified form `fail` records.
                    let message = stage_error.to_string();
                    let at = now + backoff(&self.settings, job.attempts);
                    self.jobs
                        .reschedule(job.id, job.attempts, at, &message)
                        .await?;
                    outcome.rescheduled += 1;
                    warn!(
                        job_id = %job.id,
                        correlation_id = %job.correlation_id,
                        stage = job.stage.as_str(),
                        attempts = job.attempts,
                        retry_at = %at,
                        error = %message,
                        "job rescheduled"
                    );
                }
                // Permanent failure, or the attempt ceiling is reached:
                // terminal either way, operator recovery via re-trigger.
                Err(stage_error) => {
                    let message = stage_error.to_string();
                    self.jobs.fail(job.id, job.attempts, &message).await?;
                    outcome.failed += 1;
                    error!(
                        job_id = %job.id,
                        correlation_id = %job.correlation_id,
                        stage = job.stage.as_str(),
                        attempts = job.attempts,
                        error = %message,
                        "job failed"
                    );
                }
            }
        }
        Ok(outcome)
    }
}
