use chrono::{Duration, Utc};
use uuid::Uuid;

use patron_rewards::domain::repository::JobStore;
use patron_rewards::domain::types::{
    JobContext, JobStatus, NewJob, Stage, TriggerType,
};
use patron_rewards::error::RewardsServiceError;
use patron_rewards::usecase::ops::{ListJobsUseCase, RetriggerStageUseCase, RunAuditUseCase};

use crate::helpers::MockJobStore;

async fn enqueue(
    jobs: &MockJobStore,
    correlation_id: Uuid,
    stage: Stage,
    context: JobContext,
) -> Uuid {
    jobs.enqueue(&NewJob {
        correlation_id,
        trigger_type: TriggerType::Webhook,
        stage,
        context,
        scheduled_at: Utc::now(),
    })
    .await
    .unwrap()
}

/// Claim the job and mark it terminal, the way a tick would.
async fn fail_job(jobs: &MockJobStore, id: Uuid, error: &str) {
    let claimed = jobs
        .claim_due(Utc::now(), Duration::seconds(900), 100)
        .await
        .unwrap();
    let job = claimed.iter().find(|j| j.id == id).unwrap();
    jobs.fail(id, job.attempts, error).await.unwrap();
}

#[tokio::test]
async fn should_list_jobs_by_status() {
    let jobs = MockJobStore::empty();
    let correlation_id = Uuid::new_v4();
    let failed = enqueue(&jobs, correlation_id, Stage::Notification, JobContext::default()).await;
    fail_job(&jobs, failed, "email provider down").await;
    let queued = enqueue(&jobs, correlation_id, Stage::SignupBonus, JobContext::default()).await;

    let usecase = ListJobsUseCase { jobs: jobs.clone() };

    let errored = usecase.execute(JobStatus::Error, 50).await.unwrap();
    assert_eq!(errored.len(), 1);
    assert_eq!(errored[0].id, failed);
    assert_eq!(errored[0].last_error.as_deref(), Some("email provider down"));

    let waiting = usecase.execute(JobStatus::Queued, 50).await.unwrap();
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].id, queued);
}

#[tokio::test]
async fn should_audit_all_jobs_of_a_run_oldest_first() {
    let jobs = MockJobStore::empty();
    let correlation_id = Uuid::new_v4();
    enqueue(&jobs, correlation_id, Stage::FirstPaymentReward, JobContext::default()).await;
    enqueue(&jobs, correlation_id, Stage::CodeActivation, JobContext::default()).await;
    enqueue(&jobs, Uuid::new_v4(), Stage::SignupBonus, JobContext::default()).await;

    let usecase = RunAuditUseCase { jobs: jobs.clone() };
    let run = usecase.execute(correlation_id).await.unwrap();

    assert_eq!(run.len(), 2);
    assert_eq!(run[0].stage, Stage::FirstPaymentReward);
    assert_eq!(run[1].stage, Stage::CodeActivation);
}

#[tokio::test]
async fn should_retrigger_with_previous_context() {
    let jobs = MockJobStore::empty();
    let correlation_id = Uuid::new_v4();
    let context = JobContext {
        customer_id: Some("cus_bob".to_owned()),
        referral_code: Some("ALICE0001".to_owned()),
        ..Default::default()
    };
    let failed = enqueue(&jobs, correlation_id, Stage::SignupBonus, context).await;
    fail_job(&jobs, failed, "pos 500").await;

    let usecase = RetriggerStageUseCase { jobs: jobs.clone() };
    let new_id = usecase
        .execute(correlation_id, Stage::SignupBonus)
        .await
        .unwrap();

    assert_ne!(new_id, failed);
    let stored = jobs.jobs_handle();
    let stored = stored.lock().unwrap();
    let new_job = stored.iter().find(|j| j.id == new_id).unwrap();
    assert_eq!(new_job.status, JobStatus::Queued);
    assert_eq!(new_job.trigger_type, TriggerType::Manual);
    assert_eq!(new_job.correlation_id, correlation_id);
    assert_eq!(new_job.context.customer_id.as_deref(), Some("cus_bob"));
    assert_eq!(new_job.context.referral_code.as_deref(), Some("ALICE0001"));
}

#[tokio::test]
async fn should_refuse_retrigger_for_unknown_run() {
    let jobs = MockJobStore::empty();
    let usecase = RetriggerStageUseCase { jobs };

    let result = usecase.execute(Uuid::new_v4(), Stage::SignupBonus).await;
    assert!(
        matches!(result, Err(RewardsServiceError::JobNotFound)),
        "expected JobNotFound, got {result:?}"
    );
}
