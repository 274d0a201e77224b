#![allow(async_fn_in_trait)]

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::types::{
    FirstContact, Fulfillment, Job, JobStatus, LedgerEntry, NewEvent, NewJob, Stage,
};
use crate::error::{NotificationError, RewardsServiceError, ValueStoreError};

/// Append-only ledger of inbound platform events.
pub trait EventLedger: Send + Sync {
    /// Insert the event record and its initial job (if any) in one
    /// transaction. Returns `false` when the event id is already
    /// recorded — the unique constraint is the dedup primitive, so a
    /// racing duplicate insert lands here too, not in an error.
    async fn record(
        &self,
        event: &NewEvent,
        job: Option<&NewJob>,
    ) -> Result<bool, RewardsServiceError>;

    /// Correlation id assigned when this event id was first recorded.
    async fn find_correlation(&self, event_id: &str) -> Result<Option<Uuid>, RewardsServiceError>;
}

/// Persisted job queue. All coordination between scheduler instances
/// goes through these operations; no in-memory locking anywhere.
pub trait JobStore: Send + Sync {
    async fn enqueue(&self, job: &NewJob) -> Result<Uuid, RewardsServiceError>;

    /// Claim up to `limit` due jobs: queued with `scheduled_at <= now`,
    /// or running with a lock older than `staleness` (stuck-job
    /// reclaim). Each claim is a conditional update on (id, status,
    /// attempts) — a compare-and-swap — so concurrent schedulers never
    /// claim the same job twice. Claiming sets status = running,
    /// locked_at = now, attempts += 1.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        staleness: Duration,
        limit: u64,
    ) -> Result<Vec<Job>, RewardsServiceError>;

    /// `attempts` is the claim token from `claim_due`: every outcome
    /// write re-checks it, so a superseded claimant (its job reclaimed
    /// as stale by another scheduler) cannot overwrite the new claim.
    async fn complete(&self, id: Uuid, attempts: i32) -> Result<(), RewardsServiceError>;

    /// Return a job to the queue for a later attempt.
    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), RewardsServiceError>;

    /// Terminal failure; requires operator intervention to re-trigger.
    async fn fail(&self, id: Uuid, attempts: i32, error: &str)
    -> Result<(), RewardsServiceError>;

    async fn list_by_status(
        &self,
        status: JobStatus,
        limit: u64,
    ) -> Result<Vec<Job>, RewardsServiceError>;

    /// All jobs for one correlation id, oldest first (run audit view).
    async fn list_by_correlation(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<Job>, RewardsServiceError>;

    /// Most recent job for (correlation id, stage), any status.
    async fn find_latest(
        &self,
        correlation_id: Uuid,
        stage: Stage,
    ) -> Result<Option<Job>, RewardsServiceError>;
}

/// Outcome of a conditional referral-code activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationResult {
    Activated,
    /// Another execution already activated this customer.
    AlreadyActivated,
    /// The proposed code collided with the unique constraint.
    CodeTaken,
}

/// The reward ledger. Every write that guards a monetary effect is a
/// conditional update re-verifying the precondition, so duplicate and
/// racing executions collapse to at most one effective mutation.
pub trait RewardLedger: Send + Sync {
    async fn find(&self, customer_id: &str) -> Result<Option<LedgerEntry>, RewardsServiceError>;

    async fn find_by_code(&self, code: &str)
    -> Result<Option<LedgerEntry>, RewardsServiceError>;

    /// First-contact upsert: creates the entry if absent, otherwise
    /// fills in contact and order-linkage fields that are still null.
    /// Never downgrades progress flags or totals.
    async fn upsert_contact(&self, contact: &FirstContact) -> Result<(), RewardsServiceError>;

    /// Set the signup-bonus flags and value-store metadata, guarded by
    /// `got_signup_bonus = false`, and enqueue `followup` in the same
    /// transaction. Returns `false` if the guard failed, in which case
    /// nothing is written.
    async fn grant_signup_bonus(
        &self,
        customer_id: &str,
        used_code: &str,
        fulfillment: &Fulfillment,
        followup: &NewJob,
    ) -> Result<bool, RewardsServiceError>;

    /// One transaction: flip the payer's `first_payment_completed` flag
    /// (guarded by it being false), credit the referrer's totals by one
    /// referral / `amount_cents` with the fulfillment metadata, and
    /// enqueue the follow-up jobs. Returns `false` when the guard
    /// failed — the whole settlement rolls back, so a transient failure
    /// anywhere inside never leaves the flag set with the credit or the
    /// chained jobs missing.
    async fn settle_first_payment(
        &self,
        payer_id: &str,
        referrer_id: &str,
        amount_cents: i64,
        fulfillment: &Fulfillment,
        followups: &[NewJob],
    ) -> Result<bool, RewardsServiceError>;

    /// Assign a personal code and flip `activated_as_referrer`, guarded
    /// by the flag being false and the code's unique constraint. On
    /// `Activated`, `followup` is enqueued in the same transaction.
    async fn activate_referrer(
        &self,
        customer_id: &str,
        code: &str,
        fulfillment: Option<&Fulfillment>,
        followup: &NewJob,
    ) -> Result<ActivationResult, RewardsServiceError>;
}

/// Result of order-based activation (the path with rich metadata).
#[derive(Debug, Clone)]
pub struct OrderActivation {
    pub handle: String,
    pub activation_url: Option<String>,
    pub pass_url: Option<String>,
}

/// Current state of a value-store instance.
#[derive(Debug, Clone)]
pub struct ValueStoreState {
    pub balance_cents: i64,
    pub state: String,
}

/// Port for the POS gift-card API.
pub trait ValueStorePort: Send + Sync {
    /// Create a new instance loaded with `amount_cents` (owner-funded).
    async fn create_instance(&self, amount_cents: i64) -> Result<String, ValueStoreError>;

    /// Incremental adjustment against an existing handle. Returns the
    /// new balance.
    async fn top_up(&self, handle: &str, amount_cents: i64) -> Result<i64, ValueStoreError>;

    /// Activate via a purchased order line item.
    async fn activate_via_order(
        &self,
        order_id: &str,
        line_item_uid: &str,
    ) -> Result<OrderActivation, ValueStoreError>;

    async fn retrieve(&self, handle: &str) -> Result<ValueStoreState, ValueStoreError>;
}

/// Port for the transactional-email API.
pub trait NotificationPort: Send + Sync {
    /// Deliver one templated message. Failures carry the retryable /
    /// permanent classification so the stage can map them directly.
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        variables: &serde_json::Value,
    ) -> Result<(), NotificationError>;
}
