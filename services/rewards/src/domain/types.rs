use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline stage. Each stage has one executor, its own precondition
/// against the reward ledger, and a fixed follow-up chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SignupBonus,
    FirstPaymentReward,
    CodeActivation,
    Notification,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignupBonus => "signup-bonus",
            Self::FirstPaymentReward => "first-payment-reward",
            Self::CodeActivation => "referral-code-activation",
            Self::Notification => "notification-dispatch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signup-bonus" => Some(Self::SignupBonus),
            "first-payment-reward" => Some(Self::FirstPaymentReward),
            "referral-code-activation" => Some(Self::CodeActivation),
            "notification-dispatch" => Some(Self::Notification),
            _ => None,
        }
    }
}

/// Job lifecycle: queued → running → completed | queued (retry) | error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// What put the job on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    /// Created at webhook ingestion.
    Webhook,
    /// Chained by a prior stage executor.
    Pipeline,
    /// Re-enqueued by an operator.
    Manual,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Pipeline => "pipeline",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "webhook" => Some(Self::Webhook),
            "pipeline" => Some(Self::Pipeline),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Which message a notification-dispatch job should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BonusIssued,
    RewardCredited,
    CodeActivated,
}

impl NotificationKind {
    pub fn template(&self) -> &'static str {
        match self {
            Self::BonusIssued => "referral-bonus-issued",
            Self::RewardCredited => "referral-reward-credited",
            Self::CodeActivated => "referral-code-activated",
        }
    }
}

/// Event context a job carries through the pipeline. All fields
/// optional; each executor validates what it needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    /// Set on notification-dispatch jobs by the enqueuing stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationKind>,
}

/// A claimed or persisted pipeline work item.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub trigger_type: TriggerType,
    pub stage: Stage,
    pub status: JobStatus,
    pub attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub context: JobContext,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert form of a job (id, status, attempts assigned by the store).
#[derive(Debug, Clone)]
pub struct NewJob {
    pub correlation_id: Uuid,
    pub trigger_type: TriggerType,
    pub stage: Stage,
    pub context: JobContext,
    pub scheduled_at: DateTime<Utc>,
}

impl NewJob {
    /// A job due immediately.
    pub fn due_now(
        correlation_id: Uuid,
        trigger_type: TriggerType,
        stage: Stage,
        context: JobContext,
    ) -> Self {
        Self {
            correlation_id,
            trigger_type,
            stage,
            context,
            scheduled_at: Utc::now(),
        }
    }
}

/// Inbound event record (append-only audit + dedup).
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub id: Uuid,
    pub event_id: String,
    pub event_type: String,
    pub resource_id: Option<String>,
    pub correlation_id: Uuid,
    pub received_at: DateTime<Utc>,
}

/// Which activation path actually delivered a fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryChannel {
    TopUp,
    OrderActivation,
    OwnerFunded,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopUp => "top-up",
            Self::OrderActivation => "order-activation",
            Self::OwnerFunded => "owner-funded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "top-up" => Some(Self::TopUp),
            "order-activation" => Some(Self::OrderActivation),
            "owner-funded" => Some(Self::OwnerFunded),
            _ => None,
        }
    }
}

/// Normalized fulfillment result. Tagged with the channel taken so
/// downstream code never branches on which optional fields are set.
#[derive(Debug, Clone)]
pub struct Fulfillment {
    pub handle: String,
    pub channel: DeliveryChannel,
    pub activation_url: Option<String>,
    pub pass_url: Option<String>,
}

/// Per-customer reward ledger entry: the source of idempotency truth.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub customer_id: String,
    pub name: String,
    pub email: Option<String>,
    pub personal_code: Option<String>,
    pub value_store_handle: Option<String>,
    pub got_signup_bonus: bool,
    pub activated_as_referrer: bool,
    pub first_payment_completed: bool,
    pub used_referral_code: Option<String>,
    pub total_referrals: i32,
    pub total_rewards_cents: i64,
    pub delivery_channel: Option<DeliveryChannel>,
    pub activation_url: Option<String>,
    pub pass_url: Option<String>,
    pub order_id: Option<String>,
    pub line_item_uid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// First-contact data harvested from a webhook payload. Upserted into
/// the ledger at ingestion so stage executors always find an entry.
#[derive(Debug, Clone)]
pub struct FirstContact {
    pub customer_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub order_id: Option<String>,
    pub line_item_uid: Option<String>,
}

/// Pipeline tunables. All values come from env config; none are
/// hard-coded because staleness and the attempt ceiling directly trade
/// recovery latency against false-positive reclaims.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_attempts: i32,
    pub staleness: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub batch_size: u64,
    pub bonus_amount_cents: i64,
    pub reward_amount_cents: i64,
}
