use chrono::Utc;
use uuid::Uuid;

use patron_domain::code;
use patron_domain::event::{EventKind, WebhookEvent};

use crate::domain::repository::{EventLedger, RewardLedger};
use crate::domain::types::{FirstContact, JobContext, NewEvent, NewJob, Stage, TriggerType};
use crate::error::RewardsServiceError;

/// Payment status that makes a `payment.updated` event actionable.
const PAYMENT_COMPLETED: &str = "COMPLETED";

pub struct IngestEventInput {
    pub event: WebhookEvent,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub accepted: bool,
    pub correlation_id: Uuid,
}

/// The at-least-once → at-most-once boundary. Records every verified
/// event exactly once (unique event_id) and enqueues the first
/// applicable pipeline job in the same transaction.
pub struct IngestEventUseCase<E, L>
where
    E: EventLedger,
    L: RewardLedger,
{
    pub events: E,
    pub ledger: L,
}

impl<E, L> IngestEventUseCase<E, L>
where
    E: EventLedger,
    L: RewardLedger,
{
    pub async fn execute(
        &self,
        input: IngestEventInput,
    ) -> Result<IngestOutcome, RewardsServiceError> {
        let event = input.event;
        if event.event_id.is_empty() {
            return Err(RewardsServiceError::MissingEventId);
        }

        // First-contact upkeep runs before the dedup gate: the upsert
        // is idempotent, and executors rely on the entry existing.
        if let Some(contact) = first_contact(&event) {
            self.ledger.upsert_contact(&contact).await?;
        }

        let correlation_id = Uuid::new_v4();
        let job = initial_job(&event, correlation_id);
        let record = NewEvent {
            id: Uuid::new_v4(),
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            resource_id: event.data_str("id").map(str::to_owned),
            correlation_id,
            received_at: Utc::now(),
        };

        if self.events.record(&record, job.as_ref()).await? {
            tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                correlation_id = %correlation_id,
                enqueued = job.is_some(),
                "event accepted"
            );
            return Ok(IngestOutcome {
                accepted: true,
                correlation_id,
            });
        }

        // Duplicate delivery: answer with the original correlation id.
        let correlation_id = self
            .events
            .find_correlation(&event.event_id)
            .await?
            .unwrap_or(correlation_id);
        tracing::debug!(event_id = %event.event_id, "duplicate event ignored");
        Ok(IngestOutcome {
            accepted: false,
            correlation_id,
        })
    }
}

/// Contact and order-linkage fields carried by the payload, if any.
fn first_contact(event: &WebhookEvent) -> Option<FirstContact> {
    let customer_id = match event.kind() {
        EventKind::CustomerCreated => event.data_str("id")?,
        EventKind::BookingCreated | EventKind::PaymentUpdated => event.data_str("customer_id")?,
        EventKind::Other => return None,
    };
    Some(FirstContact {
        customer_id: customer_id.to_owned(),
        name: event.data_str("given_name").map(str::to_owned),
        email: event.data_str("email_address").map(str::to_owned),
        order_id: event.data_str("order_id").map(str::to_owned),
        line_item_uid: event.data_str("line_item_uid").map(str::to_owned),
    })
}

/// The first applicable stage for an event type, or `None` when the
/// event is recorded for audit only.
fn initial_job(event: &WebhookEvent, correlation_id: Uuid) -> Option<NewJob> {
    match event.kind() {
        EventKind::CustomerCreated => {
            let context = JobContext {
                customer_id: event.data_str("id").map(str::to_owned),
                referral_code: normalized_code(event),
                ..Default::default()
            };
            context.customer_id.as_ref()?;
            Some(NewJob::due_now(
                correlation_id,
                TriggerType::Webhook,
                Stage::SignupBonus,
                context,
            ))
        }
        EventKind::BookingCreated => {
            let context = JobContext {
                customer_id: event.data_str("customer_id").map(str::to_owned),
                booking_id: event.data_str("id").map(str::to_owned),
                referral_code: normalized_code(event),
                ..Default::default()
            };
            context.customer_id.as_ref()?;
            Some(NewJob::due_now(
                correlation_id,
                TriggerType::Webhook,
                Stage::SignupBonus,
                context,
            ))
        }
        EventKind::PaymentUpdated => {
            // Only a completed payment triggers the referrer reward; any
            // other status update is recorded for audit only.
            if event.data_str("status") != Some(PAYMENT_COMPLETED) {
                return None;
            }
            let context = JobContext {
                customer_id: event.data_str("customer_id").map(str::to_owned),
                payment_id: event.data_str("id").map(str::to_owned),
                ..Default::default()
            };
            context.customer_id.as_ref()?;
            Some(NewJob::due_now(
                correlation_id,
                TriggerType::Webhook,
                Stage::FirstPaymentReward,
                context,
            ))
        }
        EventKind::Other => None,
    }
}

fn normalized_code(event: &WebhookEvent) -> Option<String> {
    let normalized = code::normalize(event.data_str("referral_code")?);
    code::is_plausible(&normalized).then_some(normalized)
}
