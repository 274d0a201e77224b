use tracing::{debug, warn};

use crate::domain::repository::{RewardLedger, ValueStorePort};
use crate::domain::types::{Job, JobContext, NewJob, NotificationKind, Stage, TriggerType};
use crate::error::StageError;
use crate::usecase::fulfillment::FulfillmentStrategy;

/// Credit the referrer when their referred friend completes a first
/// payment, then chain the friend's own code activation.
///
/// The external credit happens before the ledger settlement: a missed
/// credit is not detectable afterwards, while the settlement — flag
/// flip, referrer totals and the chained jobs in one transaction —
/// guarantees at-most-once totals even if two claims race, and leaves
/// the flag unset whenever any of those writes fails.
pub struct FirstPaymentRewardStage<L, V>
where
    L: RewardLedger,
    V: ValueStorePort,
{
    pub ledger: L,
    pub fulfillment: FulfillmentStrategy<V>,
    pub reward_amount_cents: i64,
}

impl<L, V> FirstPaymentRewardStage<L, V>
where
    L: RewardLedger,
    V: ValueStorePort,
{
    pub async fn execute(&self, job: &Job) -> Result<(), StageError> {
        let payer_id = job.context.customer_id.as_deref().ok_or_else(|| {
            StageError::Permanent("first-payment-reward job missing customer_id".into())
        })?;

        let Some(payer) = self.ledger.find(payer_id).await? else {
            debug!(payer_id, "no ledger entry, nothing to do");
            return Ok(());
        };
        if payer.first_payment_completed {
            debug!(payer_id, "first payment already processed");
            return Ok(());
        }
        let Some(code) = payer.used_referral_code.as_deref() else {
            debug!(payer_id, "payer was not referred");
            return Ok(());
        };
        let Some(referrer) = self.ledger.find_by_code(code).await? else {
            debug!(payer_id, code, "referrer no longer resolves");
            return Ok(());
        };

        // Existing handle → top-up; the strategy never creates a second
        // value store for the referrer.
        let fulfillment = self
            .fulfillment
            .fulfill(&referrer, self.reward_amount_cents)
            .await?;

        let followups = [
            NewJob::due_now(
                job.correlation_id,
                TriggerType::Pipeline,
                Stage::CodeActivation,
                JobContext {
                    customer_id: Some(payer_id.to_owned()),
                    ..Default::default()
                },
            ),
            NewJob::due_now(
                job.correlation_id,
                TriggerType::Pipeline,
                Stage::Notification,
                JobContext {
                    customer_id: Some(referrer.customer_id.clone()),
                    notification: Some(NotificationKind::RewardCredited),
                    ..Default::default()
                },
            ),
        ];
        let settled = self
            .ledger
            .settle_first_payment(
                payer_id,
                &referrer.customer_id,
                self.reward_amount_cents,
                &fulfillment,
                &followups,
            )
            .await?;
        if !settled {
            warn!(payer_id, "lost first-payment write race, treating as done");
        }
        Ok(())
    }
}
