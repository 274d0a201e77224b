use tracing::{debug, warn};

use crate::domain::repository::{RewardLedger, ValueStorePort};
use crate::domain::types::{Job, JobContext, NewJob, NotificationKind, Stage, TriggerType};
use crate::error::StageError;
use crate::usecase::fulfillment::FulfillmentStrategy;

/// Issue the signup bonus to a referred friend.
///
/// Idempotency contract: an unresolvable code, a missing ledger entry,
/// or an already-set `got_signup_bonus` flag all complete as no-ops —
/// that is how duplicate and re-delivered triggers are absorbed.
pub struct SignupBonusStage<L, V>
where
    L: RewardLedger,
    V: ValueStorePort,
{
    pub ledger: L,
    pub fulfillment: FulfillmentStrategy<V>,
    pub bonus_amount_cents: i64,
}

impl<L, V> SignupBonusStage<L, V>
where
    L: RewardLedger,
    V: ValueStorePort,
{
    pub async fn execute(&self, job: &Job) -> Result<(), StageError> {
        let customer_id = job
            .context
            .customer_id
            .as_deref()
            .ok_or_else(|| StageError::Permanent("signup-bonus job missing customer_id".into()))?;

        let Some(entry) = self.ledger.find(customer_id).await? else {
            debug!(customer_id, "no ledger entry, nothing to do");
            return Ok(());
        };
        if entry.got_signup_bonus {
            debug!(customer_id, "signup bonus already granted");
            return Ok(());
        }
        let Some(code) = job.context.referral_code.as_deref() else {
            debug!(customer_id, "no referral code cited");
            return Ok(());
        };
        let Some(referrer) = self.ledger.find_by_code(code).await? else {
            debug!(customer_id, code, "referral code does not resolve");
            return Ok(());
        };
        if referrer.customer_id == entry.customer_id {
            debug!(customer_id, code, "self-referral refused");
            return Ok(());
        }

        let fulfillment = self
            .fulfillment
            .fulfill(&entry, self.bonus_amount_cents)
            .await?;

        // Precondition re-verified at write time; the grant and the
        // chained notification commit together, and losing the race
        // means another execution already granted the bonus.
        let followup = NewJob::due_now(
            job.correlation_id,
            TriggerType::Pipeline,
            Stage::Notification,
            JobContext {
                customer_id: Some(customer_id.to_owned()),
                notification: Some(NotificationKind::BonusIssued),
                ..Default::default()
            },
        );
        let granted = self
            .ledger
            .grant_signup_bonus(customer_id, code, &fulfillment, &followup)
            .await?;
        if !granted {
            warn!(customer_id, "lost signup-bonus write race, treating as done");
        }
        Ok(())
    }
}
