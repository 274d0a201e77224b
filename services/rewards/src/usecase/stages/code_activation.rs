use rand::RngExt;
use tracing::debug;

use patron_domain::code;

use crate::domain::repository::{ActivationResult, RewardLedger, ValueStorePort};
use crate::domain::types::{
    Fulfillment, Job, JobContext, LedgerEntry, NewJob, NotificationKind, Stage, TriggerType,
};
use crate::error::StageError;
use crate::usecase::fulfillment::FulfillmentStrategy;

/// Deterministic candidates tried before random fallback kicks in.
const DETERMINISTIC_PROBES: u32 = 8;

/// Random candidates tried after the deterministic ones collide.
const RANDOM_PROBES: u32 = 4;

/// Turn a customer who completed their first payment into a referrer:
/// assign a unique personal code and make sure a value store exists to
/// receive future rewards.
pub struct CodeActivationStage<L, V>
where
    L: RewardLedger,
    V: ValueStorePort,
{
    pub ledger: L,
    pub fulfillment: FulfillmentStrategy<V>,
}

impl<L, V> CodeActivationStage<L, V>
where
    L: RewardLedger,
    V: ValueStorePort,
{
    pub async fn execute(&self, job: &Job) -> Result<(), StageError> {
        let customer_id = job.context.customer_id.as_deref().ok_or_else(|| {
            StageError::Permanent("referral-code-activation job missing customer_id".into())
        })?;

        let Some(entry) = self.ledger.find(customer_id).await? else {
            debug!(customer_id, "no ledger entry, nothing to do");
            return Ok(());
        };
        if entry.activated_as_referrer {
            debug!(customer_id, "already activated as referrer");
            return Ok(());
        }

        // Reuse the handle a referred friend already holds; otherwise
        // create an empty, owner-funded store to receive rewards. Order
        // linkage is stripped so a 0-cent load never goes through the
        // purchased-order path.
        let fulfillment = if entry.value_store_handle.is_some() {
            None
        } else {
            let unlinked = LedgerEntry {
                order_id: None,
                line_item_uid: None,
                ..entry.clone()
            };
            Some(self.fulfillment.fulfill(&unlinked, 0).await?)
        };

        // Committed together with the activation write.
        let followup = NewJob::due_now(
            job.correlation_id,
            TriggerType::Pipeline,
            Stage::Notification,
            JobContext {
                customer_id: Some(customer_id.to_owned()),
                notification: Some(NotificationKind::CodeActivated),
                ..Default::default()
            },
        );

        match self
            .assign_code(&entry, fulfillment.as_ref(), &followup)
            .await?
        {
            ActivationResult::Activated => Ok(()),
            ActivationResult::AlreadyActivated => {
                debug!(customer_id, "activation raced, already done");
                Ok(())
            }
            ActivationResult::CodeTaken => Err(StageError::Transient(format!(
                "no free referral code found for {customer_id} after {} probes",
                DETERMINISTIC_PROBES + RANDOM_PROBES
            ))),
        }
    }

    /// Probe the unique constraint: deterministic candidates first so
    /// retries re-propose the same code, then a few random suffixes.
    async fn assign_code(
        &self,
        entry: &LedgerEntry,
        fulfillment: Option<&Fulfillment>,
        followup: &NewJob,
    ) -> Result<ActivationResult, StageError> {
        for probe in 0..DETERMINISTIC_PROBES {
            let candidate = code::candidate(&entry.name, &entry.customer_id, probe);
            match self
                .ledger
                .activate_referrer(&entry.customer_id, &candidate, fulfillment, followup)
                .await?
            {
                ActivationResult::CodeTaken => continue,
                decided => return Ok(decided),
            }
        }
        for _ in 0..RANDOM_PROBES {
            let suffix = rand::rng().random_range(0..10_000u32);
            let candidate = code::candidate(&entry.name, &format!("{suffix}"), 0);
            match self
                .ledger
                .activate_referrer(&entry.customer_id, &candidate, fulfillment, followup)
                .await?
            {
                ActivationResult::CodeTaken => continue,
                decided => return Ok(decided),
            }
        }
        Ok(ActivationResult::CodeTaken)
    }
}
