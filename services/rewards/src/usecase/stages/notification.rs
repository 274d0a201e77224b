use serde_json::json;
use tracing::warn;

use patron_domain::money::format_cents;

use crate::domain::repository::{NotificationPort, RewardLedger};
use crate::domain::types::{Job, NotificationKind};
use crate::error::StageError;

/// Deliver the customer-facing message for a pipeline milestone.
///
/// Failures here never touch the monetary state already committed by
/// earlier stages — the job retries independently.
pub struct NotificationStage<L, N>
where
    L: RewardLedger,
    N: NotificationPort,
{
    pub ledger: L,
    pub notifier: N,
    pub bonus_amount_cents: i64,
    pub reward_amount_cents: i64,
}

impl<L, N> NotificationStage<L, N>
where
    L: RewardLedger,
    N: NotificationPort,
{
    pub async fn execute(&self, job: &Job) -> Result<(), StageError> {
        let kind = job.context.notification.ok_or_else(|| {
            StageError::Permanent("notification-dispatch job missing kind".into())
        })?;
        let customer_id = job.context.customer_id.as_deref().ok_or_else(|| {
            StageError::Permanent("notification-dispatch job missing customer_id".into())
        })?;

        let Some(entry) = self.ledger.find(customer_id).await? else {
            warn!(customer_id, "no ledger entry for notification, skipping");
            return Ok(());
        };
        let Some(email) = entry.email.as_deref() else {
            warn!(customer_id, "no email on file, notification skipped");
            return Ok(());
        };

        let variables = match kind {
            NotificationKind::BonusIssued => json!({
                "name": entry.name,
                "amount": format_cents(self.bonus_amount_cents),
                "activation_url": entry.activation_url,
            }),
            NotificationKind::RewardCredited => json!({
                "name": entry.name,
                "amount": format_cents(self.reward_amount_cents),
                "total_rewards": format_cents(entry.total_rewards_cents),
            }),
            NotificationKind::CodeActivated => json!({
                "name": entry.name,
                "code": entry.personal_code,
            }),
        };

        self.notifier.send(kind.template(), email, &variables).await?;
        Ok(())
    }
}
