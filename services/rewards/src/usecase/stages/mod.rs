pub mod code_activation;
pub mod notification;
pub mod referrer_reward;
pub mod signup_bonus;

use crate::domain::repository::{NotificationPort, RewardLedger, ValueStorePort};
use crate::domain::types::{Job, Stage};
use crate::error::StageError;
use crate::usecase::scheduler::StageDispatch;

use code_activation::CodeActivationStage;
use notification::NotificationStage;
use referrer_reward::FirstPaymentRewardStage;
use signup_bonus::SignupBonusStage;

/// Routes a claimed job to its stage executor.
pub struct PipelineDispatcher<L, V, N>
where
    L: RewardLedger,
    V: ValueStorePort,
    N: NotificationPort,
{
    pub signup_bonus: SignupBonusStage<L, V>,
    pub first_payment_reward: FirstPaymentRewardStage<L, V>,
    pub code_activation: CodeActivationStage<L, V>,
    pub notification: NotificationStage<L, N>,
}

impl<L, V, N> StageDispatch for PipelineDispatcher<L, V, N>
where
    L: RewardLedger,
    V: ValueStorePort,
    N: NotificationPort,
{
    async fn run(&self, job: &Job) -> Result<(), StageError> {
        match job.stage {
            Stage::SignupBonus => self.signup_bonus.execute(job).await,
            Stage::FirstPaymentReward => self.first_payment_reward.execute(job).await,
            Stage::CodeActivation => self.code_activation.execute(job).await,
            Stage::Notification => self.notification.execute(job).await,
        }
    }
}
