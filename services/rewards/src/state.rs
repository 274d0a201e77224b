use sea_orm::DatabaseConnection;

use crate::domain::types::PipelineSettings;
use crate::infra::db::{DbEventLedger, DbJobStore, DbRewardLedger};
use crate::infra::email::HttpEmailClient;
use crate::infra::giftcards::HttpGiftCardClient;
use crate::usecase::fulfillment::FulfillmentStrategy;
use crate::usecase::scheduler::RunTickUseCase;
use crate::usecase::stages::PipelineDispatcher;
use crate::usecase::stages::code_activation::CodeActivationStage;
use crate::usecase::stages::notification::NotificationStage;
use crate::usecase::stages::referrer_reward::FirstPaymentRewardStage;
use crate::usecase::stages::signup_bonus::SignupBonusStage;

/// Shared application state passed to every handler via axum `State`,
/// and cloned into the scheduler loop.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub gift_cards: HttpGiftCardClient,
    pub email: HttpEmailClient,
    pub settings: PipelineSettings,
}

impl AppState {
    pub fn event_ledger(&self) -> DbEventLedger {
        DbEventLedger {
            db: self.db.clone(),
        }
    }

    pub fn job_store(&self) -> DbJobStore {
        DbJobStore {
            db: self.db.clone(),
        }
    }

    pub fn reward_ledger(&self) -> DbRewardLedger {
        DbRewardLedger {
            db: self.db.clone(),
        }
    }

    pub fn fulfillment(&self) -> FulfillmentStrategy<HttpGiftCardClient> {
        FulfillmentStrategy {
            value_store: self.gift_cards.clone(),
        }
    }

    pub fn dispatcher(
        &self,
    ) -> PipelineDispatcher<DbRewardLedger, HttpGiftCardClient, HttpEmailClient> {
        PipelineDispatcher {
            signup_bonus: SignupBonusStage {
                ledger: self.reward_ledger(),
                fulfillment: self.fulfillment(),
                bonus_amount_cents: self.settings.bonus_amount_cents,
            },
            first_payment_reward: FirstPaymentRewardStage {
                ledger: self.reward_ledger(),
                fulfillment: self.fulfillment(),
                reward_amount_cents: self.settings.reward_amount_cents,
            },
            code_activation: CodeActivationStage {
                ledger: self.reward_ledger(),
                fulfillment: self.fulfillment(),
            },
            notification: NotificationStage {
                ledger: self.reward_ledger(),
                notifier: self.email.clone(),
                bonus_amount_cents: self.settings.bonus_amount_cents,
                reward_amount_cents: self.settings.reward_amount_cents,
            },
        }
    }

    pub fn tick_usecase(
        &self,
    ) -> RunTickUseCase<
        DbJobStore,
        PipelineDispatcher<DbRewardLedger, HttpGiftCardClient, HttpEmailClient>,
    > {
        RunTickUseCase {
            jobs: self.job_store(),
            dispatch: self.dispatcher(),
            settings: self.settings.clone(),
        }
    }
}
