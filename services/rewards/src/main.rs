use chrono::Utc;
use sea_orm::Database;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use patron_core::config::Config;
use patron_core::tracing::init_tracing;

use patron_rewards::config::RewardsConfig;
use patron_rewards::infra::email::HttpEmailClient;
use patron_rewards::infra::giftcards::HttpGiftCardClient;
use patron_rewards::router::build_router;
use patron_rewards::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = RewardsConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let http = reqwest::Client::new();
    let state = AppState {
        db,
        gift_cards: HttpGiftCardClient::new(
            http.clone(),
            config.pos_base_url.clone(),
            config.pos_access_token.clone(),
        ),
        email: HttpEmailClient::new(
            http,
            config.email_base_url.clone(),
            config.email_api_key.clone(),
        ),
        settings: config.pipeline_settings(),
    };

    // Scheduler loop: same tick as POST /ops/tick, on a timer. A failed
    // tick is logged and the next interval tries again.
    let scheduler_state = state.clone();
    let poll_interval = time::Duration::from_secs(config.poll_interval_secs);
    tokio::spawn(async move {
        let mut interval = time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match scheduler_state.tick_usecase().execute(Utc::now()).await {
                Ok(outcome) if outcome.claimed > 0 => {
                    info!(
                        claimed = outcome.claimed,
                        completed = outcome.completed,
                        rescheduled = outcome.rescheduled,
                        failed = outcome.failed,
                        "scheduler tick"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "scheduler tick failed"),
            }
        }
    });

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.rewards_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("rewards service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
