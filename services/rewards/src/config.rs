use serde::Deserialize;

use patron_core::config::Config;

use crate::domain::types::PipelineSettings;

/// Rewards service configuration loaded from environment variables.
///
/// Connection material is mandatory; every pipeline tunable has a
/// default so a bare deployment behaves sensibly.
#[derive(Debug, Deserialize)]
pub struct RewardsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Base URL of the POS gift-card API.
    pub pos_base_url: String,
    /// Bearer token for the POS gift-card API.
    pub pos_access_token: String,
    /// Base URL of the transactional-email API.
    pub email_base_url: String,
    /// API key for the transactional-email API.
    pub email_api_key: String,
    /// TCP port to listen on (default 3130). Env var: `REWARDS_PORT`.
    #[serde(default = "default_rewards_port")]
    pub rewards_port: u16,
    /// Seconds between scheduler ticks (default 60).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Max jobs claimed per tick (default 10).
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Attempt ceiling before a job goes terminal (default 8).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Seconds a running job may hold its lock before reclaim (default 900).
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: i64,
    /// First retry delay in seconds (default 60); doubles per attempt.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: i64,
    /// Retry delay cap in seconds (default 3600).
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: i64,
    /// Signup bonus loaded onto a referred friend's gift card (default 1000).
    #[serde(default = "default_bonus_amount_cents")]
    pub bonus_amount_cents: i64,
    /// Reward credited to a referrer per completed first payment (default 1000).
    #[serde(default = "default_reward_amount_cents")]
    pub reward_amount_cents: i64,
}

impl Config for RewardsConfig {}

impl RewardsConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_attempts: self.max_attempts,
            staleness: chrono::Duration::seconds(self.staleness_secs),
            backoff_base: chrono::Duration::seconds(self.backoff_base_secs),
            backoff_max: chrono::Duration::seconds(self.backoff_max_secs),
            batch_size: self.batch_size,
            bonus_amount_cents: self.bonus_amount_cents,
            reward_amount_cents: self.reward_amount_cents,
        }
    }
}

fn default_rewards_port() -> u16 {
    3130
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> u64 {
    10
}

fn default_max_attempts() -> i32 {
    8
}

fn default_staleness_secs() -> i64 {
    900
}

fn default_backoff_base_secs() -> i64 {
    60
}

fn default_backoff_max_secs() -> i64 {
    3600
}

fn default_bonus_amount_cents() -> i64 {
    1000
}

fn default_reward_amount_cents() -> i64 {
    1000
}
