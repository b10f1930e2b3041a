use std::time::Duration;

use orderflow_core::config::{env_or, env_required};
use orderflow_messaging::BrokerConfig;

/// Outbox relay tuning.
#[derive(Debug, Clone, Copy)]
pub struct OutboxConfig {
    /// Env var: `OUTBOX_POLL_INTERVAL_MS` (default 1000).
    pub poll_interval: Duration,
    /// Rows fetched per poll. Env var: `OUTBOX_BATCH_SIZE` (default 50).
    pub batch_size: u64,
    /// Publish attempts before a row is marked failed. Env var: `OUTBOX_MAX_ATTEMPTS` (default 10).
    pub max_attempts: i32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            batch_size: 50,
            max_attempts: 10,
        }
    }
}

impl OutboxConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: Duration::from_millis(env_or("OUTBOX_POLL_INTERVAL_MS", 1000)),
            batch_size: env_or("OUTBOX_BATCH_SIZE", defaults.batch_size),
            max_attempts: env_or("OUTBOX_MAX_ATTEMPTS", defaults.max_attempts).max(1),
        }
    }
}

/// Notifications service configuration loaded from environment variables.
#[derive(Debug)]
pub struct NotificationsConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// TCP port for the HTTP server (default 8081). Env var: `NOTIFICATIONS_PORT`.
    pub notifications_port: u16,
    pub broker: BrokerConfig,
    pub outbox: OutboxConfig,
}

impl NotificationsConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env_required("DATABASE_URL"),
            notifications_port: env_or("NOTIFICATIONS_PORT", 8081),
            broker: BrokerConfig::from_env(),
            outbox: OutboxConfig::from_env(),
        }
    }
}
