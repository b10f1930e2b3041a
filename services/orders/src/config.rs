use orderflow_core::config::{env_or, env_required};
use orderflow_messaging::BrokerConfig;

/// Orders service configuration loaded from environment variables.
#[derive(Debug)]
pub struct OrdersConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// TCP port for the HTTP server (default 8080). Env var: `ORDERS_PORT`.
    pub orders_port: u16,
    pub broker: BrokerConfig,
}

impl OrdersConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env_required("DATABASE_URL"),
            orders_port: env_or("ORDERS_PORT", 8080),
            broker: BrokerConfig::from_env(),
        }
    }
}
