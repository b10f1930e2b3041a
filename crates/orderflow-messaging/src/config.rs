use std::fmt;
use std::time::Duration;

use orderflow_core::config::{env_or, env_string_or};

/// Bounded retry for establishing a broker connection at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total connection attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed delay between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

/// Broker settings read at startup. Defaults target a local RabbitMQ.
#[derive(Clone)]
pub struct BrokerConfig {
    /// Env var: `RABBITMQ_HOST` (default `localhost`).
    pub host: String,
    /// Env var: `RABBITMQ_PORT` (default 5672).
    pub port: u16,
    /// Env var: `RABBITMQ_USERNAME` (default `guest`).
    pub username: String,
    /// Env var: `RABBITMQ_PASSWORD` (default `guest`).
    pub password: String,
    /// Env var: `RABBITMQ_VHOST` (default `/`).
    pub vhost: String,
    /// Env vars: `RABBITMQ_STARTUP_RETRY_COUNT`, `RABBITMQ_STARTUP_RETRY_DELAY_SECONDS`.
    pub retry: RetryPolicy,
    /// Maximum unacknowledged deliveries per consumer. Env var: `RABBITMQ_PREFETCH` (default 10).
    pub prefetch: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5672,
            username: "guest".to_owned(),
            password: "guest".to_owned(),
            vhost: "/".to_owned(),
            retry: RetryPolicy::default(),
            prefetch: 10,
        }
    }
}

impl BrokerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_string_or("RABBITMQ_HOST", &defaults.host),
            port: env_or("RABBITMQ_PORT", defaults.port),
            username: env_string_or("RABBITMQ_USERNAME", &defaults.username),
            password: env_string_or("RABBITMQ_PASSWORD", &defaults.password),
            vhost: env_string_or("RABBITMQ_VHOST", &defaults.vhost),
            retry: RetryPolicy {
                max_attempts: env_or("RABBITMQ_STARTUP_RETRY_COUNT", defaults.retry.max_attempts),
                delay: Duration::from_secs(env_or(
                    "RABBITMQ_STARTUP_RETRY_DELAY_SECONDS",
                    defaults.retry.delay.as_secs(),
                )),
            },
            prefetch: env_or("RABBITMQ_PREFETCH", defaults.prefetch),
        }
    }

    /// `host:port`, for logs.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// AMQP URI with the vhost percent-encoded (`/` becomes `%2f`).
    pub fn amqp_uri(&self) -> String {
        let vhost = self.vhost.replace('%', "%25").replace('/', "%2f");
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, vhost
        )
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vhost", &self.vhost)
            .field("retry", &self.retry)
            .field("prefetch", &self.prefetch)
            .finish()
    }
}
