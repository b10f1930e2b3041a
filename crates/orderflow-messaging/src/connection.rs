use std::future::Future;

use lapin::{Connection, ConnectionProperties};
use tokio_util::sync::CancellationToken;

use crate::amqp::LapinChannel;
use crate::config::{BrokerConfig, RetryPolicy};
use crate::error::{BoxError, BrokerError};

/// Run `attempt` until it succeeds, at most `policy.max_attempts` times.
///
/// Waits `policy.delay` between attempts. Cancellation is observed before each
/// attempt, during the attempt itself and during the delay; it ends the loop
/// with [`BrokerError::Cancelled`]. Exhausting the budget returns
/// [`BrokerError::ConnectExhausted`] carrying the last failure.
pub async fn connect_with_retry<T, E, F, Fut>(
    target: &str,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T, BrokerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError> + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error: Option<BoxError> = None;

    for n in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(BrokerError::Cancelled);
        }
        tracing::info!(target_addr = %target, attempt = n, max_attempts, "connecting to broker");

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(BrokerError::Cancelled),
            outcome = attempt() => outcome,
        };
        match outcome {
            Ok(value) => {
                tracing::info!(target_addr = %target, attempt = n, "connected to broker");
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(
                    target_addr = %target,
                    attempt = n,
                    max_attempts,
                    error = %e,
                    "broker connection attempt failed"
                );
                last_error = Some(e.into());
            }
        }

        if n < max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(BrokerError::Cancelled),
                _ = tokio::time::sleep(policy.delay) => {}
            }
        }
    }

    tracing::error!(target_addr = %target, attempts = max_attempts, "broker unreachable, giving up");
    Err(BrokerError::ConnectExhausted {
        attempts: max_attempts,
        source: last_error,
    })
}

/// One broker connection and the channel opened on it.
///
/// Owned by the component that connected. [`BrokerConnection::close`] releases
/// the channel first, then the connection.
pub struct BrokerConnection {
    connection: Connection,
    channel: LapinChannel,
}

impl BrokerConnection {
    pub async fn connect(
        config: &BrokerConfig,
        cancel: &CancellationToken,
    ) -> Result<Self, BrokerError> {
        let uri = config.amqp_uri();
        let uri = uri.as_str();
        let connection = connect_with_retry(&config.endpoint(), config.retry, cancel, || {
            Connection::connect(uri, ConnectionProperties::default())
        })
        .await?;

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = connection.close(200, "OK").await {
                    tracing::error!(error = %close_err, "failed to close broker connection");
                }
                return Err(BrokerError::channel(e));
            }
        };

        Ok(Self {
            connection,
            channel: LapinChannel::new(channel),
        })
    }

    /// A handle to the channel. Cloning shares the underlying AMQP channel.
    pub fn channel(&self) -> LapinChannel {
        self.channel.clone()
    }

    /// Close channel then connection. Failures are logged, never returned.
    pub async fn close(self) {
        if let Err(e) = self.channel.inner().close(200, "OK").await {
            tracing::error!(error = %e, "failed to close broker channel");
        }
        if let Err(e) = self.connection.close(200, "OK").await {
            tracing::error!(error = %e, "failed to close broker connection");
        }
        tracing::info!("broker connection closed");
    }
}
