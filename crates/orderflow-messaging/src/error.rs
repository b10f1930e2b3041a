pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Broker-side failures.
///
/// `ConnectExhausted` is fatal at startup. `Channel` and `ChannelClosed` are
/// connection-level and end the consumer loop that observed them.
/// `TopologyConflict` is a configuration error.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("unable to connect to broker after {attempts} attempts")]
    ConnectExhausted {
        attempts: u32,
        #[source]
        source: Option<BoxError>,
    },
    #[error("broker operation cancelled")]
    Cancelled,
    #[error("{kind} '{name}' already declared with different parameters")]
    TopologyConflict { kind: &'static str, name: String },
    #[error("failed to encode message")]
    Encode(#[from] serde_json::Error),
    #[error("broker rejected the published message")]
    PublishRejected,
    #[error("broker channel closed")]
    ChannelClosed,
    #[error("broker channel error: {0}")]
    Channel(#[source] BoxError),
}

impl BrokerError {
    pub fn channel<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Channel(Box::new(err))
    }

    /// Startup and configuration errors that must abort the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectExhausted { .. } | Self::TopologyConflict { .. }
        )
    }
}
