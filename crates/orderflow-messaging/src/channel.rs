#![allow(async_fn_in_trait)]

use futures::Stream;

use crate::error::BrokerError;
use crate::topology::{Binding, ExchangeSpec, QueueSpec};

/// A message handed to the consumer, still unacknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundDelivery {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub body: Vec<u8>,
}

/// A message ready to be transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Empty string routes through the default exchange.
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    /// Delivery mode 2; the broker writes the message to disk.
    pub persistent: bool,
    pub content_type: &'static str,
    pub message_id: Option<String>,
}

/// The subset of an AMQP channel the publish/consume pipeline relies on.
///
/// Implemented by [`crate::LapinChannel`] in production and by an in-memory
/// channel in tests.
pub trait BrokerChannel: Send + Sync {
    type Deliveries: Stream<Item = Result<InboundDelivery, BrokerError>> + Send + Unpin;

    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), BrokerError>;

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), BrokerError>;

    async fn bind_queue(&self, binding: &Binding) -> Result<(), BrokerError>;

    async fn publish(&self, message: OutboundMessage) -> Result<(), BrokerError>;

    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError>;

    /// Subscribe with manual acknowledgement.
    async fn consume(&self, queue: &str, consumer_tag: &str)
    -> Result<Self::Deliveries, BrokerError>;

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError>;

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError>;
}
