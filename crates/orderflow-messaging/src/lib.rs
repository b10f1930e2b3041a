//! Reliable publish/consume over an AMQP broker.
//!
//! Delivery is at-least-once: publishers mark every message persistent,
//! consumers acknowledge manually and rely on an idempotency store keyed by
//! the event id to absorb redeliveries.
//!
//! ```text
//! BrokerConnection::connect ──► TopologyDeclarator ──► Publisher::publish
//!                                      │
//!                                      └──► ConsumerLoop::run ──► process_delivery ──► ack | nack(requeue)
//! ```

pub mod amqp;
pub mod channel;
pub mod codec;
pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod publisher;
pub mod topology;

pub use amqp::LapinChannel;
pub use channel::{BrokerChannel, InboundDelivery, OutboundMessage};
pub use config::{BrokerConfig, RetryPolicy};
pub use connection::{BrokerConnection, connect_with_retry};
pub use consumer::{
    AckReason, ApplyOutcome, ConsumerLoop, ConsumerStats, Disposition, EventHandler,
    process_delivery,
};
pub use error::BrokerError;
pub use publisher::{Destination, Publisher};
pub use topology::{Binding, ExchangeKind, ExchangeSpec, QueueSpec, Topology, TopologyDeclarator};
