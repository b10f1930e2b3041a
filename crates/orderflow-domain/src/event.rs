//! Events exchanged between services over the broker.
//!
//! Field names are PascalCase on the wire: the legacy producers serialize
//! with that casing and both sides must agree byte-for-byte on names.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::{EventId, OrderId};

/// Queue, exchange and routing-key literals. Publisher and consumer must use
/// the exact same strings; changing one is a breaking wire change.
pub mod wire {
    /// Durable queue carrying `OrderCreatedEvent`, published via the default exchange.
    pub const ORDER_CREATED_QUEUE: &str = "order-created";
    /// Topic exchange carrying order lifecycle confirmations.
    pub const ORDERS_EXCHANGE: &str = "orders.exchange";
    /// Routing key for `OrderEmailSentEvent` on `ORDERS_EXCHANGE`.
    pub const EMAIL_SENT_ROUTING_KEY: &str = "email-sent";
    /// Queue the orders service binds to `ORDERS_EXCHANGE`.
    pub const ORDER_SERVICE_QUEUE: &str = "order-service";
}

/// An event that travels over the broker and is deduplicated by its id.
pub trait WireEvent: Serialize + DeserializeOwned + Send + Sync {
    /// Stable event kind, used in logs and outbox rows.
    const KIND: &'static str;

    fn event_id(&self) -> EventId;

    fn subject_id(&self) -> OrderId;
}

/// Published by the orders service after an order is durably stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderCreatedEvent {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub email: String,
    pub product_code: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl WireEvent for OrderCreatedEvent {
    const KIND: &'static str = "order_created";

    fn event_id(&self) -> EventId {
        self.event_id
    }

    fn subject_id(&self) -> OrderId {
        self.order_id
    }
}

/// Published by the notifications service once the confirmation email is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderEmailSentEvent {
    pub event_id: EventId,
    pub order_id: OrderId,
    pub email: String,
    pub sent_at: DateTime<Utc>,
}

impl WireEvent for OrderEmailSentEvent {
    const KIND: &'static str = "order_email_sent";

    fn event_id(&self) -> EventId {
        self.event_id
    }

    fn subject_id(&self) -> OrderId {
        self.order_id
    }
}
