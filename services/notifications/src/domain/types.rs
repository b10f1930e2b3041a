use chrono::{DateTime, Utc};
use uuid::Uuid;

use orderflow_domain::event::{OrderCreatedEvent, OrderEmailSentEvent, WireEvent};
use orderflow_domain::id::{EventId, OrderId};

/// `type` of a notification recorded for an `OrderCreated` event.
pub const ORDER_CREATED_TYPE: &str = "ORDER_CREATED";

/// Upper bound on the delay between two relay attempts of an outbox row.
pub const MAX_RETRY_DELAY_SECS: i64 = 300;

/// How long a fetched outbox row stays hidden from other relays.
pub const CLAIM_LEASE_SECS: i64 = 60;

/// The idempotency record of a processed `OrderCreated` event.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub event_id: EventId,
    pub order_id: OrderId,
    pub email: String,
    pub notification_type: String,
    pub delivered: bool,
    pub error_message: Option<String>,
    /// The event as received.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn for_order_created(event: &OrderCreatedEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::now_v7(),
            event_id: event.event_id,
            order_id: event.order_id,
            email: event.email.clone(),
            notification_type: ORDER_CREATED_TYPE.to_owned(),
            delivered: true,
            error_message: None,
            payload: serde_json::to_value(event)?,
            created_at: event.created_at,
        })
    }
}

/// A new outbox row, written in the same transaction as its cause.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

impl OutboxEvent {
    /// Queue an `OrderEmailSentEvent` caused by the event `cause`.
    ///
    /// The idempotency key is derived from the cause so a redelivered
    /// `OrderCreated` can never enqueue a second confirmation.
    pub fn email_sent(event: &OrderEmailSentEvent, cause: EventId) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::now_v7(),
            kind: OrderEmailSentEvent::KIND.to_owned(),
            payload: serde_json::to_value(event)?,
            idempotency_key: format!("{}:{cause}", OrderEmailSentEvent::KIND),
        })
    }
}

/// An outbox row due for relay.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    /// Failed attempts so far.
    pub attempts: i32,
}

/// Bookkeeping for a failed relay attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxFailure {
    pub attempts: i32,
    pub last_error: String,
    pub next_attempt_at: DateTime<Utc>,
    /// Set once the attempt budget is spent; the row is never retried again.
    pub failed_at: Option<DateTime<Utc>>,
}

impl OutboxFailure {
    pub fn after(
        pending: &PendingOutboxEvent,
        error: impl Into<String>,
        max_attempts: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let attempts = pending.attempts.saturating_add(1);
        Self {
            attempts,
            last_error: error.into(),
            next_attempt_at: now + retry_delay(attempts),
            failed_at: (attempts >= max_attempts).then_some(now),
        }
    }

    /// A failure no retry can fix, such as an unknown kind or a corrupt payload.
    pub fn permanent(pending: &PendingOutboxEvent, error: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            attempts: pending.attempts.saturating_add(1),
            last_error: error.into(),
            next_attempt_at: now,
            failed_at: Some(now),
        }
    }
}

/// `2^attempts` seconds, capped at [`MAX_RETRY_DELAY_SECS`].
pub fn retry_delay(attempts: i32) -> chrono::Duration {
    let exp = attempts.clamp(0, 31) as u32;
    let secs = 2i64.saturating_pow(exp).min(MAX_RETRY_DELAY_SECS);
    chrono::Duration::seconds(secs)
}
