#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use orderflow_core::error::StoreError;
use orderflow_domain::event::OrderEmailSentEvent;
use orderflow_domain::id::EventId;
use orderflow_messaging::BrokerError;

use crate::domain::types::{Notification, OutboxEvent, OutboxFailure, PendingOutboxEvent};

/// Repository for notifications. The `event_id` column is unique.
pub trait NotificationRepository: Send + Sync {
    async fn exists_by_event_id(&self, event_id: EventId) -> Result<bool, StoreError>;

    /// Insert the notification and its outbox row atomically.
    ///
    /// A second insert for the same `event_id` fails with a unique violation
    /// and leaves no outbox row behind.
    async fn create_with_outbox(
        &self,
        notification: &Notification,
        event: &OutboxEvent,
    ) -> Result<(), StoreError>;

    /// All notifications, oldest first.
    async fn list_all(&self) -> Result<Vec<Notification>, StoreError>;
}

/// Relay-side access to `outbox_events`.
pub trait OutboxRepository: Send + Sync {
    /// Unprocessed, unfailed rows with `next_attempt_at <= now`, oldest first.
    ///
    /// Returned rows are claimed: their `next_attempt_at` moves past `now`, so
    /// another relay does not pick them up until the claim lapses or the row
    /// is settled through `mark_processed` or `record_failure`.
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<PendingOutboxEvent>, StoreError>;

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn record_failure(&self, id: Uuid, failure: &OutboxFailure) -> Result<(), StoreError>;
}

/// Outbound port for order confirmation events.
pub trait EmailSentPort: Send + Sync {
    async fn publish_email_sent(&self, event: &OrderEmailSentEvent) -> Result<(), BrokerError>;
}
