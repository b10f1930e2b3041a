use chrono::Utc;

use orderflow_core::error::{StoreError, StoreErrorKind};
use orderflow_domain::event::{OrderCreatedEvent, OrderEmailSentEvent};
use orderflow_domain::id::EventId;
use orderflow_messaging::{ApplyOutcome, EventHandler};

use crate::domain::repository::NotificationRepository;
use crate::domain::types::{Notification, OutboxEvent};

/// Records one notification per `OrderCreated` event and queues the
/// `OrderEmailSent` confirmation in the same transaction.
pub struct OrderCreatedHandler<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> EventHandler for OrderCreatedHandler<R> {
    type Event = OrderCreatedEvent;

    async fn already_applied(&self, event: &OrderCreatedEvent) -> Result<bool, StoreError> {
        self.repo.exists_by_event_id(event.event_id).await
    }

    async fn apply(&self, event: &OrderCreatedEvent) -> Result<ApplyOutcome, StoreError> {
        let notification = Notification::for_order_created(event)
            .map_err(|e| StoreError::new(StoreErrorKind::Other, e))?;

        let confirmation = OrderEmailSentEvent {
            event_id: EventId::new(),
            order_id: event.order_id,
            email: event.email.clone(),
            sent_at: Utc::now(),
        };
        let outbox = OutboxEvent::email_sent(&confirmation, event.event_id)
            .map_err(|e| StoreError::new(StoreErrorKind::Other, e))?;

        self.repo.create_with_outbox(&notification, &outbox).await?;
        tracing::info!(
            event_id = %event.event_id,
            order_id = %event.order_id,
            email = %event.email,
            "email sent"
        );
        Ok(ApplyOutcome::Applied)
    }
}
