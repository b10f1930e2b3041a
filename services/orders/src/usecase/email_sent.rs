use orderflow_core::error::StoreError;
use orderflow_domain::event::OrderEmailSentEvent;
use orderflow_domain::order::OrderStatus;
use orderflow_messaging::{ApplyOutcome, EventHandler};

use crate::domain::repository::OrderRepository;

/// Moves an order to `EMAIL_SENT` when the notifications service confirms
/// the email.
///
/// Applying the transition twice leaves the same state, so the order's own
/// status serves as the idempotency record. An unknown order is reported as
/// [`ApplyOutcome::SubjectMissing`]: the confirmation may overtake the order
/// write or refer to a deleted order.
pub struct OrderEmailSentHandler<R: OrderRepository> {
    pub repo: R,
}

impl<R: OrderRepository> EventHandler for OrderEmailSentHandler<R> {
    type Event = OrderEmailSentEvent;

    async fn already_applied(&self, event: &OrderEmailSentEvent) -> Result<bool, StoreError> {
        let order = self.repo.find_by_id(event.order_id).await?;
        Ok(order.is_some_and(|o| o.status == OrderStatus::EmailSent))
    }

    async fn apply(&self, event: &OrderEmailSentEvent) -> Result<ApplyOutcome, StoreError> {
        let updated = self
            .repo
            .update_status(event.order_id, OrderStatus::EmailSent)
            .await?;
        if !updated {
            return Ok(ApplyOutcome::SubjectMissing);
        }
        tracing::info!(order_id = %event.order_id, status = %OrderStatus::EmailSent, "order status updated");
        Ok(ApplyOutcome::Applied)
    }
}
