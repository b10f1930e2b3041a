use chrono::Utc;
use uuid::Uuid;

use orderflow_domain::event::OrderCreatedEvent;
use orderflow_domain::id::{EventId, OrderId};
use orderflow_domain::order::OrderStatus;

use crate::domain::repository::{OrderEventPort, OrderRepository};
use crate::domain::types::{Order, validate_order};
use crate::error::OrdersServiceError;

// ── CreateOrder ──────────────────────────────────────────────────────────────

pub struct CreateOrderInput {
    pub customer_email: String,
    pub product_code: String,
    pub quantity: i32,
}

#[derive(Debug)]
pub struct CreateOrderOutput {
    pub order: Order,
    /// `false` when the order was stored but its event could not be published.
    pub event_published: bool,
}

/// Store the order, then announce it.
///
/// The order is committed before publishing and is never rolled back: a
/// publish failure only downgrades the result.
pub struct CreateOrderUseCase<R: OrderRepository, P: OrderEventPort> {
    pub repo: R,
    pub events: P,
}

impl<R: OrderRepository, P: OrderEventPort> CreateOrderUseCase<R, P> {
    pub async fn execute(
        &self,
        input: CreateOrderInput,
    ) -> Result<CreateOrderOutput, OrdersServiceError> {
        let errors = validate_order(&input.customer_email, &input.product_code, input.quantity);
        if !errors.is_empty() {
            return Err(OrdersServiceError::InvalidOrder(errors.join("; ")));
        }

        let order = Order {
            id: OrderId(Uuid::now_v7()),
            customer_email: input.customer_email.trim().to_owned(),
            product_code: input.product_code.trim().to_owned(),
            quantity: input.quantity,
            status: OrderStatus::Created,
            created_at: Utc::now(),
        };
        self.repo.create(&order).await?;

        let event = OrderCreatedEvent {
            event_id: EventId::new(),
            order_id: order.id,
            email: order.customer_email.clone(),
            product_code: order.product_code.clone(),
            quantity: order.quantity,
            created_at: Utc::now(),
        };
        let event_published = match self.events.publish_order_created(&event).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    order_id = %order.id,
                    event_id = %event.event_id,
                    error = %e,
                    "failed to publish order created event"
                );
                false
            }
        };

        Ok(CreateOrderOutput {
            order,
            event_published,
        })
    }
}

// ── GetOrder ─────────────────────────────────────────────────────────────────

pub struct GetOrderUseCase<R: OrderRepository> {
    pub repo: R,
}

impl<R: OrderRepository> GetOrderUseCase<R> {
    pub async fn execute(&self, id: OrderId) -> Result<Order, OrdersServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(OrdersServiceError::OrderNotFound)
    }
}

// ── ListOrders ───────────────────────────────────────────────────────────────

pub struct ListOrdersUseCase<R: OrderRepository> {
    pub repo: R,
}

impl<R: OrderRepository> ListOrdersUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<Order>, OrdersServiceError> {
        Ok(self.repo.list_all().await?)
    }
}
