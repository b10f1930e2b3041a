#![allow(async_fn_in_trait)]

use orderflow_core::error::StoreError;
use orderflow_domain::event::OrderCreatedEvent;
use orderflow_domain::id::OrderId;
use orderflow_domain::order::OrderStatus;
use orderflow_messaging::BrokerError;

use crate::domain::types::Order;

/// Repository for orders.
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders, oldest first.
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Set the status of an order. Returns `false` if no order has this id.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError>;
}

/// Outbound port for order lifecycle events.
pub trait OrderEventPort: Send + Sync {
    async fn publish_order_created(&self, event: &OrderCreatedEvent) -> Result<(), BrokerError>;
}
