use std::sync::Arc;

use orderflow_domain::event::{OrderCreatedEvent, wire};
use orderflow_messaging::{BrokerChannel, BrokerError, Destination, Publisher};

use crate::domain::repository::OrderEventPort;

/// Publishes order events to the durable `order-created` queue.
pub struct BrokerOrderEvents<C> {
    pub publisher: Arc<Publisher<C>>,
}

impl<C> Clone for BrokerOrderEvents<C> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<C: BrokerChannel> OrderEventPort for BrokerOrderEvents<C> {
    async fn publish_order_created(&self, event: &OrderCreatedEvent) -> Result<(), BrokerError> {
        self.publisher
            .publish(event, &Destination::queue(wire::ORDER_CREATED_QUEUE))
            .await
    }
}
