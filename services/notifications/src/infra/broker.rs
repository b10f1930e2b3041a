use std::sync::Arc;

use orderflow_domain::event::{OrderEmailSentEvent, wire};
use orderflow_messaging::{BrokerChannel, BrokerError, Destination, Publisher};

use crate::domain::repository::EmailSentPort;

/// Publishes confirmations to `orders.exchange` under `email-sent`.
pub struct BrokerEmailSentEvents<C> {
    pub publisher: Arc<Publisher<C>>,
}

impl<C> Clone for BrokerEmailSentEvents<C> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl<C: BrokerChannel> EmailSentPort for BrokerEmailSentEvents<C> {
    async fn publish_email_sent(&self, event: &OrderEmailSentEvent) -> Result<(), BrokerError> {
        self.publisher
            .publish(
                event,
                &Destination::topic(wire::ORDERS_EXCHANGE, wire::EMAIL_SENT_ROUTING_KEY),
            )
            .await
    }
}
