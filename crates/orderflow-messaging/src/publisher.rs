use orderflow_domain::event::WireEvent;

use crate::channel::{BrokerChannel, OutboundMessage};
use crate::codec;
use crate::error::BrokerError;
use crate::topology::{ExchangeSpec, QueueSpec, Topology, TopologyDeclarator};

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Straight to a queue through the default exchange.
    Queue(QueueSpec),
    /// To an exchange under a routing key. Bindings belong to consumers.
    Exchange {
        exchange: ExchangeSpec,
        routing_key: String,
    },
}

impl Destination {
    /// A durable queue addressed through the default exchange.
    pub fn queue(name: impl Into<String>) -> Self {
        Self::Queue(QueueSpec::durable(name))
    }

    /// A durable topic exchange.
    pub fn topic(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self::Exchange {
            exchange: ExchangeSpec::topic(exchange),
            routing_key: routing_key.into(),
        }
    }

    fn topology(&self) -> Topology {
        match self {
            Self::Queue(spec) => Topology::queue(spec.clone()),
            Self::Exchange { exchange, .. } => Topology::exchange(exchange.clone()),
        }
    }

    fn address(&self) -> (&str, &str) {
        match self {
            Self::Queue(spec) => ("", spec.name.as_str()),
            Self::Exchange {
                exchange,
                routing_key,
            } => (exchange.name.as_str(), routing_key.as_str()),
        }
    }
}

/// Publishes typed events as persistent JSON messages.
///
/// Never retries. Callers decide whether a failure is fatal; the store-then-notify
/// flows treat it as a degraded success.
pub struct Publisher<C> {
    topology: TopologyDeclarator<C>,
}

impl<C: BrokerChannel> Publisher<C> {
    pub fn new(channel: C) -> Self {
        Self {
            topology: TopologyDeclarator::new(channel),
        }
    }

    pub fn channel(&self) -> &C {
        self.topology.channel()
    }

    pub async fn publish<E: WireEvent>(
        &self,
        event: &E,
        destination: &Destination,
    ) -> Result<(), BrokerError> {
        self.topology.declare(&destination.topology()).await?;

        let body = codec::encode(event)?;
        let (exchange, routing_key) = destination.address();
        let message = OutboundMessage {
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            body,
            persistent: true,
            content_type: codec::CONTENT_TYPE,
            message_id: Some(event.event_id().to_string()),
        };

        self.topology.channel().publish(message).await?;
        tracing::info!(
            event_id = %event.event_id(),
            kind = E::KIND,
            exchange,
            routing_key,
            "event published"
        );
        Ok(())
    }
}
