//! lapin-backed [`BrokerChannel`].

use futures::StreamExt;
use futures::stream::BoxStream;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use lapin::types::FieldTable;
use lapin::BasicProperties;

use crate::channel::{BrokerChannel, InboundDelivery, OutboundMessage};
use crate::error::BrokerError;
use crate::topology::{Binding, ExchangeKind, ExchangeSpec, QueueSpec};

const PERSISTENT_DELIVERY_MODE: u8 = 2;

#[derive(Clone)]
pub struct LapinChannel {
    inner: lapin::Channel,
}

impl LapinChannel {
    pub fn new(inner: lapin::Channel) -> Self {
        Self { inner }
    }

    /// Turn on publisher confirms so `publish` resolves only after the broker
    /// has taken responsibility for the message.
    pub async fn enable_confirms(&self) -> Result<(), BrokerError> {
        self.inner
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(BrokerError::channel)
    }

    pub fn inner(&self) -> &lapin::Channel {
        &self.inner
    }
}

impl BrokerChannel for LapinChannel {
    type Deliveries = BoxStream<'static, Result<InboundDelivery, BrokerError>>;

    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), BrokerError> {
        let options = ExchangeDeclareOptions {
            durable: spec.durable,
            auto_delete: spec.auto_delete,
            ..ExchangeDeclareOptions::default()
        };
        self.inner
            .exchange_declare(&spec.name, lapin_kind(spec.kind), options, FieldTable::default())
            .await
            .map_err(|e| declare_error(e, "exchange", &spec.name))
    }

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), BrokerError> {
        let options = QueueDeclareOptions {
            durable: spec.durable,
            exclusive: spec.exclusive,
            auto_delete: spec.auto_delete,
            ..QueueDeclareOptions::default()
        };
        self.inner
            .queue_declare(&spec.name, options, FieldTable::default())
            .await
            .map(|_| ())
            .map_err(|e| declare_error(e, "queue", &spec.name))
    }

    async fn bind_queue(&self, binding: &Binding) -> Result<(), BrokerError> {
        self.inner
            .queue_bind(
                &binding.queue,
                &binding.exchange,
                &binding.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::channel)
    }

    async fn publish(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        let mut properties =
            BasicProperties::default().with_content_type(message.content_type.into());
        if message.persistent {
            properties = properties.with_delivery_mode(PERSISTENT_DELIVERY_MODE);
        }
        if let Some(id) = message.message_id {
            properties = properties.with_message_id(id.into());
        }

        let confirm = self
            .inner
            .basic_publish(
                &message.exchange,
                &message.routing_key,
                BasicPublishOptions::default(),
                &message.body,
                properties,
            )
            .await
            .map_err(BrokerError::channel)?;
        let confirmation = confirm.await.map_err(BrokerError::channel)?;
        if confirmation.is_nack() {
            return Err(BrokerError::PublishRejected);
        }
        Ok(())
    }

    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError> {
        self.inner
            .basic_qos(count, BasicQosOptions::default())
            .await
            .map_err(BrokerError::channel)
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Self::Deliveries, BrokerError> {
        let options = BasicConsumeOptions {
            no_ack: false,
            ..BasicConsumeOptions::default()
        };
        let consumer = self
            .inner
            .basic_consume(queue, consumer_tag, options, FieldTable::default())
            .await
            .map_err(BrokerError::channel)?;

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|d| InboundDelivery {
                        delivery_tag: d.delivery_tag,
                        redelivered: d.redelivered,
                        body: d.data,
                    })
                    .map_err(BrokerError::channel)
            })
            .boxed())
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.inner
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(BrokerError::channel)
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        let options = BasicNackOptions {
            multiple: false,
            requeue,
        };
        self.inner
            .basic_nack(delivery_tag, options)
            .await
            .map_err(BrokerError::channel)
    }
}

fn lapin_kind(kind: ExchangeKind) -> lapin::ExchangeKind {
    match kind {
        ExchangeKind::Direct => lapin::ExchangeKind::Direct,
        ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
        ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        ExchangeKind::Headers => lapin::ExchangeKind::Headers,
    }
}

/// PRECONDITION_FAILED on a declare means the name exists with other flags.
fn declare_error(err: lapin::Error, kind: &'static str, name: &str) -> BrokerError {
    if let lapin::Error::ProtocolError(amqp) = &err {
        if matches!(
            amqp.kind(),
            AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED)
        ) {
            return BrokerError::TopologyConflict {
                kind,
                name: name.to_owned(),
            };
        }
    }
    BrokerError::channel(err)
}
