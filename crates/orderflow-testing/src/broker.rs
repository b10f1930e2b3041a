//! In-process broker channel.
//!
//! `MemoryChannel` records every declaration, publish, ack and nack so tests
//! can assert on broker interaction without a running RabbitMQ. Clones share
//! state: hand one clone to the code under test and keep another to drive it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use orderflow_domain::event::WireEvent;
use orderflow_messaging::channel::{BrokerChannel, InboundDelivery, OutboundMessage};
use orderflow_messaging::codec;
use orderflow_messaging::error::BrokerError;
use orderflow_messaging::topology::{Binding, ExchangeSpec, QueueSpec};

type DeliveryResult = Result<InboundDelivery, BrokerError>;

struct State {
    exchanges: Vec<ExchangeSpec>,
    queues: Vec<QueueSpec>,
    bindings: Vec<Binding>,
    declare_calls: usize,
    published: Vec<OutboundMessage>,
    acks: Vec<u64>,
    nacks: Vec<(u64, bool)>,
    prefetch: Option<u16>,
    consumed: Option<(String, String)>,
    failing_publishes: usize,
    next_tag: u64,
    sender: Option<UnboundedSender<DeliveryResult>>,
    receiver: Option<UnboundedReceiver<DeliveryResult>>,
}

#[derive(Clone)]
pub struct MemoryChannel {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            state: Arc::new(Mutex::new(State {
                exchanges: Vec::new(),
                queues: Vec::new(),
                bindings: Vec::new(),
                declare_calls: 0,
                published: Vec::new(),
                acks: Vec::new(),
                nacks: Vec::new(),
                prefetch: None,
                consumed: None,
                failing_publishes: 0,
                next_tag: 1,
                sender: Some(sender),
                receiver: Some(receiver),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- driving the consumer ---

    /// Push a raw body to the consumer. Returns the delivery tag.
    pub fn deliver(&self, body: impl Into<Vec<u8>>) -> u64 {
        self.push(body.into(), false)
    }

    /// Push a body flagged as redelivered, as after a nack.
    pub fn redeliver(&self, body: impl Into<Vec<u8>>) -> u64 {
        self.push(body.into(), true)
    }

    pub fn deliver_event<E: WireEvent>(&self, event: &E) -> u64 {
        let body = codec::encode(event).expect("encode event");
        self.deliver(body)
    }

    fn push(&self, body: Vec<u8>, redelivered: bool) -> u64 {
        let mut state = self.lock();
        let delivery_tag = state.next_tag;
        state.next_tag += 1;
        let sender = state.sender.as_ref().expect("delivery stream already closed");
        sender
            .unbounded_send(Ok(InboundDelivery {
                delivery_tag,
                redelivered,
                body,
            }))
            .expect("consumer stream dropped");
        delivery_tag
    }

    /// Emit a channel failure on the delivery stream.
    pub fn fail_stream(&self) {
        if let Some(sender) = self.lock().sender.as_ref() {
            let _ = sender.unbounded_send(Err(BrokerError::ChannelClosed));
        }
    }

    /// End the delivery stream, as when the broker closes the channel.
    pub fn close_stream(&self) {
        self.lock().sender.take();
    }

    /// Make the next `count` publishes fail.
    pub fn fail_next_publishes(&self, count: usize) {
        self.lock().failing_publishes = count;
    }

    // --- inspection ---

    pub fn published(&self) -> Vec<OutboundMessage> {
        self.lock().published.clone()
    }

    pub fn published_events<E: WireEvent>(&self) -> Vec<E> {
        self.published()
            .iter()
            .map(|m| codec::decode(&m.body).expect("published body decodes"))
            .collect()
    }

    pub fn acks(&self) -> Vec<u64> {
        self.lock().acks.clone()
    }

    pub fn nacks(&self) -> Vec<(u64, bool)> {
        self.lock().nacks.clone()
    }

    pub fn prefetch(&self) -> Option<u16> {
        self.lock().prefetch
    }

    /// `(queue, consumer_tag)` of the active subscription.
    pub fn consumed(&self) -> Option<(String, String)> {
        self.lock().consumed.clone()
    }

    pub fn exchanges(&self) -> Vec<ExchangeSpec> {
        self.lock().exchanges.clone()
    }

    pub fn queues(&self) -> Vec<QueueSpec> {
        self.lock().queues.clone()
    }

    pub fn bindings(&self) -> Vec<Binding> {
        self.lock().bindings.clone()
    }

    /// Declarations that reached the channel (exchanges, queues and bindings).
    pub fn declare_calls(&self) -> usize {
        self.lock().declare_calls
    }

    pub fn settled(&self) -> usize {
        let state = self.lock();
        state.acks.len() + state.nacks.len()
    }

    /// Wait until at least `count` deliveries were acked or nacked.
    ///
    /// Panics after five seconds.
    pub async fn wait_for_settled(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.settled() < count {
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "timed out waiting for {count} settled deliveries, got {}",
                    self.settled()
                );
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

fn conflict(kind: &'static str, name: &str) -> BrokerError {
    BrokerError::TopologyConflict {
        kind,
        name: name.to_owned(),
    }
}

impl BrokerChannel for MemoryChannel {
    type Deliveries = UnboundedReceiver<DeliveryResult>;

    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), BrokerError> {
        let mut state = self.lock();
        state.declare_calls += 1;
        match state.exchanges.iter().find(|e| e.name == spec.name) {
            Some(existing) if existing != spec => Err(conflict("exchange", &spec.name)),
            Some(_) => Ok(()),
            None => {
                state.exchanges.push(spec.clone());
                Ok(())
            }
        }
    }

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), BrokerError> {
        let mut state = self.lock();
        state.declare_calls += 1;
        match state.queues.iter().find(|q| q.name == spec.name) {
            Some(existing) if existing != spec => Err(conflict("queue", &spec.name)),
            Some(_) => Ok(()),
            None => {
                state.queues.push(spec.clone());
                Ok(())
            }
        }
    }

    async fn bind_queue(&self, binding: &Binding) -> Result<(), BrokerError> {
        let mut state = self.lock();
        state.declare_calls += 1;
        if !state.bindings.contains(binding) {
            state.bindings.push(binding.clone());
        }
        Ok(())
    }

    async fn publish(&self, message: OutboundMessage) -> Result<(), BrokerError> {
        let mut state = self.lock();
        if state.failing_publishes > 0 {
            state.failing_publishes -= 1;
            return Err(BrokerError::channel(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broker connection lost",
            )));
        }
        state.published.push(message);
        Ok(())
    }

    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError> {
        self.lock().prefetch = Some(count);
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Self::Deliveries, BrokerError> {
        let mut state = self.lock();
        let receiver = state.receiver.take().ok_or(BrokerError::ChannelClosed)?;
        state.consumed = Some((queue.to_owned(), consumer_tag.to_owned()));
        Ok(receiver)
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.lock().acks.push(delivery_tag);
        Ok(())
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        self.lock().nacks.push((delivery_tag, requeue));
        Ok(())
    }
}
