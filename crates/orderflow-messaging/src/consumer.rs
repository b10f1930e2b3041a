#![allow(async_fn_in_trait)]

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{FutureExt, StreamExt, TryStreamExt};
use orderflow_core::error::StoreError;
use orderflow_domain::event::WireEvent;
use orderflow_domain::id::EventId;
use tokio_util::sync::CancellationToken;

use crate::channel::{BrokerChannel, InboundDelivery};
use crate::codec;
use crate::error::BrokerError;
use crate::topology::{Topology, TopologyDeclarator};

/// Result of applying an event to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The event refers to a subject the store does not have (yet).
    SubjectMissing,
}

/// Business side of a consumer: the idempotency check and the side effect.
///
/// Implementations must not share mutable state between calls. Concurrent
/// deliveries of the same event are arbitrated by the store's unique index,
/// surfaced as [`StoreError::is_unique_violation`].
pub trait EventHandler: Send + Sync {
    type Event: WireEvent;

    async fn already_applied(&self, event: &Self::Event) -> Result<bool, StoreError>;

    async fn apply(&self, event: &Self::Event) -> Result<ApplyOutcome, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckReason {
    /// Shutdown in progress; the delivery is settled without processing.
    Draining,
    Malformed,
    Duplicate,
    Applied,
    /// Lost the insert race to a concurrent delivery of the same event.
    DuplicateRace,
    SubjectMissing,
}

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack(AckReason),
    Requeue,
}

/// Decide the fate of one delivery.
///
/// Every path ends in a disposition: nothing is dropped without an ack and
/// nothing here can fail the consumer loop.
pub async fn process_delivery<H: EventHandler>(
    handler: &H,
    delivery: &InboundDelivery,
    draining: bool,
) -> Disposition {
    let delivery_tag = delivery.delivery_tag;
    if draining {
        tracing::info!(delivery_tag, "shutting down, acknowledging without processing");
        return Disposition::Ack(AckReason::Draining);
    }

    let event: H::Event = match codec::decode(&delivery.body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(delivery_tag, error = %e, "dropping malformed message");
            return Disposition::Ack(AckReason::Malformed);
        }
    };
    let event_id = event.event_id();

    match handler.already_applied(&event).await {
        Ok(true) => {
            tracing::info!(
                delivery_tag,
                event_id = %event_id,
                kind = H::Event::KIND,
                "event already processed, skipping"
            );
            return Disposition::Ack(AckReason::Duplicate);
        }
        Ok(false) => {}
        Err(e) => return transient_failure(delivery_tag, event_id, &e),
    }

    match handler.apply(&event).await {
        Ok(ApplyOutcome::Applied) => {
            tracing::info!(
                delivery_tag,
                event_id = %event_id,
                kind = H::Event::KIND,
                redelivered = delivery.redelivered,
                "event processed"
            );
            Disposition::Ack(AckReason::Applied)
        }
        Ok(ApplyOutcome::SubjectMissing) => {
            tracing::warn!(
                delivery_tag,
                event_id = %event_id,
                subject_id = %event.subject_id(),
                kind = H::Event::KIND,
                "subject not found, event ignored"
            );
            Disposition::Ack(AckReason::SubjectMissing)
        }
        Err(e) if e.is_unique_violation() => {
            tracing::info!(
                delivery_tag,
                event_id = %event_id,
                kind = H::Event::KIND,
                "event recorded by a concurrent delivery"
            );
            Disposition::Ack(AckReason::DuplicateRace)
        }
        Err(e) => transient_failure(delivery_tag, event_id, &e),
    }
}

fn transient_failure(delivery_tag: u64, event_id: EventId, err: &StoreError) -> Disposition {
    tracing::error!(
        delivery_tag,
        event_id = %event_id,
        error = %err,
        "failed to process event, requeueing"
    );
    Disposition::Requeue
}

/// Counters observed by a consumer loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub acked: u64,
    pub requeued: u64,
    /// Deliveries taken from the stream and not yet settled.
    pub in_flight: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    acked: AtomicU64,
    requeued: AtomicU64,
    in_flight: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ConsumerStats {
        ConsumerStats {
            received: self.received.load(Ordering::Relaxed),
            acked: self.acked.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// A long-running subscription to one queue.
///
/// Up to `prefetch` deliveries are processed concurrently. A single message
/// never stops the loop; a broken channel does, and is returned to the caller.
pub struct ConsumerLoop<C, H> {
    declarator: TopologyDeclarator<C>,
    handler: H,
    queue: String,
    topology: Topology,
    prefetch: u16,
    consumer_tag: String,
    counters: Arc<Counters>,
}

impl<C: BrokerChannel, H: EventHandler> ConsumerLoop<C, H> {
    pub fn new(channel: C, handler: H, queue: impl Into<String>) -> Self {
        Self {
            declarator: TopologyDeclarator::new(channel),
            handler,
            queue: queue.into(),
            topology: Topology::default(),
            prefetch: 1,
            consumer_tag: String::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Topology declared before subscribing.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch.max(1);
        self
    }

    /// An empty tag lets the broker generate one.
    pub fn with_consumer_tag(mut self, tag: impl Into<String>) -> Self {
        self.consumer_tag = tag.into();
        self
    }

    /// Consume until `cancel` fires or the channel fails.
    ///
    /// On cancellation no new deliveries are taken; those already in flight
    /// finish and are settled before this returns.
    pub async fn run(self, cancel: CancellationToken) -> Result<ConsumerStats, BrokerError> {
        self.declarator.declare(&self.topology).await?;
        let channel = self.declarator.channel();
        channel.set_prefetch(self.prefetch).await?;
        let deliveries = channel.consume(&self.queue, &self.consumer_tag).await?;
        tracing::info!(queue = %self.queue, prefetch = self.prefetch, "consumer started");

        let this = &self;
        let token = &cancel;
        let result = deliveries
            .take_until(cancel.cancelled())
            .try_for_each_concurrent(usize::from(self.prefetch), move |delivery| {
                this.settle(delivery, token)
            })
            .await;

        let stats = self.counters.snapshot();
        match result {
            Err(e) => {
                tracing::error!(queue = %self.queue, error = %e, "consumer stopped on channel failure");
                Err(e)
            }
            Ok(()) if cancel.is_cancelled() => {
                tracing::info!(
                    queue = %self.queue,
                    received = stats.received,
                    acked = stats.acked,
                    requeued = stats.requeued,
                    "consumer drained"
                );
                Ok(stats)
            }
            Ok(()) => {
                tracing::error!(queue = %self.queue, "delivery stream ended unexpectedly");
                Err(BrokerError::ChannelClosed)
            }
        }
    }

    async fn settle(
        &self,
        delivery: InboundDelivery,
        cancel: &CancellationToken,
    ) -> Result<(), BrokerError> {
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        self.counters.in_flight.fetch_add(1, Ordering::Relaxed);
        let delivery_tag = delivery.delivery_tag;

        let disposition = AssertUnwindSafe(process_delivery(
            &self.handler,
            &delivery,
            cancel.is_cancelled(),
        ))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            tracing::error!(delivery_tag, "event handler panicked, requeueing");
            Disposition::Requeue
        });

        let channel = self.declarator.channel();
        let settled = match disposition {
            Disposition::Ack(_) => {
                let result = channel.ack(delivery_tag).await;
                if result.is_ok() {
                    self.counters.acked.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
            Disposition::Requeue => {
                let result = channel.nack(delivery_tag, true).await;
                if result.is_ok() {
                    self.counters.requeued.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
        };
        self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
        settled
    }
}
