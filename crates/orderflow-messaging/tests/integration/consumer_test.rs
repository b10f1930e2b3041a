use std::time::Duration;

use tokio_util::sync::CancellationToken;

use orderflow_domain::event::wire;
use orderflow_messaging::error::BrokerError;
use orderflow_messaging::{ConsumerLoop, QueueSpec, Topology, codec};
use orderflow_testing::broker::MemoryChannel;

use crate::helpers::{MemoryIdempotencyStore, order_created};

fn spawn_consumer(
    channel: &MemoryChannel,
    store: &MemoryIdempotencyStore,
    prefetch: u16,
    cancel: &CancellationToken,
) -> tokio::task::JoinHandle<Result<orderflow_messaging::ConsumerStats, BrokerError>> {
    let consumer = ConsumerLoop::new(channel.clone(), store.clone(), wire::ORDER_CREATED_QUEUE)
        .with_topology(Topology::queue(QueueSpec::durable(wire::ORDER_CREATED_QUEUE)))
        .with_prefetch(prefetch);
    tokio::spawn(consumer.run(cancel.clone()))
}

// ── idempotency ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_store_one_record_and_ack_every_redelivery() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::new();
    let records = store.records_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 1, &cancel);

    let event = order_created();
    let first = channel.deliver_event(&event);
    let second = channel.redeliver(codec::encode(&event).unwrap());
    let third = channel.redeliver(codec::encode(&event).unwrap());
    channel.wait_for_settled(3).await;

    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(*records.lock().unwrap(), vec![event.event_id]);
    assert_eq!(channel.acks(), vec![first, second, third]);
    assert!(channel.nacks().is_empty());
    assert_eq!(stats.received, 3);
    assert_eq!(stats.acked, 3);
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn should_ack_malformed_message_without_requeue() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 4, &cancel);

    let tag = channel.deliver(&b"{\"EventId\": \"not-a-uuid\""[..]);
    channel.wait_for_settled(1).await;

    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![tag]);
    assert!(channel.nacks().is_empty());
    assert!(store.records_handle().lock().unwrap().is_empty());
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn should_store_one_record_when_two_deliveries_race() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::with_precheck_barrier(2);
    let records = store.records_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 2, &cancel);

    let event = order_created();
    channel.deliver_event(&event);
    channel.deliver_event(&event);
    channel.wait_for_settled(2).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(records.lock().unwrap().len(), 1);
    assert_eq!(channel.acks().len(), 2);
    assert!(channel.nacks().is_empty());
}

#[tokio::test]
async fn should_reach_same_state_when_event_is_redelivered_out_of_order() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::new();
    let records = store.records_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 1, &cancel);

    let a = order_created();
    let b = order_created();
    channel.deliver_event(&a);
    channel.deliver_event(&b);
    channel.redeliver(codec::encode(&a).unwrap());
    channel.wait_for_settled(3).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();

    let mut stored = records.lock().unwrap().clone();
    stored.sort_by_key(|id| id.0);
    let mut expected = vec![a.event_id, b.event_id];
    expected.sort_by_key(|id| id.0);
    assert_eq!(stored, expected);
    assert_eq!(channel.acks().len(), 3);
}

// ── transient failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_requeue_when_store_is_unavailable_then_apply_on_redelivery() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::failing(1);
    let records = store.records_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 1, &cancel);

    let event = order_created();
    let first = channel.deliver_event(&event);
    channel.wait_for_settled(1).await;
    assert_eq!(channel.nacks(), vec![(first, true)]);
    assert!(records.lock().unwrap().is_empty());

    let second = channel.redeliver(codec::encode(&event).unwrap());
    channel.wait_for_settled(2).await;

    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![second]);
    assert_eq!(*records.lock().unwrap(), vec![event.event_id]);
    assert_eq!(stats.requeued, 1);
    assert_eq!(stats.acked, 1);
}

// ── lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_declare_topology_and_subscribe_with_prefetch() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 10, &cancel);

    channel.deliver_event(&order_created());
    channel.wait_for_settled(1).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(channel.prefetch(), Some(10));
    assert_eq!(
        channel.queues(),
        vec![QueueSpec::durable(wire::ORDER_CREATED_QUEUE)]
    );
    let (queue, _tag) = channel.consumed().unwrap();
    assert_eq!(queue, wire::ORDER_CREATED_QUEUE);
}

#[tokio::test]
async fn should_surface_closed_channel_to_caller() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 1, &cancel);

    channel.deliver_event(&order_created());
    channel.wait_for_settled(1).await;
    channel.close_stream();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(BrokerError::ChannelClosed)));
}

#[tokio::test]
async fn should_stop_on_channel_failure() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 1, &cancel);

    channel.fail_stream();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(BrokerError::ChannelClosed)));
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn should_settle_in_flight_delivery_before_returning_on_cancel() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::gated();
    let records = store.records_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 1, &cancel);

    let event = order_created();
    let tag = channel.deliver_event(&event);
    store.apply_started.notified().await;

    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());
    assert!(channel.acks().is_empty());

    store.open_gate();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![tag]);
    assert!(channel.nacks().is_empty());
    assert_eq!(*records.lock().unwrap(), vec![event.event_id]);
    assert_eq!(stats.received, 1);
    assert_eq!(stats.acked, 1);
    assert_eq!(stats.requeued, 0);
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn should_return_stats_when_cancelled_while_idle() {
    let channel = MemoryChannel::new();
    let store = MemoryIdempotencyStore::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, 1, &cancel);

    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(stats.received, 0);
    assert_eq!(stats.in_flight, 0);
}
