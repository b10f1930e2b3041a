use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;

use orderflow_domain::event::{OrderEmailSentEvent, wire};
use orderflow_messaging::error::BrokerError;
use orderflow_messaging::{ConsumerLoop, ConsumerStats, QueueSpec, Topology, codec};
use orderflow_notifications::domain::types::ORDER_CREATED_TYPE;
use orderflow_notifications::usecase::order_created::OrderCreatedHandler;
use orderflow_testing::broker::MemoryChannel;
use orderflow_testing::fixture::Fixture;

use crate::helpers::{MockStore, order_created};

fn spawn_consumer(
    channel: &MemoryChannel,
    store: &MockStore,
    cancel: &CancellationToken,
) -> tokio::task::JoinHandle<Result<ConsumerStats, BrokerError>> {
    let consumer = ConsumerLoop::new(
        channel.clone(),
        OrderCreatedHandler {
            repo: store.clone(),
        },
        wire::ORDER_CREATED_QUEUE,
    )
    .with_topology(Topology::queue(QueueSpec::durable(wire::ORDER_CREATED_QUEUE)));
    tokio::spawn(consumer.run(cancel.clone()))
}

#[tokio::test]
async fn should_record_notification_and_queue_confirmation() {
    let channel = MemoryChannel::new();
    let store = MockStore::new();
    let notifications = store.notifications_handle();
    let outbox = store.outbox_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, &cancel);

    let event = order_created();
    let tag = channel.deliver_event(&event);
    channel.wait_for_settled(1).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![tag]);
    let notifications = notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].event_id, event.event_id);
    assert_eq!(notifications[0].order_id, event.order_id);
    assert_eq!(notifications[0].notification_type, ORDER_CREATED_TYPE);
    assert!(notifications[0].delivered);
    assert_eq!(notifications[0].created_at, event.created_at);

    let outbox = outbox.lock().unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(
        outbox[0].event.idempotency_key,
        format!("order_email_sent:{}", event.event_id)
    );
    let confirmation: OrderEmailSentEvent =
        serde_json::from_value(outbox[0].event.payload.clone()).unwrap();
    assert_eq!(confirmation.order_id, event.order_id);
    assert_eq!(confirmation.email, event.email);
    assert_ne!(confirmation.event_id, event.event_id);
}

#[tokio::test]
async fn should_record_once_across_redeliveries() {
    let channel = MemoryChannel::new();
    let store = MockStore::new();
    let notifications = store.notifications_handle();
    let outbox = store.outbox_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, &cancel);

    let event = order_created();
    let body = codec::encode(&event).unwrap();
    let tags = vec![
        channel.deliver(body.clone()),
        channel.redeliver(body.clone()),
        channel.redeliver(body),
    ];
    channel.wait_for_settled(3).await;
    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(notifications.lock().unwrap().len(), 1);
    assert_eq!(outbox.lock().unwrap().len(), 1);
    assert_eq!(channel.acks(), tags);
    assert!(channel.nacks().is_empty());
    assert_eq!(stats.acked, 3);
}

#[tokio::test]
async fn should_ack_when_insert_loses_race() {
    let channel = MemoryChannel::new();
    let store = MockStore::new();
    store.blind_precheck.store(true, Ordering::SeqCst);
    let notifications = store.notifications_handle();
    let outbox = store.outbox_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, &cancel);

    let event = order_created();
    let first = channel.deliver_event(&event);
    let second = channel.redeliver(codec::encode(&event).unwrap());
    channel.wait_for_settled(2).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![first, second]);
    assert!(channel.nacks().is_empty());
    assert_eq!(notifications.lock().unwrap().len(), 1);
    assert_eq!(outbox.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_requeue_while_store_is_down_then_record() {
    let channel = MemoryChannel::new();
    let store = MockStore::failing(1);
    let notifications = store.notifications_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, &cancel);

    let event = order_created();
    let first = channel.deliver_event(&event);
    channel.wait_for_settled(1).await;
    assert!(notifications.lock().unwrap().is_empty());

    let second = channel.redeliver(codec::encode(&event).unwrap());
    channel.wait_for_settled(2).await;
    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(channel.nacks(), vec![(first, true)]);
    assert_eq!(channel.acks(), vec![second]);
    assert_eq!(notifications.lock().unwrap().len(), 1);
    assert_eq!(stats.requeued, 1);
}

#[tokio::test]
async fn should_drop_malformed_message() {
    let channel = MemoryChannel::new();
    let store = MockStore::new();
    let notifications = store.notifications_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, &cancel);

    let tag = channel.deliver(&b"{\"EventId\":"[..]);
    channel.wait_for_settled(1).await;
    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![tag]);
    assert!(channel.nacks().is_empty());
    assert!(notifications.lock().unwrap().is_empty());
    assert_eq!(stats.in_flight, 0);
}

#[tokio::test]
async fn should_accept_legacy_producer_message() {
    let channel = MemoryChannel::new();
    let store = MockStore::new();
    let notifications = store.notifications_handle();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &store, &cancel);

    let raw = Fixture::load_raw("contracts/events/order_created.json");
    let tag = channel.deliver(raw.into_bytes());
    channel.wait_for_settled(1).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![tag]);
    let notifications = notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].event_id.to_string(),
        "6f1c1f43-31a4-4d8f-9a59-3a8a2f6a0c11"
    );
    assert_eq!(notifications[0].email, "customer@example.com");
    assert_eq!(notifications[0].payload["ProductCode"], "P100");
}
