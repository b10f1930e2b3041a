use tokio_util::sync::CancellationToken;

use orderflow_domain::event::wire;
use orderflow_domain::order::OrderStatus;
use orderflow_messaging::error::BrokerError;
use orderflow_messaging::{ConsumerLoop, ConsumerStats, Topology, codec};
use orderflow_orders::usecase::email_sent::OrderEmailSentHandler;
use orderflow_testing::broker::MemoryChannel;

use crate::helpers::{MockOrderRepo, email_sent, order};

fn spawn_consumer(
    channel: &MemoryChannel,
    repo: &MockOrderRepo,
    cancel: &CancellationToken,
) -> tokio::task::JoinHandle<Result<ConsumerStats, BrokerError>> {
    let consumer = ConsumerLoop::new(
        channel.clone(),
        OrderEmailSentHandler { repo: repo.clone() },
        wire::ORDER_SERVICE_QUEUE,
    )
    .with_topology(Topology::bound_queue(
        wire::ORDERS_EXCHANGE,
        wire::ORDER_SERVICE_QUEUE,
        wire::EMAIL_SENT_ROUTING_KEY,
    ));
    tokio::spawn(consumer.run(cancel.clone()))
}

#[tokio::test]
async fn should_declare_bound_queue_on_orders_exchange() {
    let channel = MemoryChannel::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &MockOrderRepo::new(), &cancel);

    let tag = channel.deliver(&b"not json"[..]);
    channel.wait_for_settled(1).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![tag]);
    let exchanges = channel.exchanges();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].name, wire::ORDERS_EXCHANGE);
    assert!(exchanges[0].durable);
    let bindings = channel.bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].queue, wire::ORDER_SERVICE_QUEUE);
    assert_eq!(bindings[0].routing_key, wire::EMAIL_SENT_ROUTING_KEY);
}

#[tokio::test]
async fn should_mark_order_email_sent_and_ack() {
    let stored = order(OrderStatus::Created);
    let repo = MockOrderRepo::with_order(stored.clone());
    let orders = repo.orders_handle();
    let channel = MemoryChannel::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &repo, &cancel);

    let tag = channel.deliver_event(&email_sent(stored.id));
    channel.wait_for_settled(1).await;
    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(orders.lock().unwrap()[0].status, OrderStatus::EmailSent);
    assert_eq!(channel.acks(), vec![tag]);
    assert_eq!(stats.acked, 1);
}

#[tokio::test]
async fn should_ack_redelivered_confirmation_without_changes() {
    let stored = order(OrderStatus::Created);
    let repo = MockOrderRepo::with_order(stored.clone());
    let orders = repo.orders_handle();
    let channel = MemoryChannel::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &repo, &cancel);

    let event = email_sent(stored.id);
    let first = channel.deliver_event(&event);
    let second = channel.redeliver(codec::encode(&event).unwrap());
    channel.wait_for_settled(2).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(orders.lock().unwrap()[0].status, OrderStatus::EmailSent);
    assert_eq!(channel.acks(), vec![first, second]);
    assert!(channel.nacks().is_empty());
}

#[tokio::test]
async fn should_ack_confirmation_for_unknown_order() {
    let other = order(OrderStatus::Created);
    let repo = MockOrderRepo::with_order(other.clone());
    let orders = repo.orders_handle();
    let channel = MemoryChannel::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &repo, &cancel);

    let missing = order(OrderStatus::Created);
    let tag = channel.deliver_event(&email_sent(missing.id));
    channel.wait_for_settled(1).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert_eq!(channel.acks(), vec![tag]);
    assert!(channel.nacks().is_empty());
    assert_eq!(*orders.lock().unwrap(), vec![other]);
}

#[tokio::test]
async fn should_requeue_when_store_is_down() {
    let stored = order(OrderStatus::Created);
    let repo = MockOrderRepo::with_order(stored.clone());
    repo.failures.store(1, std::sync::atomic::Ordering::SeqCst);
    let orders = repo.orders_handle();
    let channel = MemoryChannel::new();
    let cancel = CancellationToken::new();
    let handle = spawn_consumer(&channel, &repo, &cancel);

    let event = email_sent(stored.id);
    let first = channel.deliver_event(&event);
    channel.wait_for_settled(1).await;
    let second = channel.redeliver(codec::encode(&event).unwrap());
    channel.wait_for_settled(2).await;
    cancel.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert_eq!(channel.nacks(), vec![(first, true)]);
    assert_eq!(channel.acks(), vec![second]);
    assert_eq!(orders.lock().unwrap()[0].status, OrderStatus::EmailSent);
    assert_eq!(stats.requeued, 1);
}
