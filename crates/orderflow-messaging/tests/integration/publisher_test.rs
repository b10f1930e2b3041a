use orderflow_domain::event::{OrderCreatedEvent, OrderEmailSentEvent, WireEvent, wire};
use orderflow_messaging::error::BrokerError;
use orderflow_messaging::{Destination, ExchangeKind, Publisher, QueueSpec, codec};
use orderflow_testing::broker::MemoryChannel;
use orderflow_testing::fixture::Fixture;

use crate::helpers::order_created;

#[tokio::test]
async fn should_publish_persistent_json_through_default_exchange() {
    let channel = MemoryChannel::new();
    let publisher = Publisher::new(channel.clone());
    let event = order_created();

    publisher
        .publish(&event, &Destination::queue(wire::ORDER_CREATED_QUEUE))
        .await
        .unwrap();

    let published = channel.published();
    assert_eq!(published.len(), 1);
    let message = &published[0];
    assert_eq!(message.exchange, "");
    assert_eq!(message.routing_key, wire::ORDER_CREATED_QUEUE);
    assert!(message.persistent);
    assert_eq!(message.content_type, "application/json");
    assert_eq!(message.message_id, Some(event.event_id().to_string()));

    let decoded: OrderCreatedEvent = codec::decode(&message.body).unwrap();
    assert_eq!(decoded, event);
    assert_eq!(
        channel.queues(),
        vec![QueueSpec::durable(wire::ORDER_CREATED_QUEUE)]
    );
}

#[tokio::test]
async fn should_declare_destination_once_per_channel() {
    let channel = MemoryChannel::new();
    let publisher = Publisher::new(channel.clone());
    let destination = Destination::queue(wire::ORDER_CREATED_QUEUE);

    publisher.publish(&order_created(), &destination).await.unwrap();
    publisher.publish(&order_created(), &destination).await.unwrap();

    assert_eq!(channel.declare_calls(), 1);
    assert_eq!(channel.published().len(), 2);
}

#[tokio::test]
async fn should_publish_to_topic_exchange_with_routing_key() {
    let channel = MemoryChannel::new();
    let publisher = Publisher::new(channel.clone());
    let raw = Fixture::load_raw("contracts/events/order_email_sent.json");
    let event: OrderEmailSentEvent = codec::decode(raw.as_bytes()).unwrap();

    publisher
        .publish(
            &event,
            &Destination::topic(wire::ORDERS_EXCHANGE, wire::EMAIL_SENT_ROUTING_KEY),
        )
        .await
        .unwrap();

    let exchanges = channel.exchanges();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].name, wire::ORDERS_EXCHANGE);
    assert_eq!(exchanges[0].kind, ExchangeKind::Topic);
    assert!(exchanges[0].durable);

    let message = &channel.published()[0];
    assert_eq!(message.exchange, wire::ORDERS_EXCHANGE);
    assert_eq!(message.routing_key, wire::EMAIL_SENT_ROUTING_KEY);
    assert_eq!(channel.published_events::<OrderEmailSentEvent>(), vec![event]);
}

#[tokio::test]
async fn should_report_failure_without_retrying() {
    let channel = MemoryChannel::new();
    let publisher = Publisher::new(channel.clone());
    let destination = Destination::queue(wire::ORDER_CREATED_QUEUE);
    channel.fail_next_publishes(1);

    let result = publisher.publish(&order_created(), &destination).await;
    assert!(matches!(result, Err(BrokerError::Channel(_))));
    assert!(channel.published().is_empty());

    publisher.publish(&order_created(), &destination).await.unwrap();
    assert_eq!(channel.published().len(), 1);
}

#[test]
fn should_decode_legacy_order_created_message() {
    let raw = Fixture::load_raw("contracts/events/order_created.json");
    let event: OrderCreatedEvent = codec::decode(raw.as_bytes()).unwrap();

    assert_eq!(
        event.event_id.to_string(),
        "6f1c1f43-31a4-4d8f-9a59-3a8a2f6a0c11"
    );
    assert_eq!(event.product_code, "P100");
    assert_eq!(event.quantity, 2);

    let fixture = Fixture::load("contracts/events/order_created.json");
    let reencoded: serde_json::Value = serde_json::to_value(&event).unwrap();
    for field in ["EventId", "OrderId", "Email", "ProductCode", "Quantity"] {
        assert_eq!(reencoded[field], fixture[field], "field {field}");
    }
}
