use std::sync::Arc;

use sea_orm::Database;
use tokio_util::sync::CancellationToken;
use tracing::info;

use orderflow_core::shutdown::cancel_on_signal;
use orderflow_core::tracing::init_tracing;
use orderflow_domain::event::wire::ORDER_CREATED_QUEUE;
use orderflow_messaging::{
    BrokerConnection, BrokerError, ConsumerLoop, Publisher, QueueSpec, Topology,
};
use orderflow_notifications::config::NotificationsConfig;
use orderflow_notifications::infra::broker::BrokerEmailSentEvents;
use orderflow_notifications::infra::db::{DbNotificationRepository, DbOutboxRepository};
use orderflow_notifications::router::build_router;
use orderflow_notifications::state::AppState;
use orderflow_notifications::usecase::order_created::OrderCreatedHandler;
use orderflow_notifications::usecase::outbox::RelayOutboxUseCase;
use orderflow_notifications_migration::{Migrator, MigratorTrait};

async fn connect_broker(
    config: &NotificationsConfig,
    cancel: &CancellationToken,
    role: &str,
) -> Option<BrokerConnection> {
    match BrokerConnection::connect(&config.broker, cancel).await {
        Ok(conn) => Some(conn),
        Err(BrokerError::Cancelled) => {
            info!(role, "shutdown requested while connecting to broker");
            None
        }
        Err(e) => {
            tracing::error!(role, error = %e, "failed to connect to broker");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = NotificationsConfig::from_env();
    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    if let Err(e) = Migrator::up(&db, None).await {
        tracing::error!(error = %e, "failed to apply notifications migrations");
    }

    let Some(consumer_conn) = connect_broker(&config, &cancel, "consumer").await else {
        return;
    };
    let Some(publisher_conn) = connect_broker(&config, &cancel, "publisher").await else {
        consumer_conn.close().await;
        return;
    };
    if let Err(e) = publisher_conn.channel().enable_confirms().await {
        tracing::error!(error = %e, "failed to enable publisher confirms");
        publisher_conn.close().await;
        consumer_conn.close().await;
        std::process::exit(1);
    }

    let consumer = ConsumerLoop::new(
        consumer_conn.channel(),
        OrderCreatedHandler {
            repo: DbNotificationRepository { db: db.clone() },
        },
        ORDER_CREATED_QUEUE,
    )
    .with_topology(Topology::queue(QueueSpec::durable(ORDER_CREATED_QUEUE)))
    .with_prefetch(config.broker.prefetch)
    .with_consumer_tag("notifications-order-created");
    let consumer_cancel = cancel.clone();
    let consumer_task = tokio::spawn(async move {
        let result = consumer.run(consumer_cancel.clone()).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "order created consumer stopped");
            consumer_cancel.cancel();
        }
        result
    });

    let relay = RelayOutboxUseCase {
        repo: DbOutboxRepository { db: db.clone() },
        events: BrokerEmailSentEvents {
            publisher: Arc::new(Publisher::new(publisher_conn.channel())),
        },
        batch_size: config.outbox.batch_size,
        max_attempts: config.outbox.max_attempts,
    };
    let relay_cancel = cancel.clone();
    let poll_interval = config.outbox.poll_interval;
    let relay_task = tokio::spawn(async move { relay.run(poll_interval, relay_cancel).await });

    let router = build_router(AppState { db });
    let addr = format!("0.0.0.0:{}", config.notifications_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("notifications service listening on {addr}");
    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .expect("server error");

    let consumer_failed = match consumer_task.await {
        Ok(Ok(stats)) => {
            info!(
                received = stats.received,
                acked = stats.acked,
                requeued = stats.requeued,
                "order created consumer stopped"
            );
            false
        }
        Ok(Err(_)) => true,
        Err(e) => {
            tracing::error!(error = %e, "order created consumer task panicked");
            true
        }
    };
    if let Err(e) = relay_task.await {
        tracing::error!(error = %e, "outbox relay task panicked");
    }

    publisher_conn.close().await;
    consumer_conn.close().await;
    info!("notifications service stopped");

    if consumer_failed {
        std::process::exit(1);
    }
}
