use std::sync::Arc;

use sea_orm::Database;
use tokio_util::sync::CancellationToken;
use tracing::info;

use orderflow_core::shutdown::cancel_on_signal;
use orderflow_core::tracing::init_tracing;
use orderflow_domain::event::wire::{EMAIL_SENT_ROUTING_KEY, ORDER_SERVICE_QUEUE, ORDERS_EXCHANGE};
use orderflow_messaging::{BrokerConnection, BrokerError, ConsumerLoop, Publisher, Topology};
use orderflow_orders::config::OrdersConfig;
use orderflow_orders::infra::db::DbOrderRepository;
use orderflow_orders::router::build_router;
use orderflow_orders::state::AppState;
use orderflow_orders::usecase::email_sent::OrderEmailSentHandler;
use orderflow_orders_migration::{Migrator, MigratorTrait};

async fn connect_broker(
    config: &OrdersConfig,
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

    let config = OrdersConfig::from_env();
    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    if let Err(e) = Migrator::up(&db, None).await {
        tracing::error!(error = %e, "failed to apply orders migrations");
    }

    let Some(publisher_conn) = connect_broker(&config, &cancel, "publisher").await else {
        return;
    };
    if let Err(e) = publisher_conn.channel().enable_confirms().await {
        tracing::error!(error = %e, "failed to enable publisher confirms");
        publisher_conn.close().await;
        std::process::exit(1);
    }
    let Some(consumer_conn) = connect_broker(&config, &cancel, "consumer").await else {
        publisher_conn.close().await;
        return;
    };

    let consumer = ConsumerLoop::new(
        consumer_conn.channel(),
        OrderEmailSentHandler {
            repo: DbOrderRepository { db: db.clone() },
        },
        ORDER_SERVICE_QUEUE,
    )
    .with_topology(Topology::bound_queue(
        ORDERS_EXCHANGE,
        ORDER_SERVICE_QUEUE,
        EMAIL_SENT_ROUTING_KEY,
    ))
    .with_prefetch(config.broker.prefetch)
    .with_consumer_tag("orders-email-sent");
    let consumer_cancel = cancel.clone();
    let consumer_task = tokio::spawn(async move {
        let result = consumer.run(consumer_cancel.clone()).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "email sent consumer stopped");
            consumer_cancel.cancel();
        }
        result
    });

    let state = AppState {
        db,
        publisher: Arc::new(Publisher::new(publisher_conn.channel())),
    };
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.orders_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("orders service listening on {addr}");
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
                "email sent consumer stopped"
            );
            false
        }
        Ok(Err(_)) => true,
        Err(e) => {
            tracing::error!(error = %e, "email sent consumer task panicked");
            true
        }
    };

    consumer_conn.close().await;
    publisher_conn.close().await;
    info!("orders service stopped");

    if consumer_failed {
        std::process::exit(1);
    }
}
