use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    TransactionError, TransactionTrait,
    sea_query::{Expr, LockBehavior, LockType},
};
use uuid::Uuid;

use orderflow_core::error::StoreError;
use orderflow_domain::id::{EventId, OrderId};
use orderflow_notifications_schema::{notifications, outbox_events};

use crate::domain::repository::{NotificationRepository, OutboxRepository};
use crate::domain::types::{
    CLAIM_LEASE_SECS, Notification, OutboxEvent, OutboxFailure, PendingOutboxEvent,
};

// ── Notification repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbNotificationRepository {
    pub db: DatabaseConnection,
}

impl NotificationRepository for DbNotificationRepository {
    async fn exists_by_event_id(&self, event_id: EventId) -> Result<bool, StoreError> {
        let count = notifications::Entity::find()
            .filter(notifications::Column::EventId.eq(event_id.0))
            .count(&self.db)
            .await
            .context("check notification by event id")?;
        Ok(count > 0)
    }

    async fn create_with_outbox(
        &self,
        notification: &Notification,
        event: &OutboxEvent,
    ) -> Result<(), StoreError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let notification = notification.clone();
                let event = event.clone();
                Box::pin(async move {
                    insert_notification(txn, &notification).await?;
                    insert_outbox_event(txn, &event).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) | TransactionError::Transaction(e) => e,
            })
            .context("create notification with outbox")?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Notification>, StoreError> {
        let models = notifications::Entity::find()
            .order_by_asc(notifications::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list notifications")?;
        Ok(models.into_iter().map(notification_from_model).collect())
    }
}

async fn insert_notification(
    txn: &DatabaseTransaction,
    notification: &Notification,
) -> Result<(), sea_orm::DbErr> {
    notifications::ActiveModel {
        id: Set(notification.id),
        event_id: Set(notification.event_id.0),
        order_id: Set(notification.order_id.0),
        email: Set(notification.email.clone()),
        notification_type: Set(notification.notification_type.clone()),
        delivered: Set(notification.delivered),
        error_message: Set(notification.error_message.clone()),
        payload: Set(notification.payload.clone()),
        created_at: Set(notification.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_outbox_event(
    txn: &DatabaseTransaction,
    event: &OutboxEvent,
) -> Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    outbox_events::ActiveModel {
        id: Set(event.id),
        kind: Set(event.kind.clone()),
        payload: Set(event.payload.clone()),
        idempotency_key: Set(event.idempotency_key.clone()),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        next_attempt_at: Set(now),
        processed_at: Set(None),
        failed_at: Set(None),
    }
    .insert(txn)
    .await?;
    Ok(())
}

fn notification_from_model(model: notifications::Model) -> Notification {
    Notification {
        id: model.id,
        event_id: EventId(model.event_id),
        order_id: OrderId(model.order_id),
        email: model.email,
        notification_type: model.notification_type,
        delivered: model.delivered,
        error_message: model.error_message,
        payload: model.payload,
        created_at: model.created_at,
    }
}

/// Due rows, locked so a concurrent relay skips them instead of waiting.
fn due_events(now: DateTime<Utc>, limit: u64) -> Select<outbox_events::Entity> {
    outbox_events::Entity::find()
        .filter(outbox_events::Column::ProcessedAt.is_null())
        .filter(outbox_events::Column::FailedAt.is_null())
        .filter(outbox_events::Column::NextAttemptAt.lte(now))
        .order_by_asc(outbox_events::Column::NextAttemptAt)
        .order_by_asc(outbox_events::Column::CreatedAt)
        .limit(limit)
        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
}

// ── Outbox repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<PendingOutboxEvent>, StoreError> {
        let lease_until = now + Duration::seconds(CLAIM_LEASE_SECS);
        let models = self
            .db
            .transaction::<_, Vec<outbox_events::Model>, DbErr>(|txn| {
                Box::pin(async move {
                    let models = due_events(now, limit).all(txn).await?;
                    if !models.is_empty() {
                        outbox_events::Entity::update_many()
                            .col_expr(
                                outbox_events::Column::NextAttemptAt,
                                Expr::value(lease_until),
                            )
                            .filter(outbox_events::Column::Id.is_in(models.iter().map(|m| m.id)))
                            .exec(txn)
                            .await?;
                    }
                    Ok(models)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(e) | TransactionError::Transaction(e) => e,
            })
            .context("claim due outbox events")?;
        Ok(models
            .into_iter()
            .map(|m| PendingOutboxEvent {
                id: m.id,
                kind: m.kind,
                payload: m.payload,
                attempts: m.attempts,
            })
            .collect())
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        outbox_events::Entity::update_many()
            .col_expr(outbox_events::Column::ProcessedAt, Expr::value(at))
            .filter(outbox_events::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark outbox event processed")?;
        Ok(())
    }

    async fn record_failure(&self, id: Uuid, failure: &OutboxFailure) -> Result<(), StoreError> {
        outbox_events::Entity::update_many()
            .col_expr(outbox_events::Column::Attempts, Expr::value(failure.attempts))
            .col_expr(
                outbox_events::Column::LastError,
                Expr::value(failure.last_error.clone()),
            )
            .col_expr(
                outbox_events::Column::NextAttemptAt,
                Expr::value(failure.next_attempt_at),
            )
            .col_expr(outbox_events::Column::FailedAt, Expr::value(failure.failed_at))
            .filter(outbox_events::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("record outbox failure")?;
        Ok(())
    }
}
