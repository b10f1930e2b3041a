use sea_orm::entity::prelude::*;

/// One processed `OrderCreated` event. `event_id` is the idempotency key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub event_id: Uuid,
    pub order_id: Uuid,
    pub email: String,
    #[sea_orm(column_name = "type")]
    pub notification_type: String,
    pub delivered: bool,
    pub error_message: Option<String>,
    pub payload: Json,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
