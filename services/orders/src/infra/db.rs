use anyhow::Context as _;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, sea_query::Expr,
};

use orderflow_core::error::{StoreError, StoreErrorKind};
use orderflow_domain::id::OrderId;
use orderflow_domain::order::OrderStatus;
use orderflow_orders_schema::orders;

use crate::domain::repository::OrderRepository;
use crate::domain::types::Order;

// ── Order repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOrderRepository {
    pub db: DatabaseConnection,
}

impl OrderRepository for DbOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        orders::ActiveModel {
            id: Set(order.id.0),
            customer_email: Set(order.customer_email.clone()),
            product_code: Set(order.product_code.clone()),
            quantity: Set(order.quantity),
            status: Set(order.status.as_str().to_owned()),
            created_at: Set(order.created_at),
        }
        .insert(&self.db)
        .await
        .context("create order")?;
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let model = orders::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find order by id")?;
        model.map(order_from_model).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let models = orders::Entity::find()
            .order_by_asc(orders::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list orders")?;
        models.into_iter().map(order_from_model).collect()
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError> {
        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(status.as_str()))
            .filter(orders::Column::Id.eq(id.0))
            .exec(&self.db)
            .await
            .context("update order status")?;
        Ok(result.rows_affected > 0)
    }
}

fn order_from_model(model: orders::Model) -> Result<Order, StoreError> {
    let status = model
        .status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::new(StoreErrorKind::Other, e))?;
    Ok(Order {
        id: OrderId(model.id),
        customer_email: model.customer_email,
        product_code: model.product_code,
        quantity: model.quantity,
        status,
        created_at: model.created_at,
    })
}
