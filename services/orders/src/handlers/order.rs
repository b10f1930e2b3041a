use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use orderflow_domain::id::OrderId;
use orderflow_domain::order::OrderStatus;

use crate::domain::types::Order;
use crate::error::OrdersServiceError;
use crate::state::AppState;
use crate::usecase::order::{
    CreateOrderInput, CreateOrderOutput, CreateOrderUseCase, GetOrderUseCase, ListOrdersUseCase,
};

pub const CREATED_MESSAGE: &str = "Order created successfully.";
pub const PUBLISH_FAILED_MESSAGE: &str =
    "Order saved, but event publish failed. Notification may be delayed.";

/// Envelope shared by every successful orders response.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_email: String,
    pub product_code: String,
    pub quantity: i32,
    pub status: OrderStatus,
    #[serde(serialize_with = "orderflow_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            customer_email: order.customer_email,
            product_code: order.product_code,
            quantity: order.quantity,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

// ── POST /orders ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(alias = "customerEmail")]
    pub customer_email: String,
    #[serde(alias = "productCode")]
    pub product_code: String,
    pub quantity: i32,
}

/// `201` when the event went out, `202` when only the order was stored.
pub fn create_order_response(
    output: CreateOrderOutput,
) -> (StatusCode, Json<ApiResponse<OrderResponse>>) {
    let (status, message) = if output.event_published {
        (StatusCode::CREATED, CREATED_MESSAGE)
    } else {
        (StatusCode::ACCEPTED, PUBLISH_FAILED_MESSAGE)
    };
    (status, ApiResponse::ok(output.order.into(), message))
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), OrdersServiceError> {
    let usecase = CreateOrderUseCase {
        repo: state.order_repo(),
        events: state.order_events(),
    };
    let output = usecase
        .execute(CreateOrderInput {
            customer_email: body.customer_email,
            product_code: body.product_code,
            quantity: body.quantity,
        })
        .await?;
    Ok(create_order_response(output))
}

// ── GET /orders ──────────────────────────────────────────────────────────────

pub async fn get_orders(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, OrdersServiceError> {
    let usecase = ListOrdersUseCase {
        repo: state.order_repo(),
    };
    let orders = usecase.execute().await?;
    Ok(ApiResponse::ok(
        orders.into_iter().map(OrderResponse::from).collect(),
        "",
    ))
}

// ── GET /orders/{id} ─────────────────────────────────────────────────────────

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, OrdersServiceError> {
    let usecase = GetOrderUseCase {
        repo: state.order_repo(),
    };
    let order = usecase.execute(OrderId(id)).await?;
    Ok(ApiResponse::ok(order.into(), ""))
}
