use axum::{
    Router,
    routing::{get, post},
};

use orderflow_core::health::{healthz, readyz};
use orderflow_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::order::{create_order, get_order, get_orders};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Orders
        .route("/orders", post(create_order).get(get_orders))
        .route("/orders/{id}", get(get_order))
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
        .with_state(state)
}
