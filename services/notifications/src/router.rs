use axum::{Router, routing::get};

use orderflow_core::health::{healthz, readyz};
use orderflow_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::notification::get_notifications;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Notifications
        .route("/notifications", get(get_notifications))
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
        .with_state(state)
}
