use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use orderflow_core::error::{StoreError, StoreErrorKind};

/// Orders service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum OrdersServiceError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("order not found")]
    OrderNotFound,
    #[error("service unavailable")]
    Unavailable(#[source] StoreError),
    #[error("internal error")]
    Internal(#[source] StoreError),
}

impl OrdersServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidOrder(_) => "INVALID_ORDER",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for OrdersServiceError {
    fn from(err: StoreError) -> Self {
        match err.kind() {
            StoreErrorKind::Unavailable => Self::Unavailable(err),
            _ => Self::Internal(err),
        }
    }
}

impl IntoResponse for OrdersServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &self {
            Self::Internal(e) => tracing::error!(error = %e, kind = "INTERNAL", "internal error"),
            Self::Unavailable(e) => {
                tracing::warn!(error = %e, kind = "SERVICE_UNAVAILABLE", "store unavailable")
            }
            _ => {}
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
