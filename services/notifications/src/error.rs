use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use orderflow_core::error::{StoreError, StoreErrorKind};

/// Notifications service error variants.
#[derive(Debug, thiserror::Error)]
pub enum NotificationsServiceError {
    #[error("service unavailable")]
    Unavailable(#[source] StoreError),
    #[error("internal error")]
    Internal(#[source] StoreError),
}

impl NotificationsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for NotificationsServiceError {
    fn from(err: StoreError) -> Self {
        match err.kind() {
            StoreErrorKind::Unavailable => Self::Unavailable(err),
            _ => Self::Internal(err),
        }
    }
}

impl IntoResponse for NotificationsServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unavailable(e) => {
                tracing::warn!(error = %e, kind = "SERVICE_UNAVAILABLE", "store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, kind = "INTERNAL", "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
