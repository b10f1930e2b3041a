use axum::{Json, extract::State};
use serde::Serialize;

use crate::domain::types::Notification;
use crate::error::NotificationsServiceError;
use crate::state::AppState;
use crate::usecase::notification::ListNotificationsUseCase;

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub event_id: String,
    pub order_id: String,
    pub email: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub delivered: bool,
    pub error_message: Option<String>,
    #[serde(serialize_with = "orderflow_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id.to_string(),
            event_id: n.event_id.to_string(),
            order_id: n.order_id.to_string(),
            email: n.email,
            notification_type: n.notification_type,
            delivered: n.delivered,
            error_message: n.error_message,
            created_at: n.created_at,
        }
    }
}

// ── GET /notifications ───────────────────────────────────────────────────────

pub async fn get_notifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationResponse>>, NotificationsServiceError> {
    let usecase = ListNotificationsUseCase {
        repo: state.notification_repo(),
    };
    let notifications = usecase.execute().await?;
    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}
