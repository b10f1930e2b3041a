use std::sync::Arc;

use axum::extract::FromRef;
use orderflow_messaging::{LapinChannel, Publisher};
use sea_orm::DatabaseConnection;

use crate::infra::broker::BrokerOrderEvents;
use crate::infra::db::DbOrderRepository;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub publisher: Arc<Publisher<LapinChannel>>,
}

impl AppState {
    pub fn order_repo(&self) -> DbOrderRepository {
        DbOrderRepository {
            db: self.db.clone(),
        }
    }

    pub fn order_events(&self) -> BrokerOrderEvents<LapinChannel> {
        BrokerOrderEvents {
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
