use axum::body::Body;
use axum::http::{Request, StatusCode};
use sea_orm::DatabaseConnection;
use tower::ServiceExt;

use orderflow_core::middleware::REQUEST_ID_HEADER;
use orderflow_notifications::router::build_router;
use orderflow_notifications::state::AppState;

fn app() -> axum::Router {
    build_router(AppState {
        db: DatabaseConnection::Disconnected,
    })
}

#[tokio::test]
async fn should_answer_liveness_with_request_id() {
    let response = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn should_keep_caller_request_id() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header(REQUEST_ID_HEADER, "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me");
}

#[tokio::test]
async fn should_report_not_ready_without_database() {
    let response = app()
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
