//! Integration tests for the health check endpoint.

use axum::http::StatusCode;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "cap-api");
    assert_eq!(response["cache_backend"], "local");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (app, _state) = test_app();

    let (status, _) = get(app, "/api/v1/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
