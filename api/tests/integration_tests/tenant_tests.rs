//! Integration tests for tenant management.
//!
//! Tests cover:
//! - Creation, duplicates and validation errors
//! - Reads through the cache
//! - Updates and cache invalidation
//! - Users and statistics
//! - Rejected request bodies

use axum::http::StatusCode;
use serde_json::json;

use super::common::{get, patch_json, post_json, post_raw, tenant_payload, test_app};

#[tokio::test]
async fn test_create_tenant() {
    let (app, state) = test_app();

    let (status, response) = post_json(app, "/api/v1/tenants", tenant_payload("acme")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["name"], "acme");
    assert_eq!(response["plan"], "professional");
    assert_eq!(response["status"], "active");

    assert!(state.cache().exists("tenant:acme"));
}

#[tokio::test]
async fn test_create_duplicate_tenant_returns_409() {
    let (app, _state) = test_app();

    let (status, _) = post_json(app.clone(), "/api/v1/tenants", tenant_payload("acme")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = post_json(app, "/api/v1/tenants", tenant_payload("acme")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"], "already_exists");
}

#[tokio::test]
async fn test_create_invalid_tenant_returns_400() {
    let (app, _state) = test_app();

    let mut payload = tenant_payload("acme");
    payload["admin_email"] = json!("not-an-email");

    let (status, response) = post_json(app, "/api/v1/tenants", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_error");
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("Invalid admin email"));
}

#[tokio::test]
async fn test_get_tenant() {
    let (app, state) = test_app();
    post_json(app.clone(), "/api/v1/tenants", tenant_payload("acme")).await;

    // Force a repository read
    state.cache().delete("tenant:acme");

    let (status, response) = get(app.clone(), "/api/v1/tenants/acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["display_name"], "acme council");
    assert!(state.cache().exists("tenant:acme"));

    let (status, response) = get(app, "/api/v1/tenants/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "not_found");
}

#[tokio::test]
async fn test_update_tenant() {
    let (app, state) = test_app();
    post_json(app.clone(), "/api/v1/tenants", tenant_payload("acme")).await;

    let (status, response) = patch_json(
        app.clone(),
        "/api/v1/tenants/acme",
        json!({"plan": "enterprise", "status": "suspended"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["plan"], "enterprise");
    assert_eq!(response["status"], "suspended");
    assert!(!state.cache().exists("tenant:acme"));

    let (_, response) = get(app, "/api/v1/tenants/acme").await;
    assert_eq!(response["plan"], "enterprise");
}

#[tokio::test]
async fn test_update_tenant_errors() {
    let (app, _state) = test_app();
    post_json(app.clone(), "/api/v1/tenants", tenant_payload("acme")).await;

    let (status, _) = patch_json(app.clone(), "/api/v1/tenants/acme", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = patch_json(
        app.clone(),
        "/api/v1/tenants/acme",
        json!({"admin_email": "broken"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = patch_json(
        app,
        "/api/v1/tenants/ghost",
        json!({"display_name": "Ghost Town"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tenant_users_and_stats() {
    let (app, _state) = test_app();
    post_json(app.clone(), "/api/v1/tenants", tenant_payload("acme")).await;

    let (status, users) = get(app.clone(), "/api/v1/tenants/acme/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["email"], "admin@acme.org");
    assert_eq!(users[0]["roles"][0], "Tenant Admin");

    let (status, stats) = get(app.clone(), "/api/v1/tenants/acme/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["tenant"], "acme");
    assert_eq!(stats["user_count"], 1);
    assert_eq!(stats["plan"], "professional");

    let (status, _) = get(app, "/api/v1/tenants/ghost/stats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_tenant_missing_field_returns_400() {
    let (app, _state) = test_app();

    let (status, response) = post_json(
        app,
        "/api/v1/tenants",
        json!({"display_name": "x", "admin_email": "a@b.org"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_json");
    assert!(response["message"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_create_tenant_malformed_json_returns_400() {
    let (app, _state) = test_app();

    let (status, response) = post_raw(app, "/api/v1/tenants", "{\"name\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_json");
}

#[tokio::test]
async fn test_update_tenant_unknown_plan_returns_400() {
    let (app, _state) = test_app();
    post_json(app.clone(), "/api/v1/tenants", tenant_payload("acme")).await;

    let (status, response) =
        patch_json(app.clone(), "/api/v1/tenants/acme", json!({"plan": "platinum"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_json");

    let (_, tenant) = get(app, "/api/v1/tenants/acme").await;
    assert_eq!(tenant["plan"], "professional");
}

#[tokio::test]
async fn test_create_tenant_rejects_glob_characters_in_name() {
    let (app, _state) = test_app();

    let (status, response) = post_json(app, "/api/v1/tenants", tenant_payload("a[1]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_error");
}

#[tokio::test]
async fn test_reused_admin_email_stays_with_first_tenant() {
    let (app, _state) = test_app();
    post_json(app.clone(), "/api/v1/tenants", tenant_payload("acme")).await;

    let mut globex = tenant_payload("globex");
    globex["admin_email"] = json!("admin@acme.org");
    let (status, _) = post_json(app.clone(), "/api/v1/tenants", globex).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, users) = get(app.clone(), "/api/v1/tenants/acme/users").await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    let (_, stats) = get(app.clone(), "/api/v1/tenants/acme/stats").await;
    assert_eq!(stats["user_count"], 1);

    let (_, users) = get(app, "/api/v1/tenants/globex/users").await;
    assert!(users.as_array().unwrap().is_empty());
}
