//! Integration tests for registration, login and profile management

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use zapform::database::{init_db, AppState};
use zapform::route::create_app;

fn setup_test_app() -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();
    let db = init_db(db_path).expect("Failed to initialize test database");
    let state = AppState { db: Arc::new(db) };
    (create_app(state), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

/// Sends a JSON request, optionally with a bearer token
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let json = response_json(response.into_body()).await;
    (status, json)
}

async fn register(app: &axum::Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Ada",
            "email": email,
            "password": "hunter2hunter2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_returns_token_and_profile() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "hunter2hunter2"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Ada");
    // The password hash must never appear in a response
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let (app, _temp_db) = setup_test_app();

    register(&app, "dup@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Other",
            "email": "dup@example.com",
            "password": "hunter2hunter2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let (app, _temp_db) = setup_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Ada",
            "email": "short@example.com",
            "password": "short"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_round_trip() {
    let (app, _temp_db) = setup_test_app();

    register(&app, "login@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({
            "email": "login@example.com",
            "password": "hunter2hunter2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, body) = send(&app, "GET", "/api/users/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "login@example.com");
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let (app, _temp_db) = setup_test_app();

    register(&app, "wrong@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({
            "email": "wrong@example.com",
            "password": "not-the-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // Same message as for an unknown email
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_management_routes_require_token() {
    let (app, _temp_db) = setup_test_app();

    let (status, _) = send(&app, "GET", "/api/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/projects", Some("bogus-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_profile_changes_name() {
    let (app, _temp_db) = setup_test_app();

    let token = register(&app, "rename@example.com").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/me",
        Some(&token),
        Some(json!({"name": "Grace"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Grace");
    assert_eq!(body["email"], "rename@example.com");
}

#[tokio::test]
async fn test_update_profile_rejects_taken_email() {
    let (app, _temp_db) = setup_test_app();

    register(&app, "first@example.com").await;
    let token = register(&app, "second@example.com").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/me",
        Some(&token),
        Some(json!({"email": "first@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_change_password_requires_current_password() {
    let (app, _temp_db) = setup_test_app();

    let token = register(&app, "pw@example.com").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/me/password",
        Some(&token),
        Some(json!({
            "currentPassword": "not-it",
            "newPassword": "a-new-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/me/password",
        Some(&token),
        Some(json!({
            "currentPassword": "hunter2hunter2",
            "newPassword": "a-new-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old password no longer works, new one does
    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "pw@example.com", "password": "hunter2hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "pw@example.com", "password": "a-new-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
