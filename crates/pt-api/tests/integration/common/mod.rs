//! Common test utilities for integration tests.

use axum::{
    body::Body,
    http::{Method, StatusCode},
    Router,
};
use pt_api::{routes, state::AppState};
use pt_core::db::{create_pool_with_options, run_migrations, DbPool, PoolOptions};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

/// Creates an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> DbPool {
    let unique_id = Uuid::new_v4();
    let db_url = format!(
        "sqlite:file:integration_test_{}?mode=memory&cache=shared",
        unique_id
    );

    let pool = create_pool_with_options(
        &db_url,
        PoolOptions {
            max_connections: 1,
            ..Default::default()
        },
    )
    .await
    .expect("Failed to create SQLite pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Creates an AppState with test database.
pub async fn create_test_state() -> AppState {
    AppState::new(setup_test_db().await)
}

/// Creates a test router.
pub async fn create_test_router() -> (Router, AppState) {
    let state = create_test_state().await;
    let router = routes::create_router(state.clone());
    (router, state)
}

/// Helper to make GET requests.
pub fn get_request(uri: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make POST requests with JSON body.
pub fn post_json_request(uri: &str, body: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make PUT requests with JSON body.
pub fn put_json_request(uri: &str, body: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make DELETE requests.
pub fn delete_request(uri: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Sends request and parses JSON response.
pub async fn send_request<T: DeserializeOwned>(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: T = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Failed to parse response: {} - Body: {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    });
    (status, parsed)
}

/// Sends request and returns raw response body.
pub async fn send_request_raw(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).to_string())
}

/// Creates a location through the API and returns its id.
pub async fn create_location(app: &Router, name: &str) -> String {
    let (status, body): (StatusCode, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/locations", &json!({ "name": name }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create location: {body}");
    body["id"].as_str().unwrap().to_string()
}

/// Registers an asset through the API and returns its id.
pub async fn create_asset(app: &Router, tag: &str, location_id: &str) -> String {
    let payload = json!({
        "external_tag": tag,
        "name": format!("Asset {tag}"),
        "location_id": location_id,
        "seen_at": "2024-01-01T00:00:00Z",
    });
    let (status, body): (StatusCode, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/assets", &payload.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create asset: {body}");
    body["id"].as_str().unwrap().to_string()
}

/// Installs a sensor through the API and returns its id.
pub async fn create_sensor(app: &Router, name: &str, exit: &str, entry: &str) -> String {
    let payload = json!({
        "name": name,
        "exit_location_id": exit,
        "entry_location_id": entry,
    });
    let (status, body): (StatusCode, Value) = send_request(
        app.clone(),
        post_json_request("/api/v1/sensors", &payload.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create sensor: {body}");
    body["id"].as_str().unwrap().to_string()
}

/// Posts a detection and returns status and body.
pub async fn post_detection(
    app: &Router,
    sensor_id: &str,
    tag: &str,
    detected_at: &str,
) -> (StatusCode, Value) {
    let payload = json!({
        "sensor_id": sensor_id,
        "tag": tag,
        "detected_at": detected_at,
    });
    send_request(
        app.clone(),
        post_json_request("/api/v1/detections", &payload.to_string()),
    )
    .await
}
