//! Integration and unit tests for Collectarium.
//!
//! - **items_api_tests**: item CRUD and collection bookkeeping over HTTP
//! - **collections_api_tests**: collection CRUD, cascades and copy synchronisation
//! - **comments_tags_api_tests**: comments and tags endpoints
//! - **store_tests**: the SQLite document store
//! - **validation_tests**: body and identifier rules
//! - **error_tests**: error display and HTTP mapping
//! - **config_tests**: configuration layering and validation
//! - **health_api_tests**: probes, metrics, security headers, CORS

pub mod store_tests;
pub mod validation_tests;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tower::ServiceExt;

use crate::{config::AppConfig, db, routes, state::AppState};

/// A private in-memory database. One connection that never expires, because every
/// new `sqlite::memory:` connection would open a fresh, empty database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<std::time::Duration>)
        .max_lifetime(None::<std::time::Duration>)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_db(&pool).await.unwrap();
    pool
}

pub async fn setup_test_app() -> (Router, AppState) {
    let state = AppState::new(memory_pool().await, AppConfig::default());
    (routes::router(state.clone()), state)
}

/// Sends one request through the router and returns status plus parsed JSON body
/// (`Value::Null` for an empty or non-JSON body).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn create_collection(app: &Router, name: &str, owner_id: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/collections",
        Some(serde_json::json!({
            "collectionName": name,
            "collectionTheme": "books",
            "ownerId": owner_id,
            "ownerName": "Alex",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "collection creation failed: {}", body);
    body
}

pub async fn create_item(app: &Router, collection_id: &str, item_name: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/items",
        Some(serde_json::json!({
            "collectionId": collection_id,
            "ownerId": "user-1",
            "ownerName": "Alex",
            "itemName": item_name,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "item creation failed: {}", body);
    body
}

pub fn id_of(doc: &Value) -> String {
    doc["_id"].as_str().unwrap().to_string()
}
