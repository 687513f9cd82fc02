//! HTTP route handlers for the Collectarium API.
//!
//! - `items`: items and their collection bookkeeping
//! - `collections`: collections, including cascading deletes
//! - `comments`: comments attached to items
//! - `tags`: the global tag list
//! - `health`: liveness, readiness, metrics and version endpoints

pub mod collections;
pub mod comments;
pub mod health;
pub mod items;
pub mod tags;

use axum::{
    extract::{DefaultBodyLimit, FromRequest},
    http::Uri,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware;
use crate::state::AppState;

/// `axum::Json` with rejections reported through `AppError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

/// Builds the complete application router with all layers applied.
pub fn router(state: AppState) -> Router {
    let cfg = state.config.clone();

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/version", get(health::version))
        .route("/items", get(items::get_all_items).post(items::create_item))
        .route(
            "/items/{itemId}",
            get(items::get_item_by_id)
                .patch(items::update_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
        .route("/items/collection/{collectionId}", get(items::get_items_by_collection_id))
        .route("/collections", get(collections::get_all_collections).post(collections::create_collection))
        .route(
            "/collections/{collectionId}",
            get(collections::get_collection_by_id)
                .patch(collections::update_collection)
                .put(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route("/collections/user/{ownerId}", get(collections::get_collections_by_owner_id))
        .route("/comments", post(comments::create_comment))
        .route("/comments/item/{itemId}", get(comments::get_comments_by_item_id))
        .route("/comments/{commentId}", delete(comments::delete_comment))
        .route("/tags", get(tags::get_all_tags).post(tags::create_tag))
        .fallback(route_not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(cfg.server.max_body_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(cfg.clone(), middleware::security_headers::security_headers_middleware))
        .layer(middleware::cors::cors_layer(&cfg.cors))
}
