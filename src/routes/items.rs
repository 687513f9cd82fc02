use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use super::JsonBody;
use crate::{
    error::{AppError, AppResult, FieldError},
    hooks,
    state::AppState,
    store::{DocumentKind, DocumentQuery},
    types::{to_document, CreateItemRequest, NewItem, COLLECTION_ID},
    validation::{parse_id, require_object, BodyValidator},
};

const CREATION_ERROR: &str = "Creation error";

pub async fn get_all_items(State(state): State<AppState>) -> AppResult<Json<Vec<Value>>> {
    let items = state.store.find(DocumentKind::Items, &DocumentQuery::all()).await?;
    Ok(Json(items))
}

/// Responds with `null` when the item does not exist.
pub async fn get_item_by_id(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Option<Value>>> {
    let item_id = parse_id(&item_id, "itemId")?;
    let item = state.store.find_by_id(DocumentKind::Items, &item_id).await?;
    Ok(Json(item))
}

/// Items of one collection, newest first.
pub async fn get_items_by_collection_id(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> AppResult<Json<Vec<Value>>> {
    let collection_id = parse_id(&collection_id, "collectionId")?;
    let query = DocumentQuery::all().field_eq(COLLECTION_ID, collection_id);
    let items = state.store.find(DocumentKind::Items, &query).await?;
    Ok(Json(items))
}

pub async fn create_item(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> AppResult<Json<Value>> {
    let body = require_object(body)?;
    BodyValidator::new(&body)
        .required_id("collectionId")
        .optional_text("collectionName", 100)
        .optional_text("collectionTheme", 50)
        .required_text("ownerId", 100)
        .required_text("ownerName", 100)
        .required_text("itemName", 100)
        .optional_url("itemImage")
        .optional_objects("customFields")
        .finish(CREATION_ERROR)
        .inspect_err(|_| state.metrics.inc_validation_failures())?;

    let mut req: CreateItemRequest = serde_json::from_value(Value::Object(body))?;
    req.collection_id = parse_id(&req.collection_id, "collectionId")?;

    let Some(collection) = state.store.find_by_id(DocumentKind::Collections, &req.collection_id).await? else {
        state.metrics.inc_validation_failures();
        return Err(AppError::validation(
            CREATION_ERROR,
            vec![FieldError::new("collectionId", "collection does not exist")],
        ));
    };

    let item = NewItem::from_request(req, &collection);
    let saved = state.store.save(DocumentKind::Items, to_document(&item)?).await?;
    hooks::handle_item_creation(state.store.as_ref(), &item.collection_id).await?;

    state.metrics.inc_created();
    info!(collection_id = %item.collection_id, item_name = %item.item_name, "item created");
    Ok(Json(saved))
}

/// Merges the whole request body into the item; responds with `null` when the item
/// does not exist.
pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> AppResult<Json<Option<Value>>> {
    let item_id = parse_id(&item_id, "itemId")?;
    let patch = require_object(body)?;
    let updated = state.store.find_by_id_and_update(DocumentKind::Items, &item_id, patch).await?;
    if updated.is_some() {
        state.metrics.inc_updated();
    }
    Ok(Json(updated))
}

/// Deletes the item and runs the collection bookkeeping; responds with the deleted
/// document, or `null` when nothing was deleted.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Option<Value>>> {
    let item_id = parse_id(&item_id, "itemId")?;
    let deleted = state.store.find_by_id_and_delete(DocumentKind::Items, &item_id).await?;
    if let Some(item) = &deleted {
        state.metrics.add_deleted(1);
        if let Some(collection_id) = item.get(COLLECTION_ID).and_then(Value::as_str) {
            hooks::handle_item_delete(state.store.as_ref(), &item_id, collection_id).await?;
        }
        info!(%item_id, "item deleted");
    }
    Ok(Json(deleted))
}
