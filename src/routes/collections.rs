use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use super::JsonBody;
use crate::{
    error::AppResult,
    hooks,
    state::AppState,
    store::{DocumentKind, DocumentQuery},
    types::{
        to_document, CreateCollectionRequest, NewCollection, COLLECTION_NAME, COLLECTION_THEME, ITEMS_QUANTITY,
        OWNER_ID,
    },
    validation::{parse_id, require_object, BodyValidator},
};

pub async fn get_all_collections(State(state): State<AppState>) -> AppResult<Json<Vec<Value>>> {
    let collections = state.store.find(DocumentKind::Collections, &DocumentQuery::all()).await?;
    Ok(Json(collections))
}

pub async fn get_collection_by_id(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> AppResult<Json<Option<Value>>> {
    let collection_id = parse_id(&collection_id, "collectionId")?;
    let collection = state.store.find_by_id(DocumentKind::Collections, &collection_id).await?;
    Ok(Json(collection))
}

/// Owner ids are opaque user references, so they are matched verbatim.
pub async fn get_collections_by_owner_id(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> AppResult<Json<Vec<Value>>> {
    let query = DocumentQuery::all().field_eq(OWNER_ID, owner_id.trim());
    let collections = state.store.find(DocumentKind::Collections, &query).await?;
    Ok(Json(collections))
}

pub async fn create_collection(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> AppResult<Json<Value>> {
    let body = require_object(body)?;
    BodyValidator::new(&body)
        .required_text("collectionName", 100)
        .required_text("collectionTheme", 50)
        .optional_text("collectionDescription", 2000)
        .optional_url("collectionImage")
        .required_text("ownerId", 100)
        .required_text("ownerName", 100)
        .optional_objects("customFields")
        .finish("Creation error")
        .inspect_err(|_| state.metrics.inc_validation_failures())?;

    let req: CreateCollectionRequest = serde_json::from_value(Value::Object(body))?;
    let collection = NewCollection::from(req);
    let saved = state.store.save(DocumentKind::Collections, to_document(&collection)?).await?;

    state.metrics.inc_created();
    info!(owner_id = %collection.owner_id, name = %collection.collection_name, "collection created");
    Ok(Json(saved))
}

/// Merges the body into the collection. `itemsQuantity` is maintained by the item
/// hooks and is ignored here. Renames and theme changes are copied onto the items.
pub async fn update_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> AppResult<Json<Option<Value>>> {
    let collection_id = parse_id(&collection_id, "collectionId")?;
    let mut patch = require_object(body)?;
    patch.remove(ITEMS_QUANTITY);
    let touches_copies = patch.contains_key(COLLECTION_NAME) || patch.contains_key(COLLECTION_THEME);

    let updated = state
        .store
        .find_by_id_and_update(DocumentKind::Collections, &collection_id, patch)
        .await?;
    if let Some(collection) = &updated {
        state.metrics.inc_updated();
        if touches_copies {
            hooks::sync_collection_copies(state.store.as_ref(), collection).await?;
        }
    }
    Ok(Json(updated))
}

/// Deletes the collection with all of its items and their comments.
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<String>,
) -> AppResult<Json<Option<Value>>> {
    let collection_id = parse_id(&collection_id, "collectionId")?;
    let deleted = state
        .store
        .find_by_id_and_delete(DocumentKind::Collections, &collection_id)
        .await?;
    if deleted.is_some() {
        let items = hooks::handle_collection_delete(state.store.as_ref(), &collection_id).await?;
        state.metrics.add_deleted(1 + items);
        info!(%collection_id, items, "collection deleted");
    }
    Ok(Json(deleted))
}
