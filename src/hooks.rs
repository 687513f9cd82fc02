//! Bookkeeping that keeps parent collections in step with their items.
//!
//! None of these run inside a transaction with the write that triggered them. A
//! failure here surfaces as an error to the client after the triggering write has
//! already happened.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::store::{DocumentKind, DocumentQuery, DocumentStore, ID_FIELD};
use crate::types::{COLLECTION_ID, COLLECTION_NAME, COLLECTION_THEME, ITEMS_QUANTITY, ITEM_ID};

/// Counts a new item against its collection.
pub async fn handle_item_creation(store: &dyn DocumentStore, collection_id: &str) -> AppResult<()> {
    match store.increment(DocumentKind::Collections, collection_id, ITEMS_QUANTITY, 1).await? {
        Some(_) => debug!(%collection_id, "item counted on collection"),
        None => warn!(%collection_id, "item created for a collection that no longer exists"),
    }
    Ok(())
}

/// Removes a deleted item's comments and uncounts it from its collection.
pub async fn handle_item_delete(store: &dyn DocumentStore, item_id: &str, collection_id: &str) -> AppResult<()> {
    let comments = store
        .delete_many(DocumentKind::Comments, &DocumentQuery::all().field_eq(ITEM_ID, item_id))
        .await?;
    if store.increment(DocumentKind::Collections, collection_id, ITEMS_QUANTITY, -1).await?.is_none() {
        warn!(%collection_id, %item_id, "deleted item pointed at a missing collection");
    }
    debug!(%item_id, comments, "item bookkeeping done");
    Ok(())
}

/// Deletes every item of a collection together with their comments. Returns the
/// number of items removed.
pub async fn handle_collection_delete(store: &dyn DocumentStore, collection_id: &str) -> AppResult<u64> {
    let by_collection = DocumentQuery::all().field_eq(COLLECTION_ID, collection_id);
    let items = store.find(DocumentKind::Items, &by_collection).await?;
    for item in &items {
        if let Some(item_id) = item.get(ID_FIELD).and_then(Value::as_str) {
            store
                .delete_many(DocumentKind::Comments, &DocumentQuery::all().field_eq(ITEM_ID, item_id))
                .await?;
        }
    }
    store.delete_many(DocumentKind::Items, &by_collection).await
}

/// Rewrites the collection name/theme copies held by the collection's items.
pub async fn sync_collection_copies(store: &dyn DocumentStore, collection: &Value) -> AppResult<u64> {
    let Some(collection_id) = collection.get(ID_FIELD).and_then(Value::as_str) else {
        return Ok(0);
    };
    let mut patch = Map::new();
    for field in [COLLECTION_NAME, COLLECTION_THEME] {
        if let Some(value) = collection.get(field) {
            patch.insert(field.to_string(), value.clone());
        }
    }
    if patch.is_empty() {
        return Ok(0);
    }
    let updated = store
        .update_many(DocumentKind::Items, &DocumentQuery::all().field_eq(COLLECTION_ID, collection_id), patch)
        .await?;
    debug!(%collection_id, updated, "collection copies synchronised on items");
    Ok(updated)
}
