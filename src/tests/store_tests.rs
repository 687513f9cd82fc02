#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use crate::store::{DocumentKind, DocumentQuery, DocumentStore, SortOrder, SqliteDocumentStore};
    use crate::tests::memory_pool;

    async fn setup_store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(memory_pool().await)
    }

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    fn id(doc: &Value) -> &str {
        doc["_id"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_init_db_creates_documents_table() {
        let pool = memory_pool().await;
        let tables: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert!(tables.contains(&"documents".to_string()));

        // Idempotent
        crate::db::init_db(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_timestamps() {
        let store = setup_store().await;
        let saved = store.save(DocumentKind::Tags, doc(json!({ "tagName": "rare" }))).await.unwrap();

        assert!(uuid::Uuid::parse_str(id(&saved)).is_ok());
        assert_eq!(saved["createdAt"], saved["updatedAt"]);
        let found = store.find_by_id(DocumentKind::Tags, id(&saved)).await.unwrap();
        assert_eq!(found, Some(saved.clone()));

        // Kinds are separate namespaces
        assert_eq!(store.find_by_id(DocumentKind::Items, id(&saved)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_filters_and_sorts() {
        let store = setup_store().await;
        let a = store.save(DocumentKind::Items, doc(json!({ "collectionId": "c1", "n": 1 }))).await.unwrap();
        store.save(DocumentKind::Items, doc(json!({ "collectionId": "c2", "n": 2 }))).await.unwrap();
        let c = store.save(DocumentKind::Items, doc(json!({ "collectionId": "c1", "n": 3 }))).await.unwrap();

        let newest = store
            .find(DocumentKind::Items, &DocumentQuery::all().field_eq("collectionId", "c1"))
            .await
            .unwrap();
        assert_eq!(newest, vec![c.clone(), a.clone()]);

        let oldest = store
            .find(
                DocumentKind::Items,
                &DocumentQuery::all().field_eq("collectionId", "c1").sort(SortOrder::OldestFirst),
            )
            .await
            .unwrap();
        assert_eq!(oldest, vec![a, c]);

        let limited = store.find(DocumentKind::Items, &DocumentQuery::all().limit(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_and_protects_managed_fields() {
        let store = setup_store().await;
        let saved = store
            .save(DocumentKind::Items, doc(json!({ "itemName": "a", "nested": { "x": 1, "y": 2 } })))
            .await
            .unwrap();

        let patch = doc(json!({
            "nested": { "x": 5 },
            "extra": null,
            "with.dot": true,
            "_id": "forged",
            "createdAt": "1970-01-01T00:00:00.000Z",
        }));
        let updated = store
            .find_by_id_and_update(DocumentKind::Items, id(&saved), patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["itemName"], "a");
        // Shallow merge: nested objects are replaced, not merged
        assert_eq!(updated["nested"], json!({ "x": 5 }));
        assert_eq!(updated["extra"], Value::Null);
        assert_eq!(updated["with.dot"], true);
        assert_eq!(updated["_id"], saved["_id"]);
        assert_eq!(updated["createdAt"], saved["createdAt"]);
    }

    #[tokio::test]
    async fn test_update_with_many_fields() {
        let store = setup_store().await;
        let saved = store.save(DocumentKind::Items, doc(json!({ "itemName": "a" }))).await.unwrap();
        let patch: Map<String, Value> = (0..5000).map(|i| (format!("field{}", i), json!(i))).collect();

        let updated = store
            .find_by_id_and_update(DocumentKind::Items, id(&saved), patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["itemName"], "a");
        assert_eq!(updated["field0"], 0);
        assert_eq!(updated["field4999"], 4999);
        assert_eq!(updated.as_object().unwrap().len(), 5000 + 4);
    }

    #[tokio::test]
    async fn test_update_keeps_value_types() {
        let store = setup_store().await;
        let saved = store
            .save(DocumentKind::Items, doc(json!({ "flag": true, "list": [1, "two"], "n": 1.5 })))
            .await
            .unwrap();

        let patch = doc(json!({
            "off": false,
            "nothing": null,
            "digits": "123",
            "obj": { "a": [true, null] },
            "bad\"key": 1,
        }));
        let updated = store
            .find_by_id_and_update(DocumentKind::Items, id(&saved), patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["flag"], true);
        assert_eq!(updated["list"], json!([1, "two"]));
        assert_eq!(updated["n"], 1.5);
        assert_eq!(updated["off"], false);
        assert!(updated.as_object().unwrap().contains_key("nothing"));
        assert_eq!(updated["digits"], "123");
        assert_eq!(updated["obj"], json!({ "a": [true, null] }));
        assert_eq!(updated["bad\"key"], 1);

        let stored = store.find_by_id(DocumentKind::Items, id(&saved)).await.unwrap();
        assert_eq!(stored, Some(updated));
    }

    #[test]
    fn test_undecodable_document_is_internal_error() {
        let result = crate::store::decode_doc("{\"unterminated\": ");
        assert!(matches!(result, Err(crate::error::AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_duplicate_tag_name_is_conflict() {
        let store = setup_store().await;
        store.save(DocumentKind::Tags, doc(json!({ "tagName": "rare" }))).await.unwrap();

        let result = store.save(DocumentKind::Tags, doc(json!({ "tagName": "rare" }))).await;
        assert!(matches!(result, Err(crate::error::AppError::Conflict(_))));

        // The index only covers tags
        store.save(DocumentKind::Items, doc(json!({ "tagName": "rare" }))).await.unwrap();
        store.save(DocumentKind::Items, doc(json!({ "tagName": "rare" }))).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_return_none() {
        let store = setup_store().await;
        let missing = "3f1e2d3c-4b5a-4968-8776-655443322110";
        assert_eq!(
            store.find_by_id_and_update(DocumentKind::Items, missing, doc(json!({ "a": 1 }))).await.unwrap(),
            None
        );
        assert_eq!(store.find_by_id_and_delete(DocumentKind::Items, missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_returns_document() {
        let store = setup_store().await;
        let saved = store.save(DocumentKind::Comments, doc(json!({ "itemId": "i1" }))).await.unwrap();
        let deleted = store.find_by_id_and_delete(DocumentKind::Comments, id(&saved)).await.unwrap();
        assert_eq!(deleted, Some(saved.clone()));
        assert_eq!(store.find_by_id(DocumentKind::Comments, id(&saved)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_clamps_at_zero() {
        let store = setup_store().await;
        let saved = store.save(DocumentKind::Collections, doc(json!({ "itemsQuantity": 0 }))).await.unwrap();

        let up = store.increment(DocumentKind::Collections, id(&saved), "itemsQuantity", 2).await.unwrap().unwrap();
        assert_eq!(up["itemsQuantity"], 2);
        let down = store.increment(DocumentKind::Collections, id(&saved), "itemsQuantity", -5).await.unwrap().unwrap();
        assert_eq!(down["itemsQuantity"], 0);

        let missing = store.increment(DocumentKind::Collections, "nope", "itemsQuantity", 1).await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_concurrent_increments_do_not_lose_updates() {
        let store = std::sync::Arc::new(setup_store().await);
        let saved = store.save(DocumentKind::Collections, doc(json!({ "itemsQuantity": 0 }))).await.unwrap();
        let collection_id = id(&saved).to_string();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let collection_id = collection_id.clone();
            handles.push(tokio::spawn(async move {
                store.increment(DocumentKind::Collections, &collection_id, "itemsQuantity", 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let found = store.find_by_id(DocumentKind::Collections, &collection_id).await.unwrap().unwrap();
        assert_eq!(found["itemsQuantity"], 20);
    }

    #[tokio::test]
    async fn test_update_many_and_delete_many() {
        let store = setup_store().await;
        for n in 0..3 {
            store.save(DocumentKind::Items, doc(json!({ "collectionId": "c1", "n": n }))).await.unwrap();
        }
        store.save(DocumentKind::Items, doc(json!({ "collectionId": "c2" }))).await.unwrap();

        let by_c1 = DocumentQuery::all().field_eq("collectionId", "c1");
        let updated = store
            .update_many(DocumentKind::Items, &by_c1, doc(json!({ "collectionName": "renamed" })))
            .await
            .unwrap();
        assert_eq!(updated, 3);
        let c1 = store.find(DocumentKind::Items, &by_c1).await.unwrap();
        assert!(c1.iter().all(|d| d["collectionName"] == "renamed"));

        assert_eq!(store.delete_many(DocumentKind::Items, &by_c1).await.unwrap(), 3);
        assert_eq!(store.find(DocumentKind::Items, &DocumentQuery::all()).await.unwrap().len(), 1);
    }
}
