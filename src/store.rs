//! JSON document store over a single SQLite table.
//!
//! Documents are JSON objects; the store owns `_id`, `createdAt` and `updatedAt` and
//! never lets a patch overwrite them. Every write is a single SQL statement, so a
//! counter bump cannot lose a concurrent bump, but nothing here spans more than one
//! statement.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Keys a patch may not write.
const MANAGED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Items,
    Collections,
    Comments,
    Tags,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Items => "items",
            DocumentKind::Collections => "collections",
            DocumentKind::Comments => "comments",
            DocumentKind::Tags => "tags",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    /// Ascending, case-insensitive, on a top-level string field.
    FieldAsc(&'static str),
}

/// Equality filters on top-level fields plus ordering.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    filters: Vec<(&'static str, String)>,
    sort: SortOrder,
    limit: Option<u32>,
}

impl DocumentQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn field_eq(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.filters.push((field, value.into()));
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The operations handlers need from the document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, kind: DocumentKind, query: &DocumentQuery) -> AppResult<Vec<Value>>;

    async fn find_by_id(&self, kind: DocumentKind, id: &str) -> AppResult<Option<Value>>;

    /// Inserts a new document, assigning `_id` and timestamps. Returns the stored document.
    async fn save(&self, kind: DocumentKind, doc: Map<String, Value>) -> AppResult<Value>;

    /// Shallow-merges `patch` into the document and returns the updated document.
    async fn find_by_id_and_update(
        &self,
        kind: DocumentKind,
        id: &str,
        patch: Map<String, Value>,
    ) -> AppResult<Option<Value>>;

    async fn find_by_id_and_delete(&self, kind: DocumentKind, id: &str) -> AppResult<Option<Value>>;

    /// Adds `delta` to an integer field, clamping at zero.
    async fn increment(
        &self,
        kind: DocumentKind,
        id: &str,
        field: &'static str,
        delta: i64,
    ) -> AppResult<Option<Value>>;

    async fn update_many(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
        patch: Map<String, Value>,
    ) -> AppResult<u64>;

    async fn delete_many(&self, kind: DocumentKind, query: &DocumentQuery) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Literal JSON path for a field name chosen by the code, never by a client.
fn static_path(field: &str) -> AppResult<String> {
    let plain = !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !plain {
        return Err(AppError::Internal(anyhow::anyhow!("unsupported document field name: {:?}", field)));
    }
    Ok(format!("'$.{}'", field))
}

pub(crate) fn decode_doc(raw: &str) -> AppResult<Value> {
    let doc = serde_json::from_str(raw).context("stored document is not valid JSON")?;
    Ok(doc)
}

fn push_kind_and_filters(qb: &mut QueryBuilder<'_, Sqlite>, kind: DocumentKind, query: &DocumentQuery) -> AppResult<()> {
    // Kinds are static identifiers; a literal lets SQLite pick the partial indexes.
    qb.push(" WHERE kind = '");
    qb.push(kind.as_str());
    qb.push("'");
    for (field, value) in &query.filters {
        qb.push(" AND json_extract(doc, ");
        qb.push(static_path(field)?);
        qb.push(") = ");
        qb.push_bind(value.clone());
    }
    Ok(())
}

/// Pushes an expression that rebuilds `doc` with every top-level key of `patch`
/// replaced. The patch is bound once as JSON text, so the statement size does not
/// grow with the number of keys.
fn push_shallow_merge(qb: &mut QueryBuilder<'_, Sqlite>, patch: String) {
    // json_each yields objects and arrays as text and booleans as integers; re-encode
    // each value so json_group_object stores the original JSON.
    qb.push(
        "(SELECT json_group_object(key, json(CASE type \
            WHEN 'text' THEN json_quote(value) \
            WHEN 'true' THEN 'true' \
            WHEN 'false' THEN 'false' \
            WHEN 'null' THEN 'null' \
            ELSE value END)) \
         FROM (SELECT key, type, value FROM json_each(documents.doc) \
               WHERE key NOT IN (SELECT key FROM json_each(",
    );
    qb.push_bind(patch.clone());
    qb.push(")) UNION ALL SELECT key, type, value FROM json_each(");
    qb.push_bind(patch);
    qb.push(")))");
}

/// Serializes a patch, dropping store-managed keys and stamping `updatedAt`.
fn patch_json(mut patch: Map<String, Value>, now: &str) -> AppResult<String> {
    for field in MANAGED_FIELDS {
        patch.remove(field);
    }
    patch.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.to_string()));
    let text = serde_json::to_string(&patch).context("failed to encode document patch")?;
    Ok(text)
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find(&self, kind: DocumentKind, query: &DocumentQuery) -> AppResult<Vec<Value>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT doc FROM documents");
        push_kind_and_filters(&mut qb, kind, query)?;
        match query.sort {
            SortOrder::NewestFirst => qb.push(" ORDER BY created_at DESC, seq DESC"),
            SortOrder::OldestFirst => qb.push(" ORDER BY created_at ASC, seq ASC"),
            SortOrder::FieldAsc(field) => {
                qb.push(" ORDER BY json_extract(doc, ");
                qb.push(static_path(field)?);
                qb.push(") COLLATE NOCASE ASC, seq ASC")
            }
        };
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(|row| decode_doc(row.try_get::<&str, _>("doc")?)).collect()
    }

    async fn find_by_id(&self, kind: DocumentKind, id: &str) -> AppResult<Option<Value>> {
        let row = sqlx::query("SELECT doc FROM documents WHERE kind = ?1 AND id = ?2")
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode_doc(r.try_get::<&str, _>("doc")?)).transpose()
    }

    async fn save(&self, kind: DocumentKind, mut doc: Map<String, Value>) -> AppResult<Value> {
        let id = Uuid::new_v4().to_string();
        let now = now_timestamp();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        doc.insert(CREATED_AT_FIELD.to_string(), Value::String(now.clone()));
        doc.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.clone()));
        let doc = Value::Object(doc);

        sqlx::query(
            r#"INSERT INTO documents (kind, id, doc, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?4)"#,
        )
        .bind(kind.as_str())
        .bind(&id)
        .bind(serde_json::to_string(&doc).context("failed to encode document")?)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(kind = kind.as_str(), %id, "document saved");
        Ok(doc)
    }

    async fn find_by_id_and_update(
        &self,
        kind: DocumentKind,
        id: &str,
        patch: Map<String, Value>,
    ) -> AppResult<Option<Value>> {
        let now = now_timestamp();
        let patch = patch_json(patch, &now)?;

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE documents SET doc = ");
        push_shallow_merge(&mut qb, patch);
        qb.push(", updated_at = ");
        qb.push_bind(now);
        push_kind_and_filters(&mut qb, kind, &DocumentQuery::all())?;
        qb.push(" AND id = ");
        qb.push_bind(id.to_string());
        qb.push(" RETURNING doc");

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.map(|r| decode_doc(r.try_get::<&str, _>("doc")?)).transpose()
    }

    async fn find_by_id_and_delete(&self, kind: DocumentKind, id: &str) -> AppResult<Option<Value>> {
        let row = sqlx::query("DELETE FROM documents WHERE kind = ?1 AND id = ?2 RETURNING doc")
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode_doc(r.try_get::<&str, _>("doc")?)).transpose()
    }

    async fn increment(
        &self,
        kind: DocumentKind,
        id: &str,
        field: &'static str,
        delta: i64,
    ) -> AppResult<Option<Value>> {
        let path = static_path(field)?;
        let now = now_timestamp();
        let sql = format!(
            r#"UPDATE documents
               SET doc = json_set(doc, {path}, MAX(COALESCE(json_extract(doc, {path}), 0) + ?1, 0), '$.updatedAt', ?2),
                   updated_at = ?2
               WHERE kind = ?3 AND id = ?4
               RETURNING doc"#,
            path = path
        );
        let row = sqlx::query(&sql)
            .bind(delta)
            .bind(&now)
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| decode_doc(r.try_get::<&str, _>("doc")?)).transpose()
    }

    async fn update_many(
        &self,
        kind: DocumentKind,
        query: &DocumentQuery,
        patch: Map<String, Value>,
    ) -> AppResult<u64> {
        let now = now_timestamp();
        let patch = patch_json(patch, &now)?;

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE documents SET doc = ");
        push_shallow_merge(&mut qb, patch);
        qb.push(", updated_at = ");
        qb.push_bind(now);
        push_kind_and_filters(&mut qb, kind, query)?;

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, kind: DocumentKind, query: &DocumentQuery) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM documents");
        push_kind_and_filters(&mut qb, kind, query)?;
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
