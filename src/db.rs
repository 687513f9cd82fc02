use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqlitePool, SqlitePoolOptions},
    Sqlite,
};
use tracing::info;

use crate::config::{self, DatabaseConfig};

/// Opens (and creates, if needed) the SQLite database described by `cfg`.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let db_url = cfg.resolved_url();
    config::ensure_sqlite_parent_dir(&db_url)?;
    if !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
        info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(&db_url).await?;
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await?;
                sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&db_url)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // WAL is best-effort: in-memory databases refuse it.
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }

    // One table holds every document kind; `seq` breaks ties between equal timestamps.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS documents (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            id TEXT NOT NULL,
            doc TEXT NOT NULL CHECK (json_valid(doc)),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (kind, id)
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        (
            "idx_documents_kind_created",
            "CREATE INDEX IF NOT EXISTS idx_documents_kind_created ON documents(kind, created_at DESC, seq DESC)",
        ),
        (
            "idx_items_collection",
            "CREATE INDEX IF NOT EXISTS idx_items_collection ON documents(json_extract(doc, '$.collectionId')) WHERE kind = 'items'",
        ),
        (
            "idx_collections_owner",
            "CREATE INDEX IF NOT EXISTS idx_collections_owner ON documents(json_extract(doc, '$.ownerId')) WHERE kind = 'collections'",
        ),
        (
            "idx_tags_name",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_name ON documents(json_extract(doc, '$.tagName')) WHERE kind = 'tags'",
        ),
        (
            "idx_comments_item",
            "CREATE INDEX IF NOT EXISTS idx_comments_item ON documents(json_extract(doc, '$.itemId')) WHERE kind = 'comments'",
        ),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    Ok(())
}
