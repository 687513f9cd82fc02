use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::store::{DocumentStore, SqliteDocumentStore};

/// The shared application state.
///
/// Cloned into every handler by axum; everything inside is either a pool handle or
/// behind an `Arc`, so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    /// Raw pool, used by the readiness probe.
    pub db: sqlx::SqlitePool,
    /// Document access for all resource handlers.
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        Self {
            store: Arc::new(SqliteDocumentStore::new(db.clone())),
            db,
            config: Arc::new(config),
            metrics: Metrics::new(),
        }
    }
}
