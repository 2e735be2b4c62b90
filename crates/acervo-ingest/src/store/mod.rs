//! Persisted store contract and its backends
//!
//! Any durable tabular store with a `cultural_references`-shaped table
//! satisfies [`ReferenceStore`]. `insert_many` is all-or-nothing: callers
//! get no partial-success signal from it and fall back to `insert_one`.

pub mod dry_run;
pub mod memory;
pub mod postgres;
pub mod rest;

pub use dry_run::DryRunStore;
pub use memory::MemoryStore;
pub use postgres::PgReferenceStore;
pub use rest::RestReferenceStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{PipelineError, StoreError};
use acervo_common::types::CleanRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Short backend label for logs
    fn backend_name(&self) -> &'static str;

    /// Startup precondition: does the target table exist?
    async fn table_exists(&self) -> StoreResult<bool>;

    /// Every `termo` value currently stored
    async fn select_keys(&self) -> StoreResult<HashSet<String>>;

    /// Insert the whole batch or nothing
    async fn insert_many(&self, records: &[CleanRecord]) -> StoreResult<()>;

    async fn insert_one(&self, record: &CleanRecord) -> StoreResult<()>;
}

/// Open the store selected by `STORE_URL`
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn ReferenceStore>, PipelineError> {
    let store: Arc<dyn ReferenceStore> = match config.backend()? {
        StoreBackend::Postgres { url } => {
            Arc::new(PgReferenceStore::connect(&url, config.max_connections, &config.table).await?)
        },
        StoreBackend::Rest { url, key } => Arc::new(RestReferenceStore::new(&url, &key, &config.table)?),
    };

    info!("Using {} store (table: {})", store.backend_name(), config.table);
    Ok(store)
}
