//! Store wrapper that reads through and discards writes

use super::{ReferenceStore, StoreResult};
use acervo_common::types::CleanRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct DryRunStore {
    inner: Arc<dyn ReferenceStore>,
    would_insert: AtomicUsize,
}

impl DryRunStore {
    pub fn new(inner: Arc<dyn ReferenceStore>) -> Self {
        Self {
            inner,
            would_insert: AtomicUsize::new(0),
        }
    }

    /// Rows that would have been written
    pub fn would_insert(&self) -> usize {
        self.would_insert.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReferenceStore for DryRunStore {
    fn backend_name(&self) -> &'static str {
        "dry-run"
    }

    async fn table_exists(&self) -> StoreResult<bool> {
        self.inner.table_exists().await
    }

    async fn select_keys(&self) -> StoreResult<HashSet<String>> {
        self.inner.select_keys().await
    }

    async fn insert_many(&self, records: &[CleanRecord]) -> StoreResult<()> {
        debug!("[dry-run] would insert batch of {} rows", records.len());
        self.would_insert.fetch_add(records.len(), Ordering::Relaxed);
        Ok(())
    }

    async fn insert_one(&self, record: &CleanRecord) -> StoreResult<()> {
        debug!(key = %record.key(), "[dry-run] would insert row");
        self.would_insert.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
