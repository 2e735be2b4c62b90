//! In-process store for tests and local experiments

use super::{ReferenceStore, StoreResult};
use crate::error::StoreError;
use acervo_common::types::{CanonicalKey, CleanRecord};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

/// One write call as observed by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertCall {
    Many { size: usize, succeeded: bool },
    One { key: CanonicalKey, succeeded: bool },
}

#[derive(Debug, Default)]
struct MemoryState {
    existing: Vec<String>,
    rows: Vec<CleanRecord>,
    calls: Vec<InsertCall>,
}

/// Store backed by a `Vec`
///
/// Terms registered with [`MemoryStore::rejecting`] behave like rows that
/// violate a store-side constraint: any batch containing one fails as a
/// whole, and the single-row insert for it fails too.
#[derive(Debug)]
pub struct MemoryStore {
    table_present: bool,
    reachable: bool,
    rejected: HashSet<CanonicalKey>,
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            table_present: true,
            reachable: true,
            rejected: HashSet::new(),
            state: Mutex::new(MemoryState::default()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed terms that already exist before the run
    pub fn with_existing<I, S>(self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let existing = terms.into_iter().map(Into::into).collect();
        Self {
            state: Mutex::new(MemoryState {
                existing,
                ..Default::default()
            }),
            ..self
        }
    }

    pub fn rejecting<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rejected
            .extend(terms.into_iter().map(|t| CanonicalKey::from_term(t.as_ref())));
        self
    }

    pub fn without_table(mut self) -> Self {
        self.table_present = false;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Rows inserted through this store, in insertion order
    pub async fn rows(&self) -> Vec<CleanRecord> {
        self.state.lock().await.rows.clone()
    }

    pub async fn calls(&self) -> Vec<InsertCall> {
        self.state.lock().await.calls.clone()
    }

    fn check_reachable(&self) -> StoreResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(StoreError::Unreachable("memory store marked unreachable".to_string()))
        }
    }

    fn violation(key: &CanonicalKey) -> StoreError {
        StoreError::Rejected {
            status: 409,
            message: format!("constraint violation for '{}'", key),
        }
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn table_exists(&self) -> StoreResult<bool> {
        self.check_reachable()?;
        Ok(self.table_present)
    }

    async fn select_keys(&self) -> StoreResult<HashSet<String>> {
        self.check_reachable()?;
        let state = self.state.lock().await;
        Ok(state
            .existing
            .iter()
            .cloned()
            .chain(state.rows.iter().map(|row| row.term.clone()))
            .collect())
    }

    async fn insert_many(&self, records: &[CleanRecord]) -> StoreResult<()> {
        self.check_reachable()?;
        let mut state = self.state.lock().await;

        let offending = records
            .iter()
            .map(CleanRecord::key)
            .find(|key| self.rejected.contains(key));

        state.calls.push(InsertCall::Many {
            size: records.len(),
            succeeded: offending.is_none(),
        });

        match offending {
            Some(key) => Err(Self::violation(&key)),
            None => {
                state.rows.extend_from_slice(records);
                Ok(())
            },
        }
    }

    async fn insert_one(&self, record: &CleanRecord) -> StoreResult<()> {
        self.check_reachable()?;
        let mut state = self.state.lock().await;

        let key = record.key();
        let succeeded = !self.rejected.contains(&key);
        state.calls.push(InsertCall::One {
            key: key.clone(),
            succeeded,
        });

        if succeeded {
            state.rows.push(record.clone());
            Ok(())
        } else {
            Err(Self::violation(&key))
        }
    }
}
