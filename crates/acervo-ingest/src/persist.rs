//! Sequential batch persistence with per-record fallback

use crate::config::BatchConfig;
use crate::store::ReferenceStore;
use acervo_common::types::CleanRecord;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Split `items` into contiguous batches of at most `batch_size`
///
/// Yields `ceil(n / batch_size)` batches; all but the last are full.
pub fn partition<T>(items: &[T], batch_size: usize) -> Vec<&[T]> {
    items.chunks(batch_size.max(1)).collect()
}

/// Counters contributed by one persistence pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    pub inserted: usize,
    pub errors: usize,
    pub truncated: usize,
    pub batches: usize,
    /// Cancelled before every batch was attempted
    pub cancelled: bool,
}

pub struct BatchPersister {
    store: Arc<dyn ReferenceStore>,
    config: BatchConfig,
}

impl BatchPersister {
    pub fn new(store: Arc<dyn ReferenceStore>, config: BatchConfig) -> Self {
        Self { store, config }
    }

    /// Number of accepted records that survive the per-run cap
    pub fn capped_len(&self, accepted: usize) -> usize {
        self.config
            .record_cap()
            .map_or(accepted, |cap| accepted.min(cap))
    }

    /// Persist `accepted` in order, one batch at a time
    ///
    /// Batches are never in flight concurrently. Cancellation is honored
    /// before each batch and during the inter-batch pause; batches not yet
    /// started are neither inserted nor counted as errors.
    pub async fn persist(&self, mut accepted: Vec<CleanRecord>, cancel: &CancellationToken) -> PersistOutcome {
        let mut outcome = PersistOutcome::default();

        let keep = self.capped_len(accepted.len());
        if keep < accepted.len() {
            outcome.truncated = accepted.len() - keep;
            accepted.truncate(keep);
            info!(
                "Capping run at {} records; {} left for a future run",
                keep, outcome.truncated
            );
        }

        let batches = partition(&accepted, self.config.batch_size);
        let total_batches = batches.len();
        let delay = self.config.batch_delay();

        for (index, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Persistence interrupted before batch {}/{}", index + 1, total_batches);
                outcome.cancelled = true;
                break;
            }

            info!(
                "Inserting batch {}/{} ({} records)",
                index + 1,
                total_batches,
                batch.len()
            );
            outcome.batches += 1;

            match self.store.insert_many(batch).await {
                Ok(()) => outcome.inserted += batch.len(),
                Err(e) => {
                    warn!(
                        batch = index + 1,
                        "Batch insert failed ({}), falling back to individual inserts", e
                    );
                    let (inserted, errors) = self.insert_individually(batch).await;
                    outcome.inserted += inserted;
                    outcome.errors += errors;
                },
            }

            if index + 1 < total_batches && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        warn!("Persistence interrupted after batch {}/{}", index + 1, total_batches);
                        outcome.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        outcome
    }

    async fn insert_individually(&self, batch: &[CleanRecord]) -> (usize, usize) {
        let mut inserted = 0;
        let mut errors = 0;

        for record in batch {
            match self.store.insert_one(record).await {
                Ok(()) => {
                    debug!(key = %record.key(), "Inserted record");
                    inserted += 1;
                },
                Err(e) => {
                    error!(key = %record.key(), "Failed to insert record: {}", e);
                    errors += 1;
                },
            }
        }

        (inserted, errors)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::memory::{InsertCall, MemoryStore};
    use acervo_common::types::{CanonicalKey, ReferenceKind, Region};
    use proptest::prelude::*;
    use std::time::Duration;

    fn records(n: usize) -> Vec<CleanRecord> {
        (0..n)
            .map(|i| CleanRecord {
                term: format!("Termo {i}"),
                kind: ReferenceKind::Giria,
                meaning: format!("Significado número {i}"),
                usage_example: String::new(),
                region: Region::Nacional,
                flirt_context: String::new(),
            })
            .collect()
    }

    fn config(batch_size: usize, max_total_records: usize) -> BatchConfig {
        BatchConfig {
            batch_size,
            max_total_records,
            batch_delay_secs: 1.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_batch_inserted_atomically() {
        let store = Arc::new(MemoryStore::new());
        let persister = BatchPersister::new(store.clone(), config(50, 1000));

        let outcome = persister.persist(records(50), &CancellationToken::new()).await;

        assert_eq!(outcome.inserted, 50);
        assert_eq!(outcome.errors, 0);
        assert_eq!(outcome.batches, 1);
        assert_eq!(store.calls().await, vec![InsertCall::Many { size: 50, succeeded: true }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_batch_falls_back_per_record() {
        let store = Arc::new(MemoryStore::new().rejecting(["Termo 17"]));
        let persister = BatchPersister::new(store.clone(), config(50, 1000));

        let outcome = persister.persist(records(50), &CancellationToken::new()).await;

        assert_eq!(outcome.inserted, 49);
        assert_eq!(outcome.errors, 1);
        assert_eq!(store.rows().await.len(), 49);

        let calls = store.calls().await;
        assert_eq!(calls.len(), 51);
        assert!(calls.contains(&InsertCall::One {
            key: CanonicalKey::from_term("termo 17"),
            succeeded: false
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_truncates_tail() {
        let store = Arc::new(MemoryStore::new());
        let persister = BatchPersister::new(store.clone(), config(4, 10));

        let outcome = persister.persist(records(25), &CancellationToken::new()).await;

        assert_eq!(outcome.inserted, 10);
        assert_eq!(outcome.truncated, 15);
        assert_eq!(outcome.batches, 3);
        assert_eq!(store.rows().await.last().unwrap().term, "Termo 9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_batches() {
        let store = Arc::new(MemoryStore::new());
        let persister = BatchPersister::new(store, config(2, 0));
        let started = tokio::time::Instant::now();

        persister.persist(records(6), &CancellationToken::new()).await;

        // three batches, two pauses
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_skips_remaining_batches() {
        let store = Arc::new(MemoryStore::new());
        let persister = BatchPersister::new(store.clone(), config(2, 0));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                cancel.cancel();
            })
        };

        let outcome = persister.persist(records(10), &cancel).await;
        canceller.await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.batches, 2);
        assert_eq!(outcome.inserted, 4);
        assert_eq!(outcome.errors, 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_inserts_nothing() {
        let store = Arc::new(MemoryStore::new());
        let persister = BatchPersister::new(store.clone(), config(2, 0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = persister.persist(records(3), &cancel).await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.batches, 0);
        assert!(store.calls().await.is_empty());
    }

    proptest! {
        #[test]
        fn prop_partition_law(n in 0usize..500, batch_size in 1usize..80) {
            let items: Vec<usize> = (0..n).collect();
            let batches = partition(&items, batch_size);

            prop_assert_eq!(batches.len(), n.div_ceil(batch_size));
            if let Some((last, full)) = batches.split_last() {
                prop_assert!(full.iter().all(|b| b.len() == batch_size));
                let expected_last = if n % batch_size == 0 { batch_size } else { n % batch_size };
                prop_assert_eq!(last.len(), expected_last);
            }
            let flattened: Vec<usize> = batches.concat();
            prop_assert_eq!(flattened, items);
        }
    }
}
