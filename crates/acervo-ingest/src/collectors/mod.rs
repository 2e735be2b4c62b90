//! Source adapters producing raw records
//!
//! A [`Collector`] is one source. The [`CollectorRegistry`] runs them with
//! bounded parallelism and is the isolation boundary: an error from one
//! collector becomes zero records and one failed-source count, never a
//! failed run.

pub mod file;
pub mod html;
pub mod seed;
pub mod sources;

pub use file::JsonFileCollector;
pub use html::{HtmlCollector, HtmlSource, HttpFetcher};
pub use seed::SeedCollector;
pub use sources::{SourceDefinition, SourcesFile};

use crate::error::CollectError;
use acervo_common::types::RawRecord;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[async_trait]
pub trait Collector: Send + Sync {
    /// Source label used in logs
    fn name(&self) -> &str;

    async fn collect(&self) -> Result<Vec<RawRecord>, CollectError>;
}

/// Joined result of running every registered collector
#[derive(Debug, Default)]
pub struct CollectionOutcome {
    /// Records in registration order, then emission order
    pub records: Vec<RawRecord>,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    /// Collectors still running when the run was cancelled
    pub sources_abandoned: usize,
    pub cancelled: bool,
}

/// Ordered list of collectors
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Collector + 'static>(&mut self, collector: C) {
        self.collectors.push(Arc::new(collector));
    }

    pub fn with<C: Collector + 'static>(mut self, collector: C) -> Self {
        self.register(collector);
        self
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Run every collector, at most `concurrency` at a time
    ///
    /// Results are joined back in registration order whatever order the
    /// collectors finish in. On cancellation, collectors that already
    /// finished keep their records and in-flight ones are dropped.
    pub async fn collect_all(&self, concurrency: usize, cancel: &CancellationToken) -> CollectionOutcome {
        let mut slots: Vec<Option<Vec<RawRecord>>> = vec![None; self.collectors.len()];
        let mut outcome = CollectionOutcome::default();
        let mut finished = 0;

        let mut pending = stream::iter(self.collectors.iter().cloned().enumerate())
            .map(|(index, collector)| async move {
                let result = collector.collect().await;
                (index, collector, result)
            })
            .buffer_unordered(concurrency.max(1));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.cancelled = true;
                    outcome.sources_abandoned = self.collectors.len() - finished;
                    warn!(
                        "Collection interrupted with {} source(s) unfinished",
                        outcome.sources_abandoned
                    );
                    break;
                }
                next = pending.next() => match next {
                    Some((index, collector, Ok(records))) => {
                        info!(source = %collector.name(), "Collected {} records", records.len());
                        slots[index] = Some(records);
                        outcome.sources_succeeded += 1;
                        finished += 1;
                    },
                    Some((_, collector, Err(e))) => {
                        warn!(source = %collector.name(), "Source failed, contributing no records: {}", e);
                        outcome.sources_failed += 1;
                        finished += 1;
                    },
                    None => break,
                },
            }
        }

        outcome.records = slots.into_iter().flatten().flatten().collect();
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Fixed {
        name: &'static str,
        delay: Duration,
        result: Result<Vec<&'static str>, u16>,
    }

    #[async_trait]
    impl Collector for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn collect(&self) -> Result<Vec<RawRecord>, CollectError> {
            tokio::time::sleep(self.delay).await;
            match &self.result {
                Ok(terms) => Ok(terms
                    .iter()
                    .map(|t| RawRecord::new(*t, "giria", "Significado qualquer"))
                    .collect()),
                Err(status) => Err(CollectError::Status {
                    url: format!("http://{}.test", self.name),
                    status: *status,
                }),
            }
        }
    }

    fn fixed(name: &'static str, millis: u64, result: Result<Vec<&'static str>, u16>) -> Fixed {
        Fixed {
            name,
            delay: Duration::from_millis(millis),
            result,
        }
    }

    fn terms(outcome: &CollectionOutcome) -> Vec<&str> {
        outcome
            .records
            .iter()
            .map(|r| r.term.as_deref().unwrap())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_order_survives_completion_order() {
        let registry = CollectorRegistry::new()
            .with(fixed("slow", 300, Ok(vec!["a1", "a2"])))
            .with(fixed("fast", 10, Ok(vec!["b1"])));

        let outcome = registry.collect_all(4, &CancellationToken::new()).await;

        assert_eq!(terms(&outcome), vec!["a1", "a2", "b1"]);
        assert_eq!(outcome.sources_succeeded, 2);
        assert!(!outcome.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_source_is_isolated() {
        let registry = CollectorRegistry::new()
            .with(fixed("ok", 10, Ok(vec!["a1"])))
            .with(fixed("broken", 10, Err(503)))
            .with(fixed("also-ok", 10, Ok(vec!["c1"])));

        let outcome = registry.collect_all(1, &CancellationToken::new()).await;

        assert_eq!(terms(&outcome), vec!["a1", "c1"]);
        assert_eq!(outcome.sources_failed, 1);
        assert_eq!(outcome.sources_succeeded, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_finished_sources() {
        let registry = CollectorRegistry::new()
            .with(fixed("hangs", 60_000, Ok(vec!["never"])))
            .with(fixed("quick", 10, Ok(vec!["q1"])));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let outcome = registry.collect_all(2, &cancel).await;

        assert!(outcome.cancelled);
        assert_eq!(terms(&outcome), vec!["q1"]);
        assert_eq!(outcome.sources_abandoned, 1);
    }

    #[test]
    fn test_names_in_registration_order() {
        let registry = CollectorRegistry::new()
            .with(fixed("first", 0, Ok(vec![])))
            .with(fixed("second", 0, Ok(vec![])));
        assert_eq!(registry.names(), vec!["first", "second"]);
        assert_eq!(registry.len(), 2);
    }
}
