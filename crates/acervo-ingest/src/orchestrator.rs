// Cultural-reference ingestion orchestrator
//
// Drives one run: collect from every source, normalize and dedup the union
// against a single store snapshot, then persist in sequential batches.
// The orchestrator is the only owner of mutable run state.

use crate::collectors::CollectorRegistry;
use crate::config::{BatchConfig, IngestConfig};
use crate::dedup::{Deduplicator, ExistingKeySet};
use crate::error::PipelineError;
use crate::normalize::Normalizer;
use crate::persist::{partition, BatchPersister};
use crate::stats::RunStats;
use crate::store::ReferenceStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run state machine
///
/// `Idle -> Collecting -> Normalizing -> Persisting -> Completed`, with
/// `Interrupted` on operator cancellation and `Failed` on a fatal
/// precondition from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Collecting,
    Normalizing,
    Persisting,
    Completed,
    Interrupted,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Collecting => "collecting",
            RunPhase::Normalizing => "normalizing",
            RunPhase::Persisting => "persisting",
            RunPhase::Completed => "completed",
            RunPhase::Interrupted => "interrupted",
            RunPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Interrupted | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the Persisting phase is about to do, shown to a confirmation hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistPlan {
    pub backend: &'static str,
    pub records: usize,
    pub batches: usize,
    pub truncated: usize,
}

/// Caller-supplied gate invoked before persisting; `false` declines
///
/// A `false` returned after the run's token was cancelled ends the run as
/// interrupted instead of declined.
pub type ConfirmFn = Box<dyn Fn(&PersistPlan) -> bool + Send + Sync>;

/// Final result of a run that did not hit a fatal precondition
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stats: RunStats,
    pub phase: RunPhase,
    /// The confirmation hook declined the Persisting phase
    pub persistence_declined: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn log_summary(&self) {
        info!(
            "=== Run summary ({}, started {}) ===",
            self.phase,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        self.stats.log_summary();
        if self.persistence_declined {
            info!("Persistence declined; nothing was written");
        }
        info!("Elapsed: {:.2}s", self.elapsed.as_secs_f64());
    }
}

pub struct Orchestrator {
    registry: CollectorRegistry,
    store: Arc<dyn ReferenceStore>,
    table: String,
    normalizer: Normalizer,
    batch: BatchConfig,
    concurrency: usize,
    confirm: Option<ConfirmFn>,
    phase: RunPhase,
}

impl Orchestrator {
    pub fn new(registry: CollectorRegistry, store: Arc<dyn ReferenceStore>, config: &IngestConfig) -> Self {
        Self {
            registry,
            store,
            table: config.store.table.clone(),
            normalizer: Normalizer::new(config.limits),
            batch: config.batch.clone(),
            concurrency: config.collect_concurrency,
            confirm: None,
            phase: RunPhase::Idle,
        }
    }

    /// Require `confirm` to approve the Persisting phase
    pub fn with_confirmation(mut self, confirm: ConfirmFn) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn transition(&mut self, next: RunPhase) {
        info!("Phase: {} -> {}", self.phase, next);
        self.phase = next;
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        error!("Run aborted: {}", error);
        self.transition(RunPhase::Failed);
        error
    }

    /// Validate store preconditions before any work starts
    async fn check_preconditions(&self) -> Result<(), PipelineError> {
        if !self.store.table_exists().await? {
            return Err(PipelineError::TableMissing(self.table.clone()));
        }
        Ok(())
    }

    /// Execute one run
    ///
    /// Returns `Err` only for fatal preconditions (store unreachable, table
    /// absent, snapshot unreadable); everything else is reflected in the
    /// report's stats.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<RunReport, PipelineError> {
        let started = (Utc::now(), Instant::now());
        let mut stats = RunStats::default();
        self.phase = RunPhase::Idle;

        info!(
            "Starting ingestion run: {} source(s), {} store",
            self.registry.len(),
            self.store.backend_name()
        );

        if let Err(e) = self.check_preconditions().await {
            return Err(self.fail(e));
        }

        // Step 1: collect
        self.transition(RunPhase::Collecting);
        let collected = self.registry.collect_all(self.concurrency, cancel).await;
        stats.collected = collected.records.len();
        stats.sources_failed = collected.sources_failed;

        if collected.cancelled {
            return Ok(self.interrupted(stats, started));
        }

        // Step 2: snapshot existing keys once
        let existing = match self.store.select_keys().await {
            Ok(terms) => ExistingKeySet::from_terms(terms),
            Err(e) => return Err(self.fail(e.into())),
        };
        info!("Loaded {} existing keys from store", existing.len());

        // Step 3: normalize
        self.transition(RunPhase::Normalizing);
        let mut clean = Vec::with_capacity(collected.records.len());
        for raw in &collected.records {
            match self.normalizer.normalize(raw) {
                Ok(record) => clean.push(record),
                Err(rejection) => {
                    debug!(term = ?raw.term, "Rejected record: {}", rejection);
                    stats.rejected += 1;
                },
            }
        }
        stats.validated = clean.len();

        // Step 4: dedup
        let deduped = Deduplicator::new().filter(clean, &existing);
        stats.duplicates_skipped = deduped.duplicates_skipped();
        stats.accepted = deduped.accepted.len();
        info!(
            "Normalized {} of {} records; {} accepted, {} duplicates ({} already stored)",
            stats.validated,
            stats.collected,
            stats.accepted,
            stats.duplicates_skipped,
            deduped.skipped_existing
        );

        if cancel.is_cancelled() {
            return Ok(self.interrupted(stats, started));
        }

        // Step 5: persist
        let persister = BatchPersister::new(self.store.clone(), self.batch.clone());
        let records = persister.capped_len(deduped.accepted.len());
        let plan = PersistPlan {
            backend: self.store.backend_name(),
            records,
            batches: partition(&deduped.accepted[..records], self.batch.batch_size).len(),
            truncated: deduped.accepted.len() - records,
        };

        if plan.records > 0 {
            if let Some(confirm) = &self.confirm {
                if !confirm(&plan) {
                    if cancel.is_cancelled() {
                        return Ok(self.interrupted(stats, started));
                    }
                    warn!("Persistence declined by operator");
                    self.transition(RunPhase::Completed);
                    return Ok(self.report(stats, true, started));
                }
            }
        }

        self.transition(RunPhase::Persisting);
        let persisted = persister.persist(deduped.accepted, cancel).await;
        stats.inserted = persisted.inserted;
        stats.errors = persisted.errors;
        stats.truncated = persisted.truncated;
        stats.batches = persisted.batches;

        if persisted.cancelled {
            return Ok(self.interrupted(stats, started));
        }

        self.transition(RunPhase::Completed);
        Ok(self.report(stats, false, started))
    }

    fn interrupted(&mut self, stats: RunStats, started: (DateTime<Utc>, Instant)) -> RunReport {
        warn!("Run interrupted; reporting partial statistics");
        self.transition(RunPhase::Interrupted);
        self.report(stats, false, started)
    }

    fn report(&self, stats: RunStats, persistence_declined: bool, started: (DateTime<Utc>, Instant)) -> RunReport {
        if self.phase == RunPhase::Completed {
            if let Err(violation) = stats.check_invariants() {
                error!("Run statistics inconsistent: {}", violation);
            }
        }

        RunReport {
            stats,
            phase: self.phase,
            persistence_declined,
            started_at: started.0,
            elapsed: started.1.elapsed(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases() {
        assert!(RunPhase::Completed.is_terminal());
        assert!(RunPhase::Interrupted.is_terminal());
        assert!(RunPhase::Failed.is_terminal());
        assert!(!RunPhase::Persisting.is_terminal());
        assert!(!RunPhase::Idle.is_terminal());
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        assert_eq!(serde_json::to_value(RunPhase::Interrupted).unwrap(), "interrupted");
    }
}
