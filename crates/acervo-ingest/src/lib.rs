//! Acervo Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pipeline that collects cultural-reference records from independent
//! sources, normalizes them against a closed taxonomy, deduplicates them
//! against the store, and persists them in paced batches.
//!
//! # Pipeline
//!
//! - **Collectors**: [`collectors::Collector`] adapters run through a [`collectors::CollectorRegistry`]
//! - **Normalizer**: [`normalize::Normalizer`] turns raw records into clean records or rejections
//! - **Deduplicator**: [`dedup::Deduplicator`] applies first-occurrence-wins on canonical keys
//! - **BatchPersister**: [`persist::BatchPersister`] inserts batches with per-record fallback
//! - **Orchestrator**: [`orchestrator::Orchestrator`] drives a run and reports [`stats::RunStats`]
//!
//! # Example
//!
//! ```no_run
//! use acervo_ingest::collectors::{CollectorRegistry, SeedCollector};
//! use acervo_ingest::config::IngestConfig;
//! use acervo_ingest::orchestrator::Orchestrator;
//! use acervo_ingest::store::MemoryStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = CollectorRegistry::new().with(SeedCollector::new());
//!     let store = Arc::new(MemoryStore::new());
//!     let mut orchestrator = Orchestrator::new(registry, store, &IngestConfig::default());
//!
//!     let report = orchestrator.run(&CancellationToken::new()).await?;
//!     report.log_summary();
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod dedup;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod persist;
pub mod retry;
pub mod stats;
pub mod store;

pub use config::IngestConfig;
pub use error::{CollectError, PipelineError, StoreError};
pub use orchestrator::{Orchestrator, RunPhase, RunReport};
pub use stats::RunStats;

use collectors::{CollectorRegistry, SeedCollector, SourcesFile};
use std::path::Path;
use tracing::info;

/// Build the collector registry for a run
///
/// An explicit `sources` path wins over `SOURCES_FILE`; with neither, the
/// registry holds only the built-in seed list.
pub fn build_registry(config: &IngestConfig, sources: Option<&Path>) -> Result<CollectorRegistry, PipelineError> {
    match sources.or(config.sources_file.as_deref()) {
        Some(path) => {
            info!("Loading sources from {}", path.display());
            Ok(SourcesFile::load(path)?.into_registry(&config.fetch)?)
        },
        None => Ok(CollectorRegistry::new().with(SeedCollector::new())),
    }
}
