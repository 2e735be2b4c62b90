//! Shared fixtures for acervo-ingest integration tests
#![allow(dead_code)]

use acervo_common::types::RawRecord;
use acervo_ingest::collectors::Collector;
use acervo_ingest::config::IngestConfig;
use acervo_ingest::CollectError;
use async_trait::async_trait;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,acervo_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Collector that returns a fixed list
pub struct StaticCollector {
    name: String,
    records: Vec<RawRecord>,
}

impl StaticCollector {
    pub fn new(name: &str, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.to_string(),
            records,
        }
    }
}

#[async_trait]
impl Collector for StaticCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<RawRecord>, CollectError> {
        Ok(self.records.clone())
    }
}

/// Collector whose source is always down
pub struct BrokenCollector;

#[async_trait]
impl Collector for BrokenCollector {
    fn name(&self) -> &str {
        "broken"
    }

    async fn collect(&self) -> Result<Vec<RawRecord>, CollectError> {
        Err(CollectError::Status {
            url: "http://broken.test/girias".to_string(),
            status: 503,
        })
    }
}

/// `n` valid raw records with distinct terms
pub fn valid_records(prefix: &str, n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            RawRecord::new(format!("{prefix} {i}"), "giria", format!("Significado do termo {prefix} {i}"))
                .with_region("nacional")
        })
        .collect()
}

/// Defaults with a short inter-batch pause
pub fn test_config() -> IngestConfig {
    let mut config = IngestConfig::default();
    config.batch.batch_delay_secs = 0.5;
    config
}
