//! JSON export collector

use super::Collector;
use crate::error::CollectError;
use acervo_common::types::RawRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Reads a JSON array of raw records from disk
///
/// Both English (`term`, `kind`, ...) and column-name (`termo`, `tipo`, ...)
/// keys are accepted.
#[derive(Debug, Clone)]
pub struct JsonFileCollector {
    name: String,
    path: PathBuf,
}

impl JsonFileCollector {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl Collector for JsonFileCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self) -> Result<Vec<RawRecord>, CollectError> {
        debug!("Reading raw records from {}", self.path.display());

        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| CollectError::Io {
                path: self.path.clone(),
                source,
            })?;

        serde_json::from_str(&text).map_err(|e| CollectError::parse(self.path.display().to_string(), e))
    }
}
