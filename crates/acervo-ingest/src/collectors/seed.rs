//! Curated built-in reference list

use super::Collector;
use crate::error::CollectError;
use acervo_common::types::RawRecord;
use async_trait::async_trait;

const SEED_DATA: &str = include_str!("../../data/seed.json");

/// Emits the embedded seed list
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedCollector;

impl SeedCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn records() -> Result<Vec<RawRecord>, CollectError> {
        serde_json::from_str(SEED_DATA).map_err(|e| CollectError::parse("embedded seed list", e))
    }
}

#[async_trait]
impl Collector for SeedCollector {
    fn name(&self) -> &str {
        "seed"
    }

    async fn collect(&self) -> Result<Vec<RawRecord>, CollectError> {
        Self::records()
    }
}
