//! TOML source definitions
//!
//! ```toml
//! [[source]]
//! type = "seed"
//!
//! [[source]]
//! type = "json"
//! name = "export-2024"
//! path = "exports/refs.json"
//!
//! [[source]]
//! type = "html"
//! name = "dicionario"
//! urls = ["https://example.org/girias"]
//! item_selector = "div.verbete"
//! term_selector = "h2"
//! meaning_selector = "p.significado"
//! ```

use super::{CollectorRegistry, HtmlCollector, HtmlSource, HttpFetcher, JsonFileCollector, SeedCollector};
use crate::config::FetchConfig;
use crate::error::CollectError;
use acervo_common::{AcervoError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcesFile {
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDefinition {
    Seed,
    Json {
        #[serde(default)]
        name: Option<String>,
        path: PathBuf,
    },
    Html(HtmlSource),
}

impl SourcesFile {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AcervoError::config(format!("Invalid sources file: {}", e)))
    }

    /// Load a sources file; relative JSON paths resolve against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AcervoError::config(format!("Cannot read sources file {}: {}", path.display(), e)))?;

        let mut file = Self::parse(&text)?;
        if let Some(base) = path.parent() {
            file.resolve_paths(base);
        }
        Ok(file)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            if let SourceDefinition::Json { path, .. } = source {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    /// Build collectors in file order
    pub fn into_registry(self, fetch: &FetchConfig) -> std::result::Result<CollectorRegistry, CollectError> {
        let mut registry = CollectorRegistry::new();
        let mut fetcher: Option<Arc<HttpFetcher>> = None;

        for source in self.sources {
            match source {
                SourceDefinition::Seed => registry.register(SeedCollector::new()),
                SourceDefinition::Json { name, path } => {
                    let name = name.unwrap_or_else(|| path.display().to_string());
                    registry.register(JsonFileCollector::new(name, path));
                },
                SourceDefinition::Html(html) => {
                    let shared = match fetcher.clone() {
                        Some(shared) => shared,
                        None => {
                            let created = Arc::new(HttpFetcher::new(fetch)?);
                            fetcher = Some(created.clone());
                            created
                        },
                    };
                    registry.register(HtmlCollector::new(html, shared)?);
                },
            }
        }

        Ok(registry)
    }
}
