//! Ingestion configuration
//!
//! Everything is read from environment variables (after an optional `.env`
//! file is loaded by the binary). Parsing goes through a lookup function so
//! the same code path is testable without touching the process environment.

use crate::normalize::ValidationLimits;
use crate::retry::RetryPolicy;
use acervo_common::{AcervoError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TABLE: &str = "cultural_references";

/// Upper bound for every configured pause, in seconds (one day)
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Upper bound for `RETRY_BACKOFF_MULTIPLIER`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

/// Main ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub store: StoreConfig,
    pub batch: BatchConfig,
    pub fetch: FetchConfig,
    pub limits: ValidationLimits,
    /// Collectors run in parallel
    pub collect_concurrency: usize,
    /// TOML file listing sources; only the built-in seed list when unset
    pub sources_file: Option<PathBuf>,
    /// Ask before the Persisting phase
    pub require_confirmation: bool,
}

/// Target store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `postgres://` or `http(s)://` URL
    pub url: Option<String>,
    /// API key for the REST backend
    #[serde(skip_serializing)]
    pub key: Option<String>,
    pub table: String,
    pub max_connections: u32,
}

/// Batch persistence pacing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchConfig {
    pub batch_size: usize,
    /// 0 means unlimited
    pub max_total_records: usize,
    pub batch_delay_secs: f64,
}

/// HTTP fetch discipline for collectors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub retry_base_delay_secs: f64,
    pub retry_backoff_multiplier: f64,
    pub timeout_secs: u64,
    pub delay_between_requests_secs: f64,
    pub user_agent: String,
}

/// Which store implementation a [`StoreConfig`] selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { url: String },
    Rest { url: String, key: String },
}

impl IngestConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |names: &[&str]| names.iter().find_map(|name| lookup(*name)).filter(|v| !v.trim().is_empty());

        let config = Self {
            store: StoreConfig {
                url: var(&["STORE_URL", "SUPABASE_URL"]),
                key: var(&["STORE_KEY", "SUPABASE_KEY"]),
                table: var(&["STORE_TABLE"]).unwrap_or(defaults.store.table),
                max_connections: parse_var(&lookup, "STORE_MAX_CONNECTIONS", defaults.store.max_connections)?,
            },
            batch: BatchConfig {
                batch_size: parse_var(&lookup, "BATCH_SIZE", defaults.batch.batch_size)?,
                max_total_records: parse_var(&lookup, "MAX_TOTAL_RECORDS", defaults.batch.max_total_records)?,
                batch_delay_secs: parse_var(&lookup, "BATCH_DELAY_SECONDS", defaults.batch.batch_delay_secs)?,
            },
            fetch: FetchConfig {
                max_retries: parse_var(&lookup, "MAX_RETRIES", defaults.fetch.max_retries)?,
                retry_base_delay_secs: parse_var(
                    &lookup,
                    "RETRY_BASE_DELAY_SECONDS",
                    defaults.fetch.retry_base_delay_secs,
                )?,
                retry_backoff_multiplier: parse_var(
                    &lookup,
                    "RETRY_BACKOFF_MULTIPLIER",
                    defaults.fetch.retry_backoff_multiplier,
                )?,
                timeout_secs: parse_var(&lookup, "TIMEOUT_SECONDS", defaults.fetch.timeout_secs)?,
                delay_between_requests_secs: parse_var(
                    &lookup,
                    "DELAY_BETWEEN_REQUESTS",
                    defaults.fetch.delay_between_requests_secs,
                )?,
                user_agent: var(&["USER_AGENT"]).unwrap_or(defaults.fetch.user_agent),
            },
            limits: ValidationLimits {
                min_term_length: parse_var(&lookup, "MIN_TERM_LENGTH", defaults.limits.min_term_length)?,
                max_term_length: parse_var(&lookup, "MAX_TERM_LENGTH", defaults.limits.max_term_length)?,
                min_meaning_length: parse_var(&lookup, "MIN_MEANING_LENGTH", defaults.limits.min_meaning_length)?,
                max_meaning_length: parse_var(&lookup, "MAX_MEANING_LENGTH", defaults.limits.max_meaning_length)?,
            },
            collect_concurrency: parse_var(&lookup, "COLLECT_CONCURRENCY", defaults.collect_concurrency)?,
            sources_file: var(&["SOURCES_FILE"]).map(PathBuf::from),
            require_confirmation: parse_flag(&lookup, "REQUIRE_CONFIRMATION")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.collect_concurrency == 0 {
            return Err(AcervoError::config("COLLECT_CONCURRENCY must be greater than 0"));
        }
        self.store.validate()?;
        self.batch.validate()?;
        self.fetch.validate()?;
        self.limits.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.table) {
            return Err(AcervoError::config(format!(
                "STORE_TABLE must be a plain SQL identifier, got: {}",
                self.table
            )));
        }
        if self.max_connections == 0 {
            return Err(AcervoError::config("STORE_MAX_CONNECTIONS must be greater than 0"));
        }
        Ok(())
    }

    /// Resolve the backend, failing when required credentials are absent
    pub fn backend(&self) -> std::result::Result<StoreBackend, crate::error::PipelineError> {
        use crate::error::PipelineError;

        let url = self
            .url
            .clone()
            .ok_or_else(|| PipelineError::missing_credentials("STORE_URL (or SUPABASE_URL) is not set"))?;

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(StoreBackend::Postgres { url })
        } else if url.starts_with("http://") || url.starts_with("https://") {
            let key = self.key.clone().ok_or_else(|| {
                PipelineError::missing_credentials("STORE_KEY (or SUPABASE_KEY) is required for a REST store")
            })?;
            Ok(StoreBackend::Rest { url, key })
        } else {
            Err(AcervoError::config(format!(
                "STORE_URL must start with postgres://, http:// or https://, got: {}",
                url
            ))
            .into())
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(AcervoError::config("BATCH_SIZE must be greater than 0"));
        }
        check_delay("BATCH_DELAY_SECONDS", self.batch_delay_secs)
    }

    /// Get inter-batch pause as Duration
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs_f64(self.batch_delay_secs)
    }

    /// Per-run record cap, if any
    pub fn record_cap(&self) -> Option<usize> {
        (self.max_total_records > 0).then_some(self.max_total_records)
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(AcervoError::config("MAX_RETRIES must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(AcervoError::config("TIMEOUT_SECONDS must be greater than 0"));
        }
        check_delay("RETRY_BASE_DELAY_SECONDS", self.retry_base_delay_secs)?;
        check_delay("DELAY_BETWEEN_REQUESTS", self.delay_between_requests_secs)?;
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.retry_backoff_multiplier) {
            return Err(AcervoError::config(format!(
                "RETRY_BACKOFF_MULTIPLIER must be between 1 and {}",
                MAX_BACKOFF_MULTIPLIER
            )));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the pause after each successful page fetch
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_between_requests_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_secs_f64(self.retry_base_delay_secs),
            multiplier: self.retry_backoff_multiplier,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            batch: BatchConfig::default(),
            fetch: FetchConfig::default(),
            limits: ValidationLimits::default(),
            collect_concurrency: 4,
            sources_file: None,
            require_confirmation: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: DEFAULT_TABLE.to_string(),
            max_connections: 5,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_total_records: 1000,
            batch_delay_secs: 1.0,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_secs: 2.0,
            retry_backoff_multiplier: 2.0,
            timeout_secs: 30,
            delay_between_requests_secs: 2.0,
            user_agent: format!("acervo-ingest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|e| AcervoError::config(format!("Invalid {}='{}': {}", name, value, e))),
        _ => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, name: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(AcervoError::config(format!("Invalid {}='{}': expected a boolean", name, v))),
        },
    }
}

/// Pauses must convert to a `Duration`: finite, non-negative, at most [`MAX_DELAY_SECS`]
fn check_delay(name: &str, secs: f64) -> Result<()> {
    if (0.0..=MAX_DELAY_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(AcervoError::config(format!(
            "{} must be between 0 and {} seconds, got: {}",
            name, MAX_DELAY_SECS, secs
        )))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63
}
