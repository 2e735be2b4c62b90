//! Error types for the ingestion pipeline
//!
//! Each layer has its own enum. [`CollectError`] and [`StoreError`] are
//! recovered inside the pipeline and only ever surface as counters in
//! [`RunStats`](crate::stats::RunStats); [`PipelineError`] is the fatal
//! precondition layer returned to the caller.

use acervo_common::AcervoError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single source while collecting raw records
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("Invalid CSS selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("All {0} pages failed")]
    AllPagesFailed(usize),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl CollectError {
    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Whether retrying the same request may succeed
    ///
    /// Connect and timeout failures, HTTP 429 and 5xx are transient. Any
    /// other status, and every non-network error, is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            CollectError::Http { source, .. } => source.is_connect() || source.is_timeout(),
            CollectError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Failure of a store operation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Store rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Store rejected write (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode store response: {0}")]
    Decode(String),
}

/// Fatal failure that aborts a run before or instead of producing stats
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Target table '{0}' does not exist")]
    TableMissing(String),

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid source definition: {0}")]
    Source(#[from] CollectError),

    #[error(transparent)]
    Config(#[from] AcervoError),
}

impl PipelineError {
    pub fn missing_credentials(msg: impl Into<String>) -> Self {
        Self::MissingCredentials(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let status = |status| CollectError::Status {
            url: "http://example.test".to_string(),
            status,
        };
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(403).is_transient());
    }

    #[test]
    fn test_parse_error_is_permanent() {
        assert!(!CollectError::parse("seed list", "unexpected token").is_transient());
        assert!(!CollectError::AllPagesFailed(2).is_transient());
    }
}
