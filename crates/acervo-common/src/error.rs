//! Error types shared across acervo crates

use thiserror::Error;

/// Result type alias for acervo operations
pub type Result<T> = std::result::Result<T, AcervoError>;

/// Main error type for acervo
#[derive(Error, Debug)]
pub enum AcervoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown reference kind: {0}")]
    UnknownKind(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl AcervoError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
