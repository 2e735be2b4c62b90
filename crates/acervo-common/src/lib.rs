//! Acervo Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the acervo workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`AcervoError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: the cultural-reference record model shared by every stage
//!
//! # Example
//!
//! ```no_run
//! use acervo_common::types::{CanonicalKey, ReferenceKind};
//!
//! let key = CanonicalKey::from_term("  Maneiro ");
//! assert_eq!(key.as_str(), "maneiro");
//! assert_eq!("meme".parse::<ReferenceKind>().ok(), Some(ReferenceKind::Meme));
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{AcervoError, Result};
