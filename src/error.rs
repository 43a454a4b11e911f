//! Error types for sleep session reconstruction
//!
//! The engine itself never fails on dirty data. These errors only surface at
//! the boundaries: decoding sample documents, loading configuration and
//! encoding output.

use thiserror::Error;

/// Errors that can occur outside the pure reconstruction core
#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("Failed to parse sample document: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
