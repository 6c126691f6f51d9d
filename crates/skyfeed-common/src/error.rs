//! Error types shared across Skyfeed crates

use thiserror::Error;

/// Result type alias for Skyfeed operations
pub type Result<T> = std::result::Result<T, SkyfeedError>;

/// Main error type for Skyfeed
#[derive(Error, Debug)]
pub enum SkyfeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
