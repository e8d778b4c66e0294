//! Error types for Harbor

use thiserror::Error;

/// Core error type for Harbor operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Harbor operations
pub type Result<T> = std::result::Result<T, CoreError>;
