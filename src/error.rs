//! Error types for rust_wgcna

use thiserror::Error;

/// Main error type for WGCNA operations
#[derive(Error, Debug)]
pub enum WgcnaError {
    #[error("Invalid expression matrix: {reason}")]
    InvalidExpressionMatrix { reason: String },

    #[error("Invalid trait table: {reason}")]
    InvalidTraits { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Computation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
}

/// Result type alias for WGCNA operations
pub type Result<T> = std::result::Result<T, WgcnaError>;
