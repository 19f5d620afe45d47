//! Error types for Nocturne

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid timezone offset: {0}")]
    InvalidTimezone(i32),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("Model is untrained or degenerate (zero coefficient)")]
    UntrainedModel,
}
