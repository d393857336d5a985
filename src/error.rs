//! Error types for Last Stand

use thiserror::Error;

/// Errors that can occur while building an activity summary
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid sample: {0}")]
    InvalidSample(String),
}
