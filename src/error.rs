//! Error types for glucowatch

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlucoseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure reported by an alert sink. Never propagated past the debouncer.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert output unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    #[error("Alert playback failed: {0}")]
    Playback(String),
}
