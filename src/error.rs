//! Error types for the task board.

use thiserror::Error;

/// Main error type for the store, storage slot and suggestion engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected at the store boundary
    #[error("validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the analysis service
    #[error("analysis service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Analysis response did not match the suggestion shape
    #[error("schema error: {0}")]
    Schema(String),
}

/// Result type alias for the task board
pub type Result<T> = std::result::Result<T, Error>;
