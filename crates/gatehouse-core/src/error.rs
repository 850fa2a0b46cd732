//! Error types for the gatehouse core library.

use thiserror::Error;

/// Result type alias using the gatehouse core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types shared across gatehouse components.
#[derive(Debug, Error)]
pub enum Error {
    /// A permission schedule could not be parsed.
    #[error("Invalid schedule: {0}")]
    Schedule(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
