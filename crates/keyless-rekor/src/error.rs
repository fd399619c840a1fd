//! Error types for keyless-rekor

use keyless_types::Cancelled;
use thiserror::Error;

/// Errors that can occur in Rekor operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(String),

    /// The log refused the entry
    #[error("log rejected entry ({status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The log answered with something that is not a log entry
    #[error("invalid log response: {0}")]
    InvalidResponse(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The call was cancelled or ran out of time
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Result type for Rekor operations
pub type Result<T> = std::result::Result<T, Error>;
