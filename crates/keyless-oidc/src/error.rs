//! Error types for keyless-oidc

use keyless_types::Cancelled;
use thiserror::Error;

/// Errors that can occur in OIDC operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider metadata could not be fetched or parsed
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// Token error
    #[error("Token error: {0}")]
    Token(String),

    /// OAuth error
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The loopback redirect listener failed
    #[error("redirect listener error: {0}")]
    Listener(String),

    /// The flow was cancelled or timed out
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Result type for OIDC operations
pub type Result<T> = std::result::Result<T, Error>;
