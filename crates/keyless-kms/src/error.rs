//! Error types for keyless-kms

use keyless_types::{Cancelled, HashFunction, KeyAlgorithm};
use thiserror::Error;

/// Errors from key management backends and the signer façade
#[derive(Error, Debug)]
pub enum Error {
    /// Algorithm outside the backend's supported set
    #[error("algorithm {algorithm} is not supported by {backend}")]
    UnsupportedAlgorithm {
        algorithm: String,
        backend: &'static str,
    },

    /// Hash function outside the backend's supported set
    #[error("hash function {function} is not supported by {backend}")]
    UnsupportedHash {
        function: HashFunction,
        backend: &'static str,
    },

    /// The signature does not match
    #[error("signature verification failed: {0}")]
    Verification(String),

    /// The call was cancelled or ran past its deadline
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// The key reference could not be parsed
    #[error("invalid key reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    /// No key exists behind the reference
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The backend failed for some other reason
    #[error("{backend} error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    /// Local cryptographic failure
    #[error(transparent)]
    Crypto(#[from] keyless_crypto::Error),
}

impl Error {
    pub(crate) fn backend(backend: &'static str, message: impl std::fmt::Display) -> Self {
        Error::Backend {
            backend,
            message: message.to_string(),
        }
    }

    pub(crate) fn unsupported_algorithm(algorithm: KeyAlgorithm, backend: &'static str) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.to_string(),
            backend,
        }
    }

    /// Whether this is a cancellation rather than a backend failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Result type for key management operations
pub type Result<T> = std::result::Result<T, Error>;
