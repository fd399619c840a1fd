//! Error types for keyless-crypto

use crate::digest::Purpose;
use keyless_types::HashFunction;
use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum Error {
    /// Signing error
    #[error("Signing error: {0}")]
    Signing(String),

    /// Verification error
    #[error("Verification error: {0}")]
    Verification(String),

    /// Invalid key format
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Unsupported algorithm
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Hash function not accepted by the backend
    #[error("hash function {function} is not supported for {purpose}")]
    UnsupportedHash {
        /// The rejected function
        function: HashFunction,
        /// Signing or verification
        purpose: Purpose,
    },

    /// A supplied digest does not match its hash function
    #[error("{function} digest must be {expected} bytes, got {actual}")]
    DigestLength {
        function: HashFunction,
        expected: usize,
        actual: usize,
    },

    /// Neither a message nor a digest was supplied
    #[error("no message or digest to hash")]
    MissingMessage,

    /// Reading the message failed
    #[error("I/O error: {0}")]
    Io(String),

    /// PEM encoding/decoding error
    #[error("PEM error: {0}")]
    Pem(String),

    /// DER encoding/decoding error
    #[error("DER error: {0}")]
    Der(String),

    /// Certificate parsing/validation error
    #[error("Certificate error: {0}")]
    InvalidCertificate(String),
}

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, Error>;
