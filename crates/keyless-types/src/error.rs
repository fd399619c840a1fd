//! Error types for keyless-types

use thiserror::Error;

/// Errors that can occur while parsing shared types
#[derive(Error, Debug)]
pub enum Error {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed base64 or hex text
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Unknown hash function name
    #[error("Invalid hash function: {0}")]
    InvalidHashFunction(String),

    /// Unknown key algorithm name
    #[error("Invalid key algorithm: {0}")]
    InvalidKeyAlgorithm(String),
}

/// Result type for keyless-types operations
pub type Result<T> = std::result::Result<T, Error>;
