//! Error types for keyless-fulcio

use keyless_types::Cancelled;
use thiserror::Error;

/// Errors that can occur in Fulcio operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure, passed through unmodified
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service failed internally (HTTP 500)
    #[error("certificate authority internal error ({status}): {body}")]
    Internal {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The service refused the request (any other non-2xx status)
    #[error("certificate request rejected ({status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// A successful response carried no certificates
    #[error("certificate authority returned an empty certificate chain")]
    EmptyCertificateChain,

    /// The returned chain could not be parsed
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// The call was cancelled or ran out of time
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl From<keyless_crypto::Error> for Error {
    fn from(e: keyless_crypto::Error) -> Self {
        Error::Certificate(e.to_string())
    }
}

/// Result type for Fulcio operations
pub type Result<T> = std::result::Result<T, Error>;
