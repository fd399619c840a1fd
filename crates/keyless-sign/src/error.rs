//! Error types for keyless-sign

use crate::stage::Stage;
use keyless_types::Cancelled;
use thiserror::Error;

/// Errors raised while signing
#[derive(Error, Debug)]
pub enum Error {
    /// Obtaining the identity token failed
    #[error("authentication failed: {0}")]
    Auth(#[from] keyless_oidc::Error),

    /// The key backend failed
    #[error("signer error: {0}")]
    Signer(#[from] keyless_kms::Error),

    /// The certificate authority failed
    #[error("certificate issuance failed: {0}")]
    Issuance(#[from] keyless_fulcio::Error),

    /// The transparency log failed
    #[error("transparency log submission failed: {0}")]
    Log(#[from] keyless_rekor::Error),

    /// The issued certificate does not certify the ephemeral key
    #[error("certificate error: {0}")]
    Certificate(String),

    /// The artifact's media type is not on the allow-list
    #[error("file type currently not supported: {0}")]
    UnsupportedMediaType(String),

    /// A service call ran past its deadline or was cancelled
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Reading the artifact failed
    #[error("I/O error: {0}")]
    Io(String),
}

/// Failure categories, independent of which crate raised the error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth,
    UnsupportedAlgorithm,
    UnsupportedHash,
    IssuanceRejected,
    IssuanceInternal,
    EmptyCertificateChain,
    LogSubmission,
    Verification,
    Cancellation,
    UnsupportedMediaType,
    /// Transport failures talking to the certificate authority
    Transport,
    Other,
}

impl Error {
    /// The most specific category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(keyless_oidc::Error::Cancelled(_)) => ErrorKind::Cancellation,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Signer(e) => signer_kind(e),
            Error::Issuance(e) => match e {
                keyless_fulcio::Error::Internal { .. } => ErrorKind::IssuanceInternal,
                keyless_fulcio::Error::Rejected { .. } => ErrorKind::IssuanceRejected,
                keyless_fulcio::Error::EmptyCertificateChain => ErrorKind::EmptyCertificateChain,
                keyless_fulcio::Error::Cancelled(_) => ErrorKind::Cancellation,
                keyless_fulcio::Error::Http(_) => ErrorKind::Transport,
                keyless_fulcio::Error::Certificate(_) => ErrorKind::Other,
            },
            Error::Log(keyless_rekor::Error::Cancelled(_)) => ErrorKind::Cancellation,
            Error::Log(_) => ErrorKind::LogSubmission,
            Error::Cancelled(_) => ErrorKind::Cancellation,
            Error::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            Error::Certificate(_) | Error::Io(_) => ErrorKind::Other,
        }
    }
}

fn signer_kind(e: &keyless_kms::Error) -> ErrorKind {
    use keyless_kms::Error as Kms;
    match e {
        Kms::UnsupportedAlgorithm { .. } => ErrorKind::UnsupportedAlgorithm,
        Kms::UnsupportedHash { .. } => ErrorKind::UnsupportedHash,
        Kms::Verification(_) => ErrorKind::Verification,
        Kms::Cancelled(_) => ErrorKind::Cancellation,
        Kms::Crypto(keyless_crypto::Error::UnsupportedHash { .. }) => ErrorKind::UnsupportedHash,
        Kms::Crypto(keyless_crypto::Error::UnsupportedAlgorithm(_)) => {
            ErrorKind::UnsupportedAlgorithm
        }
        Kms::Crypto(keyless_crypto::Error::Verification(_)) => ErrorKind::Verification,
        _ => ErrorKind::Other,
    }
}

/// A ceremony that stopped before completing
///
/// `stage` is the state the failing step was trying to reach. Stages in
/// `reached` completed before the failure; none of them is undone.
#[derive(Error, Debug)]
#[error("signing failed before {stage}: {source}")]
pub struct CeremonyError {
    /// The stage that was not reached
    pub stage: Stage,
    /// Stages completed before the failure
    pub reached: Vec<Stage>,
    /// The underlying failure
    #[source]
    pub source: Error,
}

impl CeremonyError {
    /// Category of the underlying failure
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Result type for signing operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use keyless_types::{Cancelled, HashFunction};

    #[test]
    fn test_issuance_kinds() {
        let internal = Error::from(keyless_fulcio::Error::Internal {
            status: 500,
            body: String::new(),
        });
        assert_eq!(internal.kind(), ErrorKind::IssuanceInternal);

        let rejected = Error::from(keyless_fulcio::Error::Rejected {
            status: 401,
            body: String::new(),
        });
        assert_eq!(rejected.kind(), ErrorKind::IssuanceRejected);

        let empty = Error::from(keyless_fulcio::Error::EmptyCertificateChain);
        assert_eq!(empty.kind(), ErrorKind::EmptyCertificateChain);
    }

    #[test]
    fn test_cancellation_wins_over_origin() {
        let errors = [
            Error::from(keyless_oidc::Error::Cancelled(Cancelled::Cancelled)),
            Error::from(keyless_kms::Error::Cancelled(Cancelled::DeadlineExceeded)),
            Error::from(keyless_fulcio::Error::Cancelled(Cancelled::Cancelled)),
            Error::from(keyless_rekor::Error::Cancelled(Cancelled::DeadlineExceeded)),
            Error::from(Cancelled::DeadlineExceeded),
        ];
        for error in errors {
            assert_eq!(error.kind(), ErrorKind::Cancellation, "{}", error);
        }
    }

    #[test]
    fn test_signer_kinds() {
        let hash = Error::from(keyless_kms::Error::UnsupportedHash {
            function: HashFunction::Sha512,
            backend: "test",
        });
        assert_eq!(hash.kind(), ErrorKind::UnsupportedHash);

        let log = Error::from(keyless_rekor::Error::Http("connection refused".to_string()));
        assert_eq!(log.kind(), ErrorKind::LogSubmission);
    }
}
