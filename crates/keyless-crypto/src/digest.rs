//! Digest resolution against a backend's supported hash functions
//!
//! Signing backends only ever see a digest and the function that produced
//! it. These helpers turn "a message, or maybe a digest someone already
//! computed" into that pair, refusing anything the backend cannot handle.

use crate::error::{Error, Result};
use crate::hash::Hasher;
use keyless_types::HashFunction;
use std::io::Read;

/// Which side of the contract is asking, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Producing a signature
    Signing,
    /// Checking a signature
    Verifying,
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Purpose::Signing => f.write_str("signing"),
            Purpose::Verifying => f.write_str("verification"),
        }
    }
}

/// Fail unless `function` is in `supported`
pub fn ensure_supported(
    function: HashFunction,
    supported: &[HashFunction],
    purpose: Purpose,
) -> Result<()> {
    if supported.contains(&function) {
        Ok(())
    } else {
        Err(Error::UnsupportedHash { function, purpose })
    }
}

/// Check that a pre-computed digest has the size `function` produces
pub fn check_digest_length(digest: &[u8], function: HashFunction) -> Result<()> {
    if digest.len() == function.digest_size() {
        Ok(())
    } else {
        Err(Error::DigestLength {
            function,
            expected: function.digest_size(),
            actual: digest.len(),
        })
    }
}

/// Resolve the digest to hand to a backend
///
/// A supplied `digest` wins and is used verbatim after a size check.
/// Otherwise `message` is streamed through `function`.
pub fn resolve_digest<R: Read + ?Sized>(
    message: Option<&mut R>,
    digest: Option<&[u8]>,
    function: HashFunction,
    supported: &[HashFunction],
    purpose: Purpose,
) -> Result<Vec<u8>> {
    ensure_supported(function, supported, purpose)?;

    if let Some(digest) = digest {
        check_digest_length(digest, function)?;
        return Ok(digest.to_vec());
    }

    let message = message.ok_or(Error::MissingMessage)?;
    let mut hasher = Hasher::new(function);
    hasher
        .update_reader(message)
        .map_err(|e| Error::Io(format!("reading message: {}", e)))?;
    Ok(hasher.finalize())
}

/// [`resolve_digest`] for producing a signature
pub fn compute_digest_for_signing<R: Read + ?Sized>(
    message: Option<&mut R>,
    digest: Option<&[u8]>,
    function: HashFunction,
    supported: &[HashFunction],
) -> Result<Vec<u8>> {
    resolve_digest(message, digest, function, supported, Purpose::Signing)
}

/// [`resolve_digest`] for checking a signature
pub fn compute_digest_for_verifying<R: Read + ?Sized>(
    message: Option<&mut R>,
    digest: Option<&[u8]>,
    function: HashFunction,
    supported: &[HashFunction],
) -> Result<Vec<u8>> {
    resolve_digest(message, digest, function, supported, Purpose::Verifying)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;

    const ONLY_256: &[HashFunction] = &[HashFunction::Sha256];

    #[test]
    fn test_computes_digest_from_message() {
        let mut message: &[u8] = b"hello";
        let digest =
            compute_digest_for_signing(Some(&mut message), None, HashFunction::Sha256, ONLY_256)
                .unwrap();
        assert_eq!(digest, hash::sha256(b"hello").to_vec());
    }

    #[test]
    fn test_supplied_digest_used_verbatim() {
        let supplied = [7u8; 32];
        let digest = compute_digest_for_signing::<&[u8]>(
            None,
            Some(&supplied),
            HashFunction::Sha256,
            ONLY_256,
        )
        .unwrap();
        assert_eq!(digest, supplied.to_vec());
    }

    #[test]
    fn test_unsupported_function_rejected() {
        let mut message: &[u8] = b"hello";
        let err = compute_digest_for_verifying(
            Some(&mut message),
            None,
            HashFunction::Sha512,
            ONLY_256,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedHash {
                function: HashFunction::Sha512,
                purpose: Purpose::Verifying
            }
        ));
    }

    #[test]
    fn test_wrong_digest_length_rejected() {
        let err = compute_digest_for_signing::<&[u8]>(
            None,
            Some(&[0u8; 20]),
            HashFunction::Sha256,
            ONLY_256,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DigestLength { actual: 20, .. }));
    }

    #[test]
    fn test_nothing_to_hash() {
        let err = compute_digest_for_signing::<&[u8]>(None, None, HashFunction::Sha256, ONLY_256)
            .unwrap_err();
        assert!(matches!(err, Error::MissingMessage));
    }
}
