//! Local signature verification over digests

use crate::error::{Error, Result};
use crate::hash;
use crate::signing::PublicKey;
use keyless_types::{HashFunction, KeyAlgorithm};
use p256::pkcs8::DecodePublicKey;
use signature::hazmat::PrehashVerifier;

/// Verify an ASN.1 DER ECDSA signature over a precomputed digest
///
/// Only P-256 and P-384 keys can be checked locally. RSA and P-521 keys
/// have to be verified by the backend that holds them.
pub fn verify_prehashed(public_key: &PublicKey, digest: &[u8], signature: &[u8]) -> Result<()> {
    match public_key.algorithm()? {
        KeyAlgorithm::EcdsaP256 => {
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(public_key.as_der())
                .map_err(|e| Error::InvalidKeyFormat(e.to_string()))?;
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|e| Error::Verification(format!("malformed signature: {}", e)))?;
            key.verify_prehash(digest, &sig)
                .map_err(|_| Error::Verification("ECDSA P-256 signature invalid".to_string()))
        }
        KeyAlgorithm::EcdsaP384 => {
            let key = p384::ecdsa::VerifyingKey::from_public_key_der(public_key.as_der())
                .map_err(|e| Error::InvalidKeyFormat(e.to_string()))?;
            let sig = p384::ecdsa::Signature::from_der(signature)
                .map_err(|e| Error::Verification(format!("malformed signature: {}", e)))?;
            key.verify_prehash(digest, &sig)
                .map_err(|_| Error::Verification("ECDSA P-384 signature invalid".to_string()))
        }
        other => Err(Error::UnsupportedAlgorithm(format!(
            "local verification of {} keys; use remote verification",
            other
        ))),
    }
}

/// Hash `data` with `function` and verify the signature over the result
pub fn verify_message(
    public_key: &PublicKey,
    data: &[u8],
    signature: &[u8],
    function: HashFunction,
) -> Result<()> {
    verify_prehashed(public_key, &hash::digest(function, data), signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::EcdsaKeyPair;

    #[test]
    fn test_verify_p256() {
        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let digest = hash::digest(HashFunction::Sha256, b"test data");
        let sig = kp.sign_digest(&digest).unwrap();
        assert!(verify_prehashed(&kp.public_key().unwrap(), &digest, sig.as_bytes()).is_ok());
    }

    #[test]
    fn test_verify_p384_with_sha512_digest() {
        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP384).unwrap();
        let sig = kp
            .sign_digest(&hash::digest(HashFunction::Sha512, b"test data"))
            .unwrap();
        assert!(verify_message(
            &kp.public_key().unwrap(),
            b"test data",
            sig.as_bytes(),
            HashFunction::Sha512
        )
        .is_ok());
    }

    #[test]
    fn test_verify_wrong_data() {
        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let sig = kp
            .sign_digest(&hash::digest(HashFunction::Sha256, b"test data"))
            .unwrap();
        let result = verify_message(
            &kp.public_key().unwrap(),
            b"wrong data",
            sig.as_bytes(),
            HashFunction::Sha256,
        );
        assert!(matches!(result, Err(Error::Verification(_))));
    }

    #[test]
    fn test_verify_bad_signature() {
        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let digest = hash::sha256(b"test data");
        assert!(verify_prehashed(&kp.public_key().unwrap(), &digest, &[0u8; 64]).is_err());
    }
}
