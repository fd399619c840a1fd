//! Signatures, public keys and in-process ECDSA keys

use crate::error::{Error, Result};
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, RSA_ENCRYPTION, SECP_256_R_1, SECP_384_R_1, SECP_521_R_1};
use const_oid::ObjectIdentifier;
use der::asn1::UintRef;
use der::{Decode, Encode};
use keyless_types::{Base64, KeyAlgorithm};
use p256::pkcs8::EncodePublicKey;
use signature::hazmat::PrehashSigner;
use spki::SubjectPublicKeyInfoRef;

/// A cryptographic signature
///
/// This type wraps raw signature bytes exactly as the backend produced them
/// (ASN.1 DER for ECDSA, PKCS#1 v1.5 for RSA).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Create a new Signature from raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw signature bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Get the length of the signature in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the signature is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode the signature as base64
    pub fn to_base64(&self) -> Base64 {
        Base64::encode(&self.0)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A public key in DER-encoded SubjectPublicKeyInfo form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(Vec<u8>);

#[derive(der::Sequence)]
struct RsaPublicKey<'a> {
    modulus: UintRef<'a>,
    public_exponent: UintRef<'a>,
}

impl PublicKey {
    /// Wrap DER-encoded SPKI bytes after checking they parse
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        SubjectPublicKeyInfoRef::from_der(&der)
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid SPKI: {}", e)))?;
        Ok(Self(der))
    }

    /// Parse a PEM `PUBLIC KEY` block
    pub fn from_pem(pem_text: &str) -> Result<Self> {
        let block = pem::parse(pem_text).map_err(|e| Error::Pem(e.to_string()))?;
        if block.tag() != "PUBLIC KEY" {
            return Err(Error::Pem(format!("unexpected PEM tag {}", block.tag())));
        }
        Self::from_der(block.into_contents())
    }

    /// The DER-encoded SPKI
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    /// PEM encoding with `PUBLIC KEY` headers
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("PUBLIC KEY", self.0.clone()))
    }

    /// Work out the key algorithm from the SPKI algorithm identifier
    pub fn algorithm(&self) -> Result<KeyAlgorithm> {
        let spki = SubjectPublicKeyInfoRef::from_der(&self.0)
            .map_err(|e| Error::InvalidKeyFormat(format!("invalid SPKI: {}", e)))?;
        let alg_oid = spki.algorithm.oid;

        if alg_oid == ID_EC_PUBLIC_KEY {
            let params = spki.algorithm.parameters.ok_or_else(|| {
                Error::InvalidKeyFormat("EC key missing curve parameters".to_string())
            })?;
            let curve = ObjectIdentifier::from_bytes(params.value()).map_err(|e| {
                Error::InvalidKeyFormat(format!("failed to parse EC curve OID: {}", e))
            })?;
            return match curve {
                c if c == SECP_256_R_1 => Ok(KeyAlgorithm::EcdsaP256),
                c if c == SECP_384_R_1 => Ok(KeyAlgorithm::EcdsaP384),
                c if c == SECP_521_R_1 => Ok(KeyAlgorithm::EcdsaP521),
                other => Err(Error::UnsupportedAlgorithm(format!("EC curve {}", other))),
            };
        }

        if alg_oid == RSA_ENCRYPTION {
            let rsa = RsaPublicKey::from_der(spki.subject_public_key.raw_bytes())
                .map_err(|e| Error::InvalidKeyFormat(format!("invalid RSA key: {}", e)))?;
            return match rsa.modulus.as_bytes().len() * 8 {
                2048 => Ok(KeyAlgorithm::Rsa2048),
                3072 => Ok(KeyAlgorithm::Rsa3072),
                4096 => Ok(KeyAlgorithm::Rsa4096),
                bits => Err(Error::UnsupportedAlgorithm(format!("RSA-{}", bits))),
            };
        }

        tracing::warn!("Unknown public key algorithm OID: {}", alg_oid);
        Err(Error::UnsupportedAlgorithm(alg_oid.to_string()))
    }
}

/// An in-process ECDSA key pair
///
/// Signs digests, never whole messages: hashing is the caller's job so the
/// same code path serves local keys and remote backends.
pub enum EcdsaKeyPair {
    /// NIST P-256 key
    P256(p256::ecdsa::SigningKey),
    /// NIST P-384 key
    P384(p384::ecdsa::SigningKey),
}

impl EcdsaKeyPair {
    /// Generate a fresh key for `algorithm`
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        let mut rng = rand::rngs::OsRng;
        match algorithm {
            KeyAlgorithm::EcdsaP256 => Ok(EcdsaKeyPair::P256(p256::ecdsa::SigningKey::random(
                &mut rng,
            ))),
            KeyAlgorithm::EcdsaP384 => Ok(EcdsaKeyPair::P384(p384::ecdsa::SigningKey::random(
                &mut rng,
            ))),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "cannot generate {} keys in process",
                other
            ))),
        }
    }

    /// The algorithm of this key
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            EcdsaKeyPair::P256(_) => KeyAlgorithm::EcdsaP256,
            EcdsaKeyPair::P384(_) => KeyAlgorithm::EcdsaP384,
        }
    }

    /// The public half in SPKI form
    pub fn public_key(&self) -> Result<PublicKey> {
        let document = match self {
            EcdsaKeyPair::P256(key) => key.verifying_key().to_public_key_der(),
            EcdsaKeyPair::P384(key) => key.verifying_key().to_public_key_der(),
        }
        .map_err(|e| Error::Der(e.to_string()))?;
        Ok(PublicKey(document.as_bytes().to_vec()))
    }

    /// Sign a digest, returning an ASN.1 DER ECDSA signature
    pub fn sign_digest(&self, digest: &[u8]) -> Result<Signature> {
        let der = match self {
            EcdsaKeyPair::P256(key) => {
                let sig: p256::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| Error::Signing(e.to_string()))?;
                sig.to_der().to_bytes().to_vec()
            }
            EcdsaKeyPair::P384(key) => {
                let sig: p384::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| Error::Signing(e.to_string()))?;
                sig.to_der().to_bytes().to_vec()
            }
        };
        Ok(Signature::new(der))
    }
}

impl std::fmt::Debug for EcdsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EcdsaKeyPair").field(&self.algorithm()).finish()
    }
}

/// Re-encode an SPKI structure, used when a certificate hands us a parsed one
pub fn encode_spki(spki: &spki::SubjectPublicKeyInfoOwned) -> Result<PublicKey> {
    let der = spki.to_der().map_err(|e| Error::Der(e.to_string()))?;
    Ok(PublicKey(der))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;
    use keyless_types::HashFunction;

    #[test]
    fn test_generate_reports_algorithm() {
        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        assert_eq!(kp.public_key().unwrap().algorithm().unwrap(), KeyAlgorithm::EcdsaP256);

        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP384).unwrap();
        assert_eq!(kp.public_key().unwrap().algorithm().unwrap(), KeyAlgorithm::EcdsaP384);
    }

    #[test]
    fn test_rsa_cannot_be_generated_in_process() {
        assert!(matches!(
            EcdsaKeyPair::generate(KeyAlgorithm::Rsa2048),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_sign_digest_produces_der() {
        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let sig = kp
            .sign_digest(&hash::digest(HashFunction::Sha256, b"test data to sign"))
            .unwrap();
        // DER SEQUENCE tag
        assert_eq!(sig.as_bytes()[0], 0x30);
    }

    #[test]
    fn test_public_key_pem_roundtrip() {
        let kp = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let public = kp.public_key().unwrap();
        let pem = public.to_pem();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert_eq!(PublicKey::from_pem(&pem).unwrap(), public);
    }
}
