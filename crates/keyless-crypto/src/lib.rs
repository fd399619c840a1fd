//! Cryptographic primitives for keyless signing
//!
//! Hashing, digest resolution against a backend's capabilities, in-process
//! ECDSA keys, local verification and certificate parsing.

pub mod digest;
pub mod error;
pub mod hash;
pub mod signing;
pub mod verification;
pub mod x509;

pub use digest::{
    check_digest_length, compute_digest_for_signing, compute_digest_for_verifying,
    ensure_supported, resolve_digest, Purpose,
};
pub use error::{Error, Result};
pub use hash::{sha256, Hasher};
pub use signing::{EcdsaKeyPair, PublicKey, Signature};
pub use verification::{verify_message, verify_prehashed};
pub use x509::{parse_pem_chain, CertificateInfo, ParsedCertificate};
