//! The contract every key management backend implements

use crate::error::Result;
use crate::reference::KeyReference;
use async_trait::async_trait;
use keyless_crypto::{PublicKey, Signature};
use keyless_types::{HashFunction, KeyAlgorithm};
use std::fmt;

/// A resolved key: everything the façade needs to sign and verify with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle {
    /// Backend-specific key identifier
    pub key_id: String,
    /// Algorithm family of the key
    pub algorithm: KeyAlgorithm,
    /// Public half of the key
    pub public_key: PublicKey,
    /// Hash used when the caller does not ask for one
    pub default_hash: HashFunction,
    /// Hash functions this key can sign with
    pub hash_functions: Vec<HashFunction>,
}

/// A remote (or in-process) signing service
///
/// Backends only see digests. Hashing, option handling and local
/// verification live in [`crate::SignerVerifier`].
#[async_trait]
pub trait KmsBackend: Send + Sync + fmt::Debug {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    /// Key algorithms this backend can create and use
    fn supported_algorithms(&self) -> &[KeyAlgorithm];

    /// Algorithm used when the caller does not choose one
    fn default_algorithm(&self) -> KeyAlgorithm;

    /// Hash functions accepted for signing
    fn supported_hash_functions(&self) -> &[HashFunction];

    /// Hash functions accepted for verification
    fn supported_verify_hash_functions(&self) -> &[HashFunction] {
        self.supported_hash_functions()
    }

    /// Look the key up and describe it
    async fn resolve(&self, reference: &KeyReference) -> Result<KeyHandle>;

    /// Sign a digest produced by `hash`
    async fn sign(&self, key: &KeyHandle, digest: &[u8], hash: HashFunction) -> Result<Signature>;

    /// Ask the backend itself whether `signature` matches `digest`
    async fn verify_remotely(
        &self,
        key: &KeyHandle,
        signature: &[u8],
        digest: &[u8],
        hash: HashFunction,
    ) -> Result<()>;

    /// Create the key named by `reference`, or return it if it already exists
    async fn create_key(
        &self,
        reference: &KeyReference,
        algorithm: KeyAlgorithm,
    ) -> Result<KeyHandle>;
}
