//! In-process key store
//!
//! Keys are generated inside the store and never leave it; callers only
//! get public keys and signatures back. This is where the ephemeral key of
//! a signing ceremony lives.

use crate::backend::{KeyHandle, KmsBackend};
use crate::error::{Error, Result};
use crate::reference::KeyReference;
use async_trait::async_trait;
use keyless_crypto::{EcdsaKeyPair, Signature};
use keyless_types::{HashFunction, KeyAlgorithm};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const NAME: &str = "localkms";

const SUPPORTED_ALGORITHMS: &[KeyAlgorithm] = &[KeyAlgorithm::EcdsaP256, KeyAlgorithm::EcdsaP384];

const SUPPORTED_HASHES: &[HashFunction] = &[
    HashFunction::Sha256,
    HashFunction::Sha384,
    HashFunction::Sha512,
];

/// In-memory ECDSA key store
#[derive(Debug, Clone, Default)]
pub struct LocalKms {
    keys: Arc<RwLock<HashMap<String, Arc<EcdsaKeyPair>>>>,
}

impl LocalKms {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn key_name(reference: &KeyReference) -> Result<&str> {
        match reference {
            KeyReference::Local { name } => Ok(name),
            other => Err(Error::InvalidReference {
                reference: other.to_string(),
                reason: format!("{} only serves {} references", NAME, other.scheme()),
            }),
        }
    }

    fn describe(name: &str, key: &EcdsaKeyPair) -> Result<KeyHandle> {
        let algorithm = key.algorithm();
        Ok(KeyHandle {
            key_id: name.to_string(),
            algorithm,
            public_key: key.public_key()?,
            default_hash: algorithm.default_hash_function(),
            hash_functions: SUPPORTED_HASHES.to_vec(),
        })
    }

    async fn key(&self, key_id: &str) -> Result<Arc<EcdsaKeyPair>> {
        self.keys
            .read()
            .await
            .get(key_id)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(key_id.to_string()))
    }
}

#[async_trait]
impl KmsBackend for LocalKms {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supported_algorithms(&self) -> &[KeyAlgorithm] {
        SUPPORTED_ALGORITHMS
    }

    fn default_algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::EcdsaP256
    }

    fn supported_hash_functions(&self) -> &[HashFunction] {
        SUPPORTED_HASHES
    }

    async fn resolve(&self, reference: &KeyReference) -> Result<KeyHandle> {
        let name = Self::key_name(reference)?;
        let key = self.key(name).await?;
        Self::describe(name, &key)
    }

    async fn sign(&self, key: &KeyHandle, digest: &[u8], hash: HashFunction) -> Result<Signature> {
        keyless_crypto::check_digest_length(digest, hash)?;
        let pair = self.key(&key.key_id).await?;
        tracing::debug!(key = %key.key_id, %hash, "signing digest in process");
        Ok(pair.sign_digest(digest)?)
    }

    async fn verify_remotely(
        &self,
        key: &KeyHandle,
        signature: &[u8],
        digest: &[u8],
        hash: HashFunction,
    ) -> Result<()> {
        keyless_crypto::check_digest_length(digest, hash)?;
        let public_key = self.key(&key.key_id).await?.public_key()?;
        keyless_crypto::verify_prehashed(&public_key, digest, signature).map_err(|e| match e {
            keyless_crypto::Error::Verification(msg) => Error::Verification(msg),
            other => Error::Crypto(other),
        })
    }

    async fn create_key(
        &self,
        reference: &KeyReference,
        algorithm: KeyAlgorithm,
    ) -> Result<KeyHandle> {
        if !SUPPORTED_ALGORITHMS.contains(&algorithm) {
            return Err(Error::unsupported_algorithm(algorithm, NAME));
        }
        let name = Self::key_name(reference)?;

        let mut keys = self.keys.write().await;
        if let Some(existing) = keys.get(name) {
            tracing::debug!(key = name, "key already exists, returning it");
            return Self::describe(name, existing);
        }

        let pair = EcdsaKeyPair::generate(algorithm)?;
        let handle = Self::describe(name, &pair)?;
        keys.insert(name.to_string(), Arc::new(pair));
        tracing::debug!(key = name, %algorithm, "created in-process key");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str) -> KeyReference {
        KeyReference::Local {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_resolve() {
        let kms = LocalKms::new();
        let created = kms
            .create_key(&reference("k"), KeyAlgorithm::EcdsaP384)
            .await
            .unwrap();
        assert_eq!(created.default_hash, HashFunction::Sha384);

        let resolved = kms.resolve(&reference("k")).await.unwrap();
        assert_eq!(resolved, created);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let kms = LocalKms::new();
        let first = kms
            .create_key(&reference("k"), KeyAlgorithm::EcdsaP256)
            .await
            .unwrap();
        let second = kms
            .create_key(&reference("k"), KeyAlgorithm::EcdsaP256)
            .await
            .unwrap();
        assert_eq!(first.public_key, second.public_key);
    }

    #[tokio::test]
    async fn test_resolve_missing_key() {
        let kms = LocalKms::new();
        assert!(matches!(
            kms.resolve(&reference("nope")).await,
            Err(Error::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_rsa() {
        let kms = LocalKms::new();
        assert!(matches!(
            kms.create_key(&reference("k"), KeyAlgorithm::Rsa2048).await,
            Err(Error::UnsupportedAlgorithm { .. })
        ));
    }

    #[tokio::test]
    async fn test_sign_and_verify_inside_store() {
        let kms = LocalKms::new();
        let handle = kms
            .create_key(&reference("k"), KeyAlgorithm::EcdsaP256)
            .await
            .unwrap();
        let digest = keyless_crypto::sha256(b"payload");
        let sig = kms
            .sign(&handle, &digest, HashFunction::Sha256)
            .await
            .unwrap();

        kms.verify_remotely(&handle, sig.as_bytes(), &digest, HashFunction::Sha256)
            .await
            .unwrap();

        let other = keyless_crypto::sha256(b"other");
        assert!(matches!(
            kms.verify_remotely(&handle, sig.as_bytes(), &other, HashFunction::Sha256)
                .await,
            Err(Error::Verification(_))
        ));
    }
}
