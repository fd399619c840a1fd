//! AWS KMS backend
//!
//! Keys are addressed by id, alias or ARN. Signing and remote verification
//! send the digest with `MessageType::Digest`, so the payload never leaves
//! the caller.

use crate::backend::{KeyHandle, KmsBackend};
use crate::error::{Error, Result};
use crate::reference::KeyReference;
use async_trait::async_trait;
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::types::{KeySpec, KeyUsageType, MessageType, SigningAlgorithmSpec};
use aws_sdk_kms::Client;
use keyless_crypto::{PublicKey, Signature};
use keyless_types::{HashFunction, KeyAlgorithm};

const NAME: &str = "awskms";

const SUPPORTED_ALGORITHMS: &[KeyAlgorithm] = &[
    KeyAlgorithm::Rsa2048,
    KeyAlgorithm::Rsa3072,
    KeyAlgorithm::Rsa4096,
    KeyAlgorithm::EcdsaP256,
    KeyAlgorithm::EcdsaP384,
    KeyAlgorithm::EcdsaP521,
];

const SUPPORTED_HASHES: &[HashFunction] = &[
    HashFunction::Sha256,
    HashFunction::Sha384,
    HashFunction::Sha512,
];

/// A connection to AWS KMS
#[derive(Debug, Clone)]
pub struct AwsKms {
    client: Client,
}

impl AwsKms {
    /// Wrap an existing SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client for `reference`
    ///
    /// Credentials come from the SDK's default provider chain. The region
    /// is taken from the ARN when the reference carries one, and a
    /// non-empty endpoint overrides the service URL.
    pub async fn connect(reference: &KeyReference) -> Result<Self> {
        let KeyReference::Aws {
            endpoint, region, ..
        } = reference
        else {
            return Err(Error::InvalidReference {
                reference: reference.to_string(),
                reason: format!("{} only serves awskms:// references", NAME),
            });
        };

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(format!("https://{}", endpoint));
        }
        let config = loader.load().await;
        Ok(Self::new(Client::new(&config)))
    }

    fn key_id(reference: &KeyReference) -> Result<&str> {
        match reference {
            KeyReference::Aws { key_id, .. } => Ok(key_id),
            other => Err(Error::InvalidReference {
                reference: other.to_string(),
                reason: format!("{} only serves awskms:// references", NAME),
            }),
        }
    }

    async fn fetch(&self, key_id: &str) -> Result<KeyHandle> {
        let out = self
            .client
            .get_public_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_not_found_exception())
                    .unwrap_or(false)
                {
                    Error::KeyNotFound(key_id.to_string())
                } else {
                    Error::backend(NAME, DisplayErrorContext(&e))
                }
            })?;

        let der = out
            .public_key()
            .ok_or_else(|| Error::backend(NAME, "GetPublicKey returned no key"))?
            .as_ref()
            .to_vec();
        let public_key = PublicKey::from_der(der)?;

        let algorithm = match out.key_spec() {
            Some(spec) => algorithm_from_spec(spec)?,
            None => public_key.algorithm()?,
        };

        let mut hash_functions: Vec<HashFunction> = Vec::new();
        for function in out.signing_algorithms().iter().filter_map(hash_of_spec) {
            if !hash_functions.contains(&function) {
                hash_functions.push(function);
            }
        }
        let default_hash = hash_functions
            .first()
            .copied()
            .unwrap_or_else(|| algorithm.default_hash_function());
        if hash_functions.is_empty() {
            hash_functions.push(default_hash);
        }

        Ok(KeyHandle {
            key_id: out.key_id().unwrap_or(key_id).to_string(),
            algorithm,
            public_key,
            default_hash,
            hash_functions,
        })
    }
}

fn algorithm_from_spec(spec: &KeySpec) -> Result<KeyAlgorithm> {
    match spec {
        KeySpec::Rsa2048 => Ok(KeyAlgorithm::Rsa2048),
        KeySpec::Rsa3072 => Ok(KeyAlgorithm::Rsa3072),
        KeySpec::Rsa4096 => Ok(KeyAlgorithm::Rsa4096),
        KeySpec::EccNistP256 => Ok(KeyAlgorithm::EcdsaP256),
        KeySpec::EccNistP384 => Ok(KeyAlgorithm::EcdsaP384),
        KeySpec::EccNistP521 => Ok(KeyAlgorithm::EcdsaP521),
        other => Err(Error::UnsupportedAlgorithm {
            algorithm: other.as_str().to_string(),
            backend: NAME,
        }),
    }
}

fn spec_from_algorithm(algorithm: KeyAlgorithm) -> KeySpec {
    match algorithm {
        KeyAlgorithm::Rsa2048 => KeySpec::Rsa2048,
        KeyAlgorithm::Rsa3072 => KeySpec::Rsa3072,
        KeyAlgorithm::Rsa4096 => KeySpec::Rsa4096,
        KeyAlgorithm::EcdsaP256 => KeySpec::EccNistP256,
        KeyAlgorithm::EcdsaP384 => KeySpec::EccNistP384,
        KeyAlgorithm::EcdsaP521 => KeySpec::EccNistP521,
    }
}

// PSS variants are never chosen for signing, only reported
fn hash_of_spec(spec: &SigningAlgorithmSpec) -> Option<HashFunction> {
    match spec {
        SigningAlgorithmSpec::EcdsaSha256
        | SigningAlgorithmSpec::RsassaPkcs1V15Sha256
        | SigningAlgorithmSpec::RsassaPssSha256 => Some(HashFunction::Sha256),
        SigningAlgorithmSpec::EcdsaSha384
        | SigningAlgorithmSpec::RsassaPkcs1V15Sha384
        | SigningAlgorithmSpec::RsassaPssSha384 => Some(HashFunction::Sha384),
        SigningAlgorithmSpec::EcdsaSha512
        | SigningAlgorithmSpec::RsassaPkcs1V15Sha512
        | SigningAlgorithmSpec::RsassaPssSha512 => Some(HashFunction::Sha512),
        _ => None,
    }
}

fn signing_algorithm(algorithm: KeyAlgorithm, hash: HashFunction) -> SigningAlgorithmSpec {
    match (algorithm.is_ecdsa(), hash) {
        (true, HashFunction::Sha256) => SigningAlgorithmSpec::EcdsaSha256,
        (true, HashFunction::Sha384) => SigningAlgorithmSpec::EcdsaSha384,
        (true, HashFunction::Sha512) => SigningAlgorithmSpec::EcdsaSha512,
        (false, HashFunction::Sha256) => SigningAlgorithmSpec::RsassaPkcs1V15Sha256,
        (false, HashFunction::Sha384) => SigningAlgorithmSpec::RsassaPkcs1V15Sha384,
        (false, HashFunction::Sha512) => SigningAlgorithmSpec::RsassaPkcs1V15Sha512,
    }
}

#[async_trait]
impl KmsBackend for AwsKms {
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
        let key_id = Self::key_id(reference)?;
        tracing::debug!(key = key_id, "fetching public key from AWS KMS");
        self.fetch(key_id).await
    }

    async fn sign(&self, key: &KeyHandle, digest: &[u8], hash: HashFunction) -> Result<Signature> {
        keyless_crypto::check_digest_length(digest, hash)?;
        let out = self
            .client
            .sign()
            .key_id(&key.key_id)
            .message(Blob::new(digest))
            .message_type(MessageType::Digest)
            .signing_algorithm(signing_algorithm(key.algorithm, hash))
            .send()
            .await
            .map_err(|e| Error::backend(NAME, DisplayErrorContext(&e)))?;

        let signature = out
            .signature()
            .ok_or_else(|| Error::backend(NAME, "Sign returned no signature"))?;
        Ok(Signature::new(signature.as_ref().to_vec()))
    }

    async fn verify_remotely(
        &self,
        key: &KeyHandle,
        signature: &[u8],
        digest: &[u8],
        hash: HashFunction,
    ) -> Result<()> {
        keyless_crypto::check_digest_length(digest, hash)?;
        let result = self
            .client
            .verify()
            .key_id(&key.key_id)
            .message(Blob::new(digest))
            .message_type(MessageType::Digest)
            .signature(Blob::new(signature))
            .signing_algorithm(signing_algorithm(key.algorithm, hash))
            .send()
            .await;

        match result {
            Ok(out) if out.signature_valid() => Ok(()),
            Ok(_) => Err(Error::Verification("AWS KMS reported invalid".to_string())),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_kms_invalid_signature_exception())
                    .unwrap_or(false) =>
            {
                Err(Error::Verification("AWS KMS reported invalid".to_string()))
            }
            Err(e) => Err(Error::backend(NAME, DisplayErrorContext(&e))),
        }
    }

    async fn create_key(
        &self,
        reference: &KeyReference,
        algorithm: KeyAlgorithm,
    ) -> Result<KeyHandle> {
        if !SUPPORTED_ALGORITHMS.contains(&algorithm) {
            return Err(Error::unsupported_algorithm(algorithm, NAME));
        }
        let key_id = Self::key_id(reference)?;

        match self.fetch(key_id).await {
            Ok(existing) => {
                tracing::debug!(key = key_id, "key already exists, returning it");
                return Ok(existing);
            }
            Err(Error::KeyNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        if !reference.is_alias() {
            return Err(Error::InvalidReference {
                reference: reference.to_string(),
                reason: "only alias references can be created".to_string(),
            });
        }

        let out = self
            .client
            .create_key()
            .key_spec(spec_from_algorithm(algorithm))
            .key_usage(KeyUsageType::SignVerify)
            .description("Created by keyless")
            .send()
            .await
            .map_err(|e| Error::backend(NAME, DisplayErrorContext(&e)))?;
        let created = out
            .key_metadata()
            .ok_or_else(|| Error::backend(NAME, "CreateKey returned no metadata"))?
            .key_id()
            .to_string();

        let alias = key_id
            .rsplit_once(":alias/")
            .map(|(_, name)| format!("alias/{}", name))
            .unwrap_or_else(|| key_id.to_string());
        self.client
            .create_alias()
            .alias_name(&alias)
            .target_key_id(&created)
            .send()
            .await
            .map_err(|e| Error::backend(NAME, DisplayErrorContext(&e)))?;
        tracing::debug!(key = %created, alias = %alias, %algorithm, "created AWS KMS key");

        self.fetch(&created).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_mapping_is_symmetric() {
        for algorithm in KeyAlgorithm::ALL {
            let spec = spec_from_algorithm(algorithm);
            assert_eq!(algorithm_from_spec(&spec).unwrap(), algorithm);
        }
    }

    #[test]
    fn test_signing_algorithm_follows_key_family() {
        assert_eq!(
            signing_algorithm(KeyAlgorithm::EcdsaP384, HashFunction::Sha384),
            SigningAlgorithmSpec::EcdsaSha384
        );
        assert_eq!(
            signing_algorithm(KeyAlgorithm::Rsa3072, HashFunction::Sha512),
            SigningAlgorithmSpec::RsassaPkcs1V15Sha512
        );
    }

    #[test]
    fn test_hash_of_spec() {
        assert_eq!(
            hash_of_spec(&SigningAlgorithmSpec::RsassaPssSha384),
            Some(HashFunction::Sha384)
        );
    }
}
