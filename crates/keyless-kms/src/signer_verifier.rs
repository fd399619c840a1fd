//! Backend-agnostic signing and verification
//!
//! [`SignerVerifier`] owns a backend trait object and a key reference. The
//! key is resolved lazily on first use and cached for the lifetime of the
//! value; concurrent callers share one resolution.

use crate::backend::{KeyHandle, KmsBackend};
use crate::error::{Error, Result};
use crate::local::LocalKms;
use crate::options::{SignOptions, VerifyOptions};
use crate::reference::KeyReference;
use keyless_crypto::{PublicKey, Signature};
use keyless_types::{CallContext, HashFunction, KeyAlgorithm};
use std::io::Read;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Name given to the key of [`SignerVerifier::ephemeral`]
const EPHEMERAL_KEY: &str = "ephemeral";

/// Signs and verifies with a key held by some [`KmsBackend`]
#[derive(Debug)]
pub struct SignerVerifier {
    backend: Arc<dyn KmsBackend>,
    reference: KeyReference,
    handle: OnceCell<KeyHandle>,
}

impl SignerVerifier {
    /// Wrap a backend and the key it should use
    pub fn new(backend: Arc<dyn KmsBackend>, reference: KeyReference) -> Self {
        Self {
            backend,
            reference,
            handle: OnceCell::new(),
        }
    }

    /// Parse `reference` and connect to the backend its scheme names
    ///
    /// Nothing is fetched yet; the key is resolved on first use.
    pub async fn load(reference: &str) -> Result<Self> {
        let reference = KeyReference::parse(reference)?;
        let backend: Arc<dyn KmsBackend> = match &reference {
            KeyReference::Local { .. } => Arc::new(LocalKms::new()),
            #[cfg(feature = "aws")]
            KeyReference::Aws { .. } => Arc::new(crate::aws::AwsKms::connect(&reference).await?),
            #[cfg(not(feature = "aws"))]
            KeyReference::Aws { .. } => {
                return Err(Error::InvalidReference {
                    reference: reference.to_string(),
                    reason: "built without the `aws` feature".to_string(),
                })
            }
        };
        Ok(Self::new(backend, reference))
    }

    /// A fresh single-use key in a private in-process store
    pub async fn ephemeral(ctx: &CallContext, algorithm: KeyAlgorithm) -> Result<Self> {
        let signer = Self::new(
            Arc::new(LocalKms::new()),
            KeyReference::Local {
                name: EPHEMERAL_KEY.to_string(),
            },
        );
        signer.create_key(ctx, algorithm).await?;
        Ok(signer)
    }

    /// The key reference this signer uses
    pub fn reference(&self) -> &KeyReference {
        &self.reference
    }

    /// Algorithms the backend supports; no network access
    pub fn supported_algorithms(&self) -> &[KeyAlgorithm] {
        self.backend.supported_algorithms()
    }

    /// The backend's default algorithm; no network access
    pub fn default_algorithm(&self) -> KeyAlgorithm {
        self.backend.default_algorithm()
    }

    /// Resolve the key once and share it
    ///
    /// The whole wait is bounded by `ctx`, including waiting on a resolution
    /// started by another caller. A resolver that gives up leaves the cell
    /// empty for the next caller.
    async fn handle(&self, ctx: &CallContext) -> Result<&KeyHandle> {
        let init = self.handle.get_or_try_init(|| async {
            tracing::debug!(reference = %self.reference, "resolving key");
            self.backend.resolve(&self.reference).await
        });
        ctx.run(init).await?
    }

    /// The key's default hash function, resolving the key if needed
    pub async fn default_hash_function(&self, ctx: &CallContext) -> Result<HashFunction> {
        Ok(self.handle(ctx).await?.default_hash)
    }

    /// The public key, resolving the key if needed
    ///
    /// Fails with a cancellation error when `ctx` is already done, even if
    /// the key is cached.
    pub async fn public_key(&self, ctx: &CallContext) -> Result<PublicKey> {
        ctx.check()?;
        Ok(self.handle(ctx).await?.public_key.clone())
    }

    fn gate_hash(&self, function: Option<HashFunction>, supported: &[HashFunction]) -> Result<()> {
        match function {
            Some(function) if !supported.contains(&function) => Err(Error::UnsupportedHash {
                function,
                backend: self.backend.name(),
            }),
            _ => Ok(()),
        }
    }

    fn map_digest_error(&self, e: keyless_crypto::Error) -> Error {
        match e {
            keyless_crypto::Error::UnsupportedHash { function, .. } => Error::UnsupportedHash {
                function,
                backend: self.backend.name(),
            },
            other => Error::Crypto(other),
        }
    }

    /// Sign `message`, or the digest supplied in `opts`
    ///
    /// Without a digest the message is hashed with the hash override, or the
    /// key's default hash. `message` may be `None` when a digest is supplied.
    pub async fn sign_message(
        &self,
        message: Option<&mut (dyn Read + Send)>,
        opts: &SignOptions,
    ) -> Result<Signature> {
        let ctx = opts.context();
        self.gate_hash(opts.hash_function(), self.backend.supported_hash_functions())?;

        let handle = self.handle(ctx).await?;
        let function = opts.hash_function().unwrap_or(handle.default_hash);
        let digest = keyless_crypto::compute_digest_for_signing(
            message,
            opts.digest(),
            function,
            &handle.hash_functions,
        )
        .map_err(|e| self.map_digest_error(e))?;

        ctx.run(self.backend.sign(handle, &digest, function)).await?
    }

    /// Sign a byte payload with the key's default hash
    pub async fn sign(&self, ctx: &CallContext, payload: &[u8]) -> Result<Signature> {
        let mut payload = payload;
        let reader: &mut (dyn Read + Send) = &mut payload;
        self.sign_message(Some(reader), &SignOptions::new().with_context(ctx.clone()))
            .await
    }

    /// Check `signature` over `message`, or over the digest supplied in `opts`
    ///
    /// Uses the cached public key unless remote verification is requested.
    pub async fn verify_signature(
        &self,
        signature: &[u8],
        message: Option<&mut (dyn Read + Send)>,
        opts: &VerifyOptions,
    ) -> Result<()> {
        let ctx = opts.context();
        let supported = self.backend.supported_verify_hash_functions();
        self.gate_hash(opts.hash_function(), supported)?;

        let handle = self.handle(ctx).await?;
        let function = opts.hash_function().unwrap_or(handle.default_hash);
        let digest =
            keyless_crypto::compute_digest_for_verifying(message, opts.digest(), function, supported)
                .map_err(|e| self.map_digest_error(e))?;

        if opts.remote_verification() {
            return ctx
                .run(
                    self.backend
                        .verify_remotely(handle, signature, &digest, function),
                )
                .await?;
        }

        keyless_crypto::verify_prehashed(&handle.public_key, &digest, signature).map_err(
            |e| match e {
                keyless_crypto::Error::Verification(msg) => Error::Verification(msg),
                other => Error::Crypto(other),
            },
        )
    }

    /// Create the referenced key with `algorithm`
    ///
    /// Algorithms outside [`Self::supported_algorithms`] are rejected without
    /// contacting the backend.
    pub async fn create_key(&self, ctx: &CallContext, algorithm: KeyAlgorithm) -> Result<PublicKey> {
        if !self.supported_algorithms().contains(&algorithm) {
            return Err(Error::unsupported_algorithm(algorithm, self.backend.name()));
        }

        let handle = ctx
            .run(self.backend.create_key(&self.reference, algorithm))
            .await??;
        let public_key = handle.public_key.clone();
        if self.handle.set(handle).is_err() {
            tracing::debug!(reference = %self.reference, "key handle already cached");
        }
        Ok(public_key)
    }
}
