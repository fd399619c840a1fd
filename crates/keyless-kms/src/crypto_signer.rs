//! Adapter to a context-free "sign this digest" interface
//!
//! Generic signing code (certificate builders, `signature` trait users)
//! expects a synchronous signer with no per-call options. [`CryptoSigner`]
//! captures a call context and a default hash once and drives the async
//! [`SignerVerifier`] on a runtime handle.

use crate::error::{Error, Result};
use crate::options::SignOptions;
use crate::signer_verifier::SignerVerifier;
use keyless_crypto::{PublicKey, Signature};
use keyless_types::{CallContext, HashFunction};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::RuntimeFlavor;

const ADAPTER: &str = "crypto signer";

/// Callback receiving errors that [`CryptoSigner::public`] cannot return
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Synchronous signer over a [`SignerVerifier`]
///
/// Calls block the current thread. Inside a current-thread tokio runtime
/// they fail with [`Error::Backend`] instead of blocking.
#[derive(Clone)]
pub struct CryptoSigner {
    signer: Arc<SignerVerifier>,
    context: CallContext,
    hash_function: HashFunction,
    on_error: Option<ErrorCallback>,
    runtime: tokio::runtime::Handle,
}

impl SignerVerifier {
    /// Build a [`CryptoSigner`] bound to `ctx`
    ///
    /// Resolves the key to learn its default hash, which is also returned.
    /// Must be called from within a tokio runtime.
    pub async fn crypto_signer(
        self: &Arc<Self>,
        ctx: CallContext,
        on_error: Option<ErrorCallback>,
    ) -> Result<(CryptoSigner, HashFunction)> {
        let hash_function = self.default_hash_function(&ctx).await?;
        let signer = CryptoSigner {
            signer: Arc::clone(self),
            context: ctx,
            hash_function,
            on_error,
            runtime: tokio::runtime::Handle::current(),
        };
        Ok((signer, hash_function))
    }
}

impl CryptoSigner {
    fn block_on<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(current) => match current.runtime_flavor() {
                RuntimeFlavor::CurrentThread => Err(Error::backend(
                    ADAPTER,
                    "cannot block inside a current-thread runtime; use the async signer",
                )),
                _ => tokio::task::block_in_place(|| self.runtime.block_on(fut)),
            },
            Err(_) => self.runtime.block_on(fut),
        }
    }

    /// The hash used when `sign` is not told otherwise
    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// The public key, or `None` if it could not be resolved
    ///
    /// The error goes to the callback, if one was supplied.
    pub fn public(&self) -> Option<PublicKey> {
        match self.block_on(self.signer.public_key(&self.context)) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("failed to resolve public key: {}", e);
                if let Some(on_error) = &self.on_error {
                    on_error(&e);
                }
                None
            }
        }
    }

    /// Sign a precomputed digest
    ///
    /// `hash_function` names the function that produced it; when `None`
    /// the default captured at construction is used.
    pub fn sign(&self, digest: &[u8], hash_function: Option<HashFunction>) -> Result<Signature> {
        let opts = SignOptions::new()
            .with_context(self.context.clone())
            .with_digest(digest.to_vec())
            .with_hash_function(hash_function.unwrap_or(self.hash_function));
        self.block_on(self.signer.sign_message(None, &opts))
    }
}

impl signature::hazmat::PrehashSigner<Signature> for CryptoSigner {
    fn sign_prehash(&self, prehash: &[u8]) -> std::result::Result<Signature, signature::Error> {
        self.sign(prehash, None)
            .map_err(signature::Error::from_source)
    }
}

impl fmt::Debug for CryptoSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoSigner")
            .field("reference", self.signer.reference())
            .field("hash_function", &self.hash_function)
            .finish_non_exhaustive()
    }
}
