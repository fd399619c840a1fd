//! Pluggable signing backends behind one signer/verifier contract
//!
//! A [`SignerVerifier`] wraps any [`KmsBackend`] (an in-process key store,
//! AWS KMS, or a test double) and handles what backends share: resolving
//! the key once, negotiating the hash function, hashing the message, and
//! verifying locally with the cached public key.
//!
//! # Example
//!
//! ```no_run
//! use keyless_kms::{SignOptions, SignerVerifier};
//! use keyless_types::{CallContext, KeyAlgorithm};
//!
//! # async fn example() -> keyless_kms::Result<()> {
//! let ctx = CallContext::background();
//! let signer = SignerVerifier::ephemeral(&ctx, KeyAlgorithm::EcdsaP256).await?;
//! let signature = signer.sign(&ctx, b"hello").await?;
//! println!("{} byte signature", signature.len());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "aws")]
pub mod aws;
pub mod backend;
pub mod crypto_signer;
pub mod error;
pub mod local;
pub mod options;
pub mod reference;
pub mod signer_verifier;

#[cfg(feature = "aws")]
pub use aws::AwsKms;
pub use backend::{KeyHandle, KmsBackend};
pub use crypto_signer::{CryptoSigner, ErrorCallback};
pub use error::{Error, Result};
pub use local::LocalKms;
pub use options::{SignOption, SignOptions, VerifyOption, VerifyOptions};
pub use reference::KeyReference;
pub use signer_verifier::SignerVerifier;
