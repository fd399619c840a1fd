//! Keyless artifact signing
//!
//! A signing ceremony proves control of an OIDC identity, binds it to a
//! fresh key through a short-lived certificate, signs the artifact and
//! records the signature in a transparency log.
//!
//! ```no_run
//! use keyless_oidc::TokenGetter;
//! use keyless_sign::SigningContext;
//! use keyless_types::CallContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = SigningContext::production();
//! let signer = context.signer(TokenGetter::InteractiveBrowser);
//! let mut artifact = std::fs::File::open("release.tar.gz")?;
//! let output = signer.sign(&mut artifact, &CallContext::background()).await?;
//! println!("certificate serial {}", output.serial());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod policy;
pub mod services;
pub mod sign;
pub mod stage;

pub use error::{CeremonyError, Error, ErrorKind, Result};
pub use policy::{ArtifactPolicy, DEFAULT_MEDIA_TYPES};
pub use services::{CertificateIssuer, IdentityProvider, OidcProvider, TransparencyLog};
pub use sign::{Signer, SigningConfig, SigningContext, SigningOutput};
pub use stage::{CeremonyState, Stage};
