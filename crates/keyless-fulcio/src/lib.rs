//! Fulcio certificate authority client
//!
//! Exchanges an identity token, an ephemeral public key and a proof of
//! possession for a short-lived signing certificate.

pub mod client;
pub mod error;

pub use client::{classify_status, CertificateChain, FulcioClient, SigningCertificateRequest};
pub use error::{Error, Result};
