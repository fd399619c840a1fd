//! The remote services a ceremony talks to
//!
//! Each service sits behind a trait so the ceremony can run against the
//! real clients or in-process fakes.

use async_trait::async_trait;
use keyless_crypto::{PublicKey, Signature};
use keyless_fulcio::{CertificateChain, FulcioClient};
use keyless_oidc::{Authenticator, IdentityToken, TokenGetter};
use keyless_rekor::{LogLocator, RekorClient};
use keyless_types::{CallContext, HashOutput};

/// Source of the identity token
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Obtain a checked identity token
    async fn identity_token(&self, ctx: &CallContext) -> keyless_oidc::Result<IdentityToken>;
}

/// Certificate authority binding a key to an identity
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// Exchange the token, public key and proof of possession for a chain
    async fn request_certificate(
        &self,
        token: &IdentityToken,
        public_key: &PublicKey,
        proof: &Signature,
        ctx: &CallContext,
    ) -> keyless_fulcio::Result<CertificateChain>;
}

/// Transparency log recording the signature
#[async_trait]
pub trait TransparencyLog: Send + Sync {
    /// Base URL the returned locator is relative to
    fn base_url(&self) -> &str;

    /// Record the signature and certificate
    async fn upload(
        &self,
        certificate_pem: &str,
        signature: &Signature,
        artifact_digest: &HashOutput,
        ctx: &CallContext,
    ) -> keyless_rekor::Result<LogLocator>;
}

/// [`IdentityProvider`] running an OIDC flow
#[derive(Debug, Clone)]
pub struct OidcProvider {
    authenticator: Authenticator,
    issuer: String,
    client_id: String,
    client_secret: Option<String>,
    getter: TokenGetter,
}

impl OidcProvider {
    /// A provider for `issuer` using `getter` to obtain the token
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        getter: TokenGetter,
    ) -> Self {
        Self {
            authenticator: Authenticator::new(),
            issuer: issuer.into(),
            client_id: client_id.into(),
            client_secret,
            getter,
        }
    }

    /// Replace the authenticator, for a custom prompt or HTTP client
    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn identity_token(&self, ctx: &CallContext) -> keyless_oidc::Result<IdentityToken> {
        self.authenticator
            .authenticate(
                &self.issuer,
                &self.client_id,
                self.client_secret.as_deref(),
                &self.getter,
                ctx,
            )
            .await
    }
}

#[async_trait]
impl CertificateIssuer for FulcioClient {
    async fn request_certificate(
        &self,
        token: &IdentityToken,
        public_key: &PublicKey,
        proof: &Signature,
        ctx: &CallContext,
    ) -> keyless_fulcio::Result<CertificateChain> {
        FulcioClient::request_certificate(self, token.raw(), public_key, proof, ctx).await
    }
}

#[async_trait]
impl TransparencyLog for RekorClient {
    fn base_url(&self) -> &str {
        self.url()
    }

    async fn upload(
        &self,
        certificate_pem: &str,
        signature: &Signature,
        artifact_digest: &HashOutput,
        ctx: &CallContext,
    ) -> keyless_rekor::Result<LogLocator> {
        RekorClient::upload(self, certificate_pem, signature, artifact_digest, ctx).await
    }
}
