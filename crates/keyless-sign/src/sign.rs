//! High-level signing API
//!
//! This module provides the entry point for keyless signing: it runs the
//! ceremony from identity token to transparency log entry.

use crate::error::{CeremonyError, Error, Result};
use crate::policy::ArtifactPolicy;
use crate::services::{CertificateIssuer, IdentityProvider, OidcProvider, TransparencyLog};
use crate::stage::{CeremonyState, Progress, Stage};
use keyless_crypto::{Hasher, ParsedCertificate, PublicKey, Signature};
use keyless_fulcio::{CertificateChain, FulcioClient};
use keyless_kms::{SignOptions, SignerVerifier};
use keyless_oidc::{issuers, IdentityToken, TokenGetter};
use keyless_rekor::{LogLocator, RekorClient};
use keyless_types::{CallContext, HashOutput, KeyAlgorithm};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for signing operations
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// OIDC issuer URL
    pub oidc_issuer: String,
    /// OAuth client id
    pub oidc_client_id: String,
    /// OAuth client secret, if the client has one
    pub oidc_client_secret: Option<String>,
    /// Fulcio URL
    pub fulcio_url: String,
    /// Rekor URL
    pub rekor_url: String,
    /// Algorithm of the ephemeral key
    pub key_algorithm: KeyAlgorithm,
    /// Deadline for each network call
    pub timeout: Option<Duration>,
    /// Accepted artifact media types
    pub policy: ArtifactPolicy,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            oidc_issuer: issuers::SIGSTORE_OAUTH.to_string(),
            oidc_client_id: "sigstore".to_string(),
            oidc_client_secret: None,
            fulcio_url: "https://fulcio.sigstore.dev".to_string(),
            rekor_url: "https://rekor.sigstore.dev".to_string(),
            key_algorithm: KeyAlgorithm::EcdsaP256,
            timeout: Some(Duration::from_secs(120)),
            policy: ArtifactPolicy::default(),
        }
    }
}

impl SigningConfig {
    /// Create configuration for Sigstore public-good instance
    pub fn production() -> Self {
        Self::default()
    }

    /// Create configuration for Sigstore staging instance
    pub fn staging() -> Self {
        Self {
            oidc_issuer: issuers::SIGSTORE_OAUTH_STAGING.to_string(),
            fulcio_url: "https://fulcio.sigstage.dev".to_string(),
            rekor_url: "https://rekor.sigstage.dev".to_string(),
            ..Self::default()
        }
    }
}

/// Context for signing operations
#[derive(Debug, Clone, Default)]
pub struct SigningContext {
    /// Configuration
    config: SigningConfig,
}

impl SigningContext {
    /// Create a new signing context with default configuration
    pub fn new() -> Self {
        Self::with_config(SigningConfig::default())
    }

    /// Create a new signing context with custom configuration
    pub fn with_config(config: SigningConfig) -> Self {
        Self { config }
    }

    /// Create a signing context for the public-good instance
    pub fn production() -> Self {
        Self::with_config(SigningConfig::production())
    }

    /// Create a signing context for the staging instance
    pub fn staging() -> Self {
        Self::with_config(SigningConfig::staging())
    }

    /// Get the configuration
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Create a signer talking to the configured services
    pub fn signer(&self, getter: TokenGetter) -> Signer {
        let config = &self.config;
        let http = reqwest::Client::new();
        let identity = OidcProvider::new(
            config.oidc_issuer.clone(),
            config.oidc_client_id.clone(),
            config.oidc_client_secret.clone(),
            getter,
        );
        Signer::new(
            Arc::new(identity),
            Arc::new(FulcioClient::with_client(&config.fulcio_url, http.clone())),
            Arc::new(RekorClient::with_client(&config.rekor_url, http)),
        )
        .with_key_algorithm(config.key_algorithm)
        .with_timeout(config.timeout)
    }
}

/// Everything a completed ceremony produced
#[derive(Debug, Clone)]
pub struct SigningOutput {
    /// Identity token subject
    pub subject: String,
    /// Identity token issuer
    pub issuer: String,
    /// The full chain returned by the certificate authority
    pub chain: CertificateChain,
    /// Raw signature over the artifact
    pub signature: Signature,
    /// Artifact digest the signature covers
    pub artifact_digest: HashOutput,
    /// Where the log recorded the entry
    pub locator: LogLocator,
    /// `locator` appended to the log's base URL
    pub log_url: String,
    /// Stages passed, `Idle` through `Done`
    pub stages: Vec<Stage>,
}

impl SigningOutput {
    /// The signing certificate
    pub fn certificate(&self) -> &ParsedCertificate {
        self.chain.leaf()
    }

    /// PEM of the signing certificate alone
    pub fn certificate_pem(&self) -> String {
        self.certificate().to_pem()
    }

    /// Decimal serial number of the signing certificate
    pub fn serial(&self) -> String {
        self.certificate().serial_decimal()
    }
}

/// A signer for creating keyless signatures
#[derive(Clone)]
pub struct Signer {
    identity: Arc<dyn IdentityProvider>,
    issuer: Arc<dyn CertificateIssuer>,
    log: Arc<dyn TransparencyLog>,
    key_algorithm: KeyAlgorithm,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("log", &self.log.base_url())
            .field("key_algorithm", &self.key_algorithm)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// A signer using the given services, an ECDSA P-256 key and no per-call deadline
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        issuer: Arc<dyn CertificateIssuer>,
        log: Arc<dyn TransparencyLog>,
    ) -> Self {
        Self {
            identity,
            issuer,
            log,
            key_algorithm: KeyAlgorithm::EcdsaP256,
            timeout: None,
        }
    }

    /// Set the algorithm of the ephemeral key
    pub fn with_key_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.key_algorithm = algorithm;
        self
    }

    /// Bound every network call by `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn call_context(&self, ctx: &CallContext) -> CallContext {
        match self.timeout {
            Some(timeout) => ctx.clone().merge(&CallContext::with_timeout(timeout)),
            None => ctx.clone(),
        }
    }

    /// Sign an artifact
    ///
    /// Runs every step in order and stops at the first failure, which is
    /// reported with the stage it prevented. Nothing is retried or rolled
    /// back. The artifact is read once, after the certificate is issued.
    ///
    /// # Example
    /// ```no_run
    /// use keyless_oidc::TokenGetter;
    /// use keyless_sign::SigningContext;
    /// use keyless_types::CallContext;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let signer = SigningContext::production().signer(TokenGetter::DeviceCode);
    /// let mut artifact: &[u8] = b"hello world";
    /// let output = signer.sign(&mut artifact, &CallContext::background()).await?;
    /// println!("{}", output.log_url);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn sign(
        &self,
        artifact: &mut (dyn Read + Send),
        ctx: &CallContext,
    ) -> std::result::Result<SigningOutput, CeremonyError> {
        let mut progress = Progress::new();

        let token = step(&mut progress, self.authenticate(ctx).await)?;
        tracing::debug!(subject = token.subject(), "received identity token");

        let (key, public_key) = step(&mut progress, self.ephemeral_key(ctx).await)?;

        let proof = step(&mut progress, self.prove_possession(&key, &token, ctx).await)?;

        let chain = step(
            &mut progress,
            self.request_certificate(&token, &public_key, &proof, ctx).await,
        )?;
        tracing::debug!(serial = %chain.leaf().serial_decimal(), "received signing certificate");

        let (signature, artifact_digest) =
            step(&mut progress, self.sign_artifact(&key, artifact, ctx).await)?;

        let certificate_pem = chain.leaf().to_pem();
        let locator = step(
            &mut progress,
            self.record(&certificate_pem, &signature, &artifact_digest, ctx)
                .await,
        )?;

        progress.advance();
        debug_assert_eq!(progress.state(), CeremonyState::At(Stage::Done));

        let log_url = locator.url(self.log.base_url());
        tracing::info!(%log_url, "signature recorded in transparency log");
        Ok(SigningOutput {
            subject: token.subject().to_string(),
            issuer: token.issuer().to_string(),
            chain,
            signature,
            artifact_digest,
            locator,
            log_url,
            stages: progress.reached().to_vec(),
        })
    }

    async fn authenticate(&self, ctx: &CallContext) -> Result<IdentityToken> {
        let ctx = self.call_context(ctx);
        Ok(ctx.run(self.identity.identity_token(&ctx)).await??)
    }

    /// Generate the single-use key for this ceremony
    async fn ephemeral_key(&self, ctx: &CallContext) -> Result<(SignerVerifier, PublicKey)> {
        let ctx = self.call_context(ctx);
        let key = SignerVerifier::ephemeral(&ctx, self.key_algorithm).await?;
        let public_key = key.public_key(&ctx).await?;
        Ok((key, public_key))
    }

    /// Sign the token subject, proving the key is ours
    async fn prove_possession(
        &self,
        key: &SignerVerifier,
        token: &IdentityToken,
        ctx: &CallContext,
    ) -> Result<Signature> {
        Ok(key
            .sign(&self.call_context(ctx), token.subject().as_bytes())
            .await?)
    }

    async fn request_certificate(
        &self,
        token: &IdentityToken,
        public_key: &PublicKey,
        proof: &Signature,
        ctx: &CallContext,
    ) -> Result<CertificateChain> {
        let ctx = self.call_context(ctx);
        let chain = ctx
            .run(self.issuer.request_certificate(token, public_key, proof, &ctx))
            .await??;

        let certified = chain.leaf().public_key().map_err(keyless_fulcio::Error::from)?;
        if certified.as_der() != public_key.as_der() {
            return Err(Error::Certificate(
                "signing certificate does not certify the ephemeral key".to_string(),
            ));
        }
        Ok(chain)
    }

    async fn record(
        &self,
        certificate_pem: &str,
        signature: &Signature,
        artifact_digest: &HashOutput,
        ctx: &CallContext,
    ) -> Result<LogLocator> {
        let ctx = self.call_context(ctx);
        Ok(ctx
            .run(self.log.upload(certificate_pem, signature, artifact_digest, &ctx))
            .await??)
    }

    async fn sign_artifact(
        &self,
        key: &SignerVerifier,
        artifact: &mut (dyn Read + Send),
        ctx: &CallContext,
    ) -> Result<(Signature, HashOutput)> {
        let ctx = self.call_context(ctx);
        let function = key.default_hash_function(&ctx).await?;

        let mut hasher = Hasher::new(function);
        let size = hasher
            .update_reader(artifact)
            .map_err(|e| Error::Io(format!("reading artifact: {}", e)))?;
        let digest = hasher.finalize();
        tracing::debug!(size, hash = %function, "hashed artifact");

        let options = SignOptions::new()
            .with_context(ctx)
            .with_hash_function(function)
            .with_digest(digest.clone());
        let signature = key.sign_message(None, &options).await?;
        Ok((signature, HashOutput::new(function, digest)))
    }
}

/// Advance on success, record the failed stage otherwise
fn step<T>(progress: &mut Progress, result: Result<T>) -> std::result::Result<T, CeremonyError> {
    match result {
        Ok(value) => {
            progress.advance();
            Ok(value)
        }
        Err(source) => {
            let stage = progress.fail();
            tracing::warn!(%stage, kind = ?source.kind(), "signing ceremony failed: {}", source);
            Err(CeremonyError {
                stage,
                reached: progress.reached().to_vec(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_config_default() {
        let config = SigningConfig::default();
        assert_eq!(config.oidc_issuer, "https://oauth2.sigstore.dev/auth");
        assert_eq!(config.oidc_client_id, "sigstore");
        assert!(config.fulcio_url.contains("sigstore.dev"));
        assert!(config.rekor_url.contains("sigstore.dev"));
        assert_eq!(config.key_algorithm, KeyAlgorithm::EcdsaP256);
    }

    #[test]
    fn test_signing_config_staging() {
        let config = SigningConfig::staging();
        assert!(config.fulcio_url.contains("sigstage.dev"));
        assert!(config.rekor_url.contains("sigstage.dev"));
        assert_eq!(config.oidc_client_id, "sigstore");
    }

    #[test]
    fn test_signer_from_context() {
        let signer = SigningContext::staging().signer(TokenGetter::DeviceCode);
        assert_eq!(signer.log.base_url(), "https://rekor.sigstage.dev");
    }
}
