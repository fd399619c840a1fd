//! OAuth 2.0 flows for interactive token acquisition
//!
//! Both the device code flow and the authorization code flow use PKCE.
//! The token we keep is the `id_token` of the final token response.

use crate::discovery::ProviderMetadata;
use crate::error::{Error, Result};
use crate::token::IdentityToken;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Slack added to the polling interval on `slow_down`
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// OAuth configuration for a provider
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Device authorization endpoint
    pub device_auth_url: Option<String>,
    /// Client ID
    pub client_id: String,
    /// Client secret, for providers that want one
    pub client_secret: Option<String>,
    /// Scopes to request
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Configuration from discovered provider metadata
    pub fn from_metadata(
        metadata: &ProviderMetadata,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            auth_url: metadata.authorization_endpoint.clone(),
            token_url: metadata.token_endpoint.clone(),
            device_auth_url: metadata.device_authorization_endpoint.clone(),
            client_id: client_id.into(),
            client_secret,
            scopes: vec!["openid".to_string(), "email".to_string()],
        }
    }

    fn client_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("client_id", self.client_id.clone())];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.clone()));
        }
        params
    }
}

/// A PKCE verifier and its S256 challenge
#[derive(Debug, Clone)]
pub struct Pkce {
    /// Secret sent with the token request
    pub verifier: String,
    /// Hash of the verifier sent with the authorization request
    pub challenge: String,
}

impl Pkce {
    /// Generate a fresh pair
    pub fn generate() -> Self {
        let verifier = random_token();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// 32 random bytes, base64url encoded
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Device code flow response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    /// The device code
    pub device_code: String,
    /// User code to enter
    pub user_code: String,
    /// Verification URI
    pub verification_uri: String,
    /// Complete verification URI with code
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Expiration in seconds
    pub expires_in: u64,
    /// Polling interval in seconds
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// Token response from the OAuth server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Expiration in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// ID token, the part we keep
    #[serde(default)]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Parse the `id_token`
    pub fn identity_token(self) -> Result<IdentityToken> {
        let id_token = self
            .id_token
            .ok_or_else(|| Error::OAuth("no id_token in response".to_string()))?;
        IdentityToken::from_jwt(&id_token)
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// What to do after a failed device token poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Ask again after the current interval
    Pending,
    /// Ask again after a longer interval
    SlowDown,
    /// Give up
    Failed(String),
}

/// Classify a device-flow error code (RFC 8628 §3.5)
pub fn classify_poll_error(code: &str) -> PollOutcome {
    match code {
        "authorization_pending" => PollOutcome::Pending,
        "slow_down" => PollOutcome::SlowDown,
        "expired_token" => PollOutcome::Failed("device code expired".to_string()),
        "access_denied" => PollOutcome::Failed("user denied authorization".to_string()),
        other => PollOutcome::Failed(format!("token error: {}", other)),
    }
}

/// OAuth client for the device and authorization code flows
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthClient {
    /// Create a new OAuth client with the given configuration
    pub fn new(config: OAuthConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// The configuration in use
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Start the device code flow
    ///
    /// Returns the device code response which contains the user code
    /// and verification URI to show to the user, along with the PKCE pair.
    pub async fn start_device_flow(&self) -> Result<(DeviceCodeResponse, Pkce)> {
        let device_auth_url = self
            .config
            .device_auth_url
            .as_deref()
            .ok_or_else(|| Error::OAuth("provider does not support the device flow".to_string()))?;
        let pkce = Pkce::generate();

        let mut params = self.config.client_params();
        params.push(("scope", self.config.scopes.join(" ")));
        params.push(("code_challenge", pkce.challenge.clone()));
        params.push(("code_challenge_method", "S256".to_string()));

        let response = self
            .client
            .post(device_auth_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OAuth(format!(
                "device auth failed: {} - {}",
                status, body
            )));
        }

        let response_data = response
            .json()
            .await
            .map_err(|e| Error::OAuth(format!("failed to parse device code response: {}", e)))?;

        Ok((response_data, pkce))
    }

    /// Poll for the token after user authorization
    ///
    /// Polls until the user completes authorization, refuses, or the device
    /// code expires.
    pub async fn poll_for_token(
        &self,
        device: &DeviceCodeResponse,
        pkce: &Pkce,
    ) -> Result<IdentityToken> {
        let mut params = self.config.client_params();
        params.push(("device_code", device.device_code.clone()));
        params.push((
            "grant_type",
            "urn:ietf:params:oauth:grant-type:device_code".to_string(),
        ));
        params.push(("code_verifier", pkce.verifier.clone()));

        let expires_at =
            tokio::time::Instant::now() + Duration::from_secs(device.expires_in.max(1));
        let mut interval = Duration::from_secs(device.interval.max(1));

        loop {
            tokio::time::sleep(interval).await;
            if tokio::time::Instant::now() >= expires_at {
                return Err(Error::OAuth("device code expired".to_string()));
            }

            let response = self
                .client
                .post(&self.config.token_url)
                .form(&params)
                .send()
                .await
                .map_err(|e| Error::Http(e.to_string()))?;

            if response.status().is_success() {
                let token_response: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::OAuth(format!("failed to parse token response: {}", e)))?;
                return token_response.identity_token();
            }

            let error: ErrorResponse = response
                .json()
                .await
                .map_err(|e| Error::OAuth(format!("failed to parse error response: {}", e)))?;

            match classify_poll_error(&error.error) {
                PollOutcome::Pending => continue,
                PollOutcome::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                    tracing::debug!(?interval, "provider asked to slow down");
                }
                PollOutcome::Failed(message) => return Err(Error::OAuth(message)),
            }
        }
    }

    /// Build the URL the user opens for the authorization code flow
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        nonce: &str,
        pkce: &Pkce,
    ) -> Result<String> {
        let mut url = url::Url::parse(&self.config.auth_url)
            .map_err(|e| Error::OAuth(format!("invalid authorization endpoint: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("nonce", nonce)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        pkce: &Pkce,
    ) -> Result<IdentityToken> {
        let mut params = self.config.client_params();
        params.push(("grant_type", "authorization_code".to_string()));
        params.push(("code", code.to_string()));
        params.push(("redirect_uri", redirect_uri.to_string()));
        params.push(("code_verifier", pkce.verifier.clone()));

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = match response.json::<ErrorResponse>().await {
                Ok(e) => format!("{} {}", e.error, e.error_description.unwrap_or_default()),
                Err(_) => String::new(),
            };
            return Err(Error::OAuth(format!(
                "code exchange failed: {} {}",
                status,
                detail.trim()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::OAuth(format!("failed to parse token response: {}", e)))?;
        token_response.identity_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig::from_metadata(
            &ProviderMetadata {
                issuer: "https://oauth2.sigstore.dev/auth".to_string(),
                authorization_endpoint: "https://oauth2.sigstore.dev/auth/auth".to_string(),
                token_endpoint: "https://oauth2.sigstore.dev/auth/token".to_string(),
                device_authorization_endpoint: Some(
                    "https://oauth2.sigstore.dev/auth/device/code".to_string(),
                ),
            },
            "sigstore",
            None,
        )
    }

    #[test]
    fn test_config_from_metadata() {
        let config = config();
        assert_eq!(config.client_id, "sigstore");
        assert!(config.scopes.contains(&"openid".to_string()));
        assert!(config.scopes.contains(&"email".to_string()));
        assert!(config.client_params().iter().all(|(k, _)| *k != "client_secret"));
    }

    #[test]
    fn test_pkce_challenge_is_s256_of_verifier() {
        let pkce = Pkce::generate();
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(pkce.verifier.as_bytes()));
        assert_eq!(pkce.challenge, expected);
        assert_ne!(Pkce::generate().verifier, pkce.verifier);
    }

    #[test]
    fn test_authorization_url() {
        let client = OAuthClient::new(config(), reqwest::Client::new());
        let pkce = Pkce::generate();
        let url = client
            .authorization_url("http://localhost:8080/auth/callback", "st", "nn", &pkce)
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["state"], "st");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8080/auth/callback");
        assert_eq!(pairs["code_challenge"], pkce.challenge);
    }

    #[test]
    fn test_classify_poll_error() {
        assert_eq!(classify_poll_error("authorization_pending"), PollOutcome::Pending);
        assert_eq!(classify_poll_error("slow_down"), PollOutcome::SlowDown);
        assert!(matches!(
            classify_poll_error("access_denied"),
            PollOutcome::Failed(_)
        ));
    }
}
