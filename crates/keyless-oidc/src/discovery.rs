//! OpenID provider metadata discovery

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The subset of provider metadata the flows need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier
    pub issuer: String,
    /// Authorization endpoint for the browser flow
    pub authorization_endpoint: String,
    /// Token endpoint
    pub token_endpoint: String,
    /// Device authorization endpoint, absent when the provider has no device flow
    #[serde(default)]
    pub device_authorization_endpoint: Option<String>,
}

/// Location of the discovery document for `issuer`
pub fn discovery_url(issuer: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    )
}

/// Fetch and parse the discovery document
pub async fn discover(client: &reqwest::Client, issuer: &str) -> Result<ProviderMetadata> {
    let url = discovery_url(issuer);
    tracing::debug!(%url, "fetching OIDC provider metadata");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::Discovery(format!(
            "{} returned status {}",
            url,
            response.status()
        )));
    }

    let metadata: ProviderMetadata = response
        .json()
        .await
        .map_err(|e| Error::Discovery(format!("failed to parse provider metadata: {}", e)))?;

    if metadata.issuer.trim_end_matches('/') != issuer.trim_end_matches('/') {
        return Err(Error::Discovery(format!(
            "provider reports issuer {}, expected {}",
            metadata.issuer, issuer
        )));
    }
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_url() {
        assert_eq!(
            discovery_url("https://oauth2.sigstore.dev/auth/"),
            "https://oauth2.sigstore.dev/auth/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_parse_metadata_without_device_endpoint() {
        let json = r#"{
            "issuer": "https://accounts.example.com",
            "authorization_endpoint": "https://accounts.example.com/authorize",
            "token_endpoint": "https://accounts.example.com/token",
            "jwks_uri": "https://accounts.example.com/keys"
        }"#;
        let metadata: ProviderMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.token_endpoint, "https://accounts.example.com/token");
        assert!(metadata.device_authorization_endpoint.is_none());
    }
}
