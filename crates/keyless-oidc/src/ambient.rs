//! Ambient credential detection for CI/CD environments
//!
//! Only used when the caller explicitly picks [`crate::TokenGetter::Ambient`].

use crate::error::{Error, Result};
use crate::token::IdentityToken;

/// Audience requested from CI token services
const AUDIENCE: &str = "sigstore";

/// Detected CI/CD environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiEnvironment {
    /// GitHub Actions
    GitHubActions,
    /// GitLab CI
    GitLabCi,
}

/// Detect the current CI/CD environment
pub fn detect_environment() -> Option<CiEnvironment> {
    if std::env::var_os("GITHUB_ACTIONS").is_some() {
        Some(CiEnvironment::GitHubActions)
    } else if std::env::var_os("GITLAB_CI").is_some() {
        Some(CiEnvironment::GitLabCi)
    } else {
        None
    }
}

/// Get an ambient identity token from the current environment
pub async fn get_ambient_token(client: &reqwest::Client) -> Result<IdentityToken> {
    match detect_environment() {
        Some(CiEnvironment::GitHubActions) => get_github_actions_token(client).await,
        Some(CiEnvironment::GitLabCi) => get_gitlab_ci_token(),
        None => Err(Error::Token("no CI/CD environment detected".to_string())),
    }
}

/// Token request URL with the audience parameter appended
fn github_request_url(request_url: &str) -> Result<String> {
    let mut url = url::Url::parse(request_url)
        .map_err(|e| Error::Token(format!("invalid ACTIONS_ID_TOKEN_REQUEST_URL: {}", e)))?;
    url.query_pairs_mut().append_pair("audience", AUDIENCE);
    Ok(url.into())
}

/// Get OIDC token from GitHub Actions
async fn get_github_actions_token(client: &reqwest::Client) -> Result<IdentityToken> {
    let request_url = std::env::var("ACTIONS_ID_TOKEN_REQUEST_URL")
        .map_err(|_| Error::Token("ACTIONS_ID_TOKEN_REQUEST_URL not set".to_string()))?;

    let request_token = std::env::var("ACTIONS_ID_TOKEN_REQUEST_TOKEN")
        .map_err(|_| Error::Token("ACTIONS_ID_TOKEN_REQUEST_TOKEN not set".to_string()))?;

    let response = client
        .get(github_request_url(&request_url)?)
        .bearer_auth(request_token)
        .send()
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::Token(format!(
            "GitHub Actions returned status {}",
            response.status()
        )));
    }

    #[derive(serde::Deserialize)]
    struct TokenResponse {
        value: String,
    }

    let token_response: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::Token(format!("failed to parse token response: {}", e)))?;

    IdentityToken::from_jwt(&token_response.value)
}

/// Get OIDC token from GitLab CI
///
/// The job has to declare an `id_tokens` entry named `SIGSTORE_ID_TOKEN`.
fn get_gitlab_ci_token() -> Result<IdentityToken> {
    let token = std::env::var("SIGSTORE_ID_TOKEN")
        .map_err(|_| Error::Token("SIGSTORE_ID_TOKEN not set".to_string()))?;

    IdentityToken::from_jwt(&token)
}
