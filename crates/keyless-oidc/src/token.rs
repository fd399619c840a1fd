//! Identity token handling

use crate::error::{Error, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// An OIDC identity token
///
/// The signature of the JWT is not checked here; the certificate authority
/// the token is presented to does that.
#[derive(Debug, Clone)]
pub struct IdentityToken {
    /// The raw JWT token
    raw: String,
    /// Parsed claims
    claims: TokenClaims,
}

/// Standard OIDC claims we care about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer
    pub iss: String,
    /// Subject
    pub sub: String,
    /// Audience (can be string or array)
    #[serde(default)]
    pub aud: Audience,
    /// Expiration time
    pub exp: u64,
    /// Issued at
    #[serde(default)]
    pub iat: u64,
    /// Email claim
    #[serde(default)]
    pub email: Option<String>,
    /// Email verified
    #[serde(default)]
    pub email_verified: Option<bool>,
}

/// Audience can be a single string or array of strings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Audience {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Check if the audience contains a specific value
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Audience::None => false,
            Audience::Single(s) => s == value,
            Audience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

impl IdentityToken {
    /// Parse a JWT token string
    pub fn from_jwt(token: &str) -> Result<Self> {
        let token = token.trim();
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Token("invalid JWT format".to_string()));
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::Token(format!("failed to decode payload: {}", e)))?;

        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|e| Error::Token(format!("failed to parse claims: {}", e)))?;

        Ok(Self {
            raw: token.to_string(),
            claims,
        })
    }

    /// Get the raw JWT string
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Get the issuer
    pub fn issuer(&self) -> &str {
        &self.claims.iss
    }

    /// Get the subject
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Get the email if present
    pub fn email(&self) -> Option<&str> {
        self.claims.email.as_deref()
    }

    /// Get the expiration time
    pub fn expiration(&self) -> u64 {
        self.claims.exp
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.claims.exp < now
    }

    /// Get the claims
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Check the token is usable for signing
    ///
    /// The subject must be present and the token unexpired. When
    /// `expected_issuer` is given the `iss` claim must match it, ignoring a
    /// trailing slash.
    pub fn validate(&self, expected_issuer: Option<&str>) -> Result<()> {
        if self.claims.sub.is_empty() {
            return Err(Error::Token("token has no subject".to_string()));
        }
        if self.is_expired() {
            return Err(Error::Token(format!(
                "token expired at {}",
                self.claims.exp
            )));
        }
        if let Some(expected) = expected_issuer {
            if self.claims.iss.trim_end_matches('/') != expected.trim_end_matches('/') {
                return Err(Error::Token(format!(
                    "token issued by {}, expected {}",
                    self.claims.iss, expected
                )));
            }
        }
        Ok(())
    }
}

/// Known OIDC issuers
pub mod issuers {
    /// Sigstore's public Dex instance
    pub const SIGSTORE_OAUTH: &str = "https://oauth2.sigstore.dev/auth";
    /// Sigstore's staging Dex instance
    pub const SIGSTORE_OAUTH_STAGING: &str = "https://oauth2.sigstage.dev/auth";
    /// GitHub Actions OIDC
    pub const GITHUB_ACTIONS: &str = "https://token.actions.githubusercontent.com";
    /// GitLab
    pub const GITLAB: &str = "https://gitlab.com";
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Unsigned JWT carrying `claims`
    pub(crate) fn jwt(claims: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims);
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_audience_contains() {
        let single = Audience::Single("test".to_string());
        assert!(single.contains("test"));
        assert!(!single.contains("other"));

        let multiple = Audience::Multiple(vec!["a".to_string(), "b".to_string()]);
        assert!(multiple.contains("a"));
        assert!(!multiple.contains("c"));
    }

    #[test]
    fn test_parse_jwt() {
        let token = IdentityToken::from_jwt(&jwt(
            r#"{"iss":"https://test.com","sub":"user123","exp":9999999999,"email":"test@example.com"}"#,
        ))
        .unwrap();
        assert_eq!(token.issuer(), "https://test.com");
        assert_eq!(token.subject(), "user123");
        assert_eq!(token.email(), Some("test@example.com"));
        assert!(!token.is_expired());
        assert!(token.validate(Some("https://test.com/")).is_ok());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(IdentityToken::from_jwt("not-a-jwt").is_err());
        assert!(IdentityToken::from_jwt("a.b.c.d").is_err());
        assert!(IdentityToken::from_jwt("a.!!!.c").is_err());
    }

    #[test]
    fn test_validate_rejects_expired() {
        let token =
            IdentityToken::from_jwt(&jwt(r#"{"iss":"https://test.com","sub":"u","exp":1}"#))
                .unwrap();
        assert!(matches!(token.validate(None), Err(Error::Token(_))));
    }

    #[test]
    fn test_validate_rejects_wrong_issuer() {
        let token = IdentityToken::from_jwt(&jwt(
            r#"{"iss":"https://evil.example","sub":"u","exp":9999999999}"#,
        ))
        .unwrap();
        assert!(token.validate(None).is_ok());
        assert!(token.validate(Some(issuers::SIGSTORE_OAUTH)).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_subject() {
        let token =
            IdentityToken::from_jwt(&jwt(r#"{"iss":"https://test.com","sub":"","exp":9999999999}"#))
                .unwrap();
        assert!(token.validate(None).is_err());
    }
}
