//! OpenID Connect identity tokens for keyless signing
//!
//! This crate obtains the short-lived identity token that binds a signing
//! certificate to a person or workload. Four strategies are supported:
//! an interactive browser flow, the device code flow, a pre-obtained static
//! token, and ambient CI credentials.

pub mod ambient;
pub mod authenticator;
pub mod discovery;
pub mod error;
pub mod loopback;
pub mod oauth;
pub mod token;

pub use ambient::{detect_environment, get_ambient_token, CiEnvironment};
pub use authenticator::{authenticate, Authenticator, Prompt, PromptFn, TokenGetter};
pub use discovery::{discover, ProviderMetadata};
pub use error::{Error, Result};
pub use oauth::{DeviceCodeResponse, OAuthClient, OAuthConfig, Pkce};
pub use token::{issuers, Audience, IdentityToken, TokenClaims};

/// Parse an identity token from a JWT string
pub fn parse_identity_token(token: &str) -> Result<IdentityToken> {
    IdentityToken::from_jwt(token)
}
