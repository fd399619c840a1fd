//! Key reference parsing
//!
//! A key reference is a URI-like string naming a backend and a key inside
//! it. Two schemes are understood:
//!
//! - `awskms://[endpoint]/<key-id | alias/name | arn:...>`
//! - `localkms://<name>`

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Scheme prefix for AWS KMS references
pub const AWS_SCHEME: &str = "awskms://";
/// Scheme prefix for in-process key references
pub const LOCAL_SCHEME: &str = "localkms://";

fn aws_key_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^awskms://([^/]*)/([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})$",
        )
        .expect("invalid regex")
    })
}

fn aws_alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^awskms://([^/]*)/(alias/[a-zA-Z0-9/_-]+)$").expect("invalid regex")
    })
}

fn aws_arn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^awskms://([^/]*)/(arn:(?:aws|aws-us-gov|aws-cn):kms:([a-z0-9-]+):\d{12}:(?:key|alias)/[a-zA-Z0-9/_-]+)$",
        )
        .expect("invalid regex")
    })
}

fn local_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^localkms://([A-Za-z0-9._-]+)$").expect("invalid regex"))
}

/// A parsed key reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyReference {
    /// A key in AWS KMS
    Aws {
        /// Custom endpoint, empty in the reference means the default one
        endpoint: Option<String>,
        /// Key id, `alias/...` or full ARN
        key_id: String,
        /// Region, known only when the reference is an ARN
        region: Option<String>,
    },
    /// A key held by the in-process store
    Local {
        /// Name of the key in the store
        name: String,
    },
}

impl KeyReference {
    /// Parse a reference string
    pub fn parse(reference: &str) -> Result<Self> {
        if reference.starts_with(LOCAL_SCHEME) {
            let caps = local_re()
                .captures(reference)
                .ok_or_else(|| invalid(reference, "key name may only contain [A-Za-z0-9._-]"))?;
            return Ok(KeyReference::Local {
                name: caps[1].to_string(),
            });
        }

        if reference.starts_with(AWS_SCHEME) {
            let endpoint = |s: &str| (!s.is_empty()).then(|| s.to_string());

            if let Some(caps) = aws_key_id_re().captures(reference) {
                return Ok(KeyReference::Aws {
                    endpoint: endpoint(&caps[1]),
                    key_id: caps[2].to_string(),
                    region: None,
                });
            }
            if let Some(caps) = aws_alias_re().captures(reference) {
                return Ok(KeyReference::Aws {
                    endpoint: endpoint(&caps[1]),
                    key_id: caps[2].to_string(),
                    region: None,
                });
            }
            if let Some(caps) = aws_arn_re().captures(reference) {
                return Ok(KeyReference::Aws {
                    endpoint: endpoint(&caps[1]),
                    key_id: caps[2].to_string(),
                    region: Some(caps[3].to_string()),
                });
            }
            return Err(invalid(
                reference,
                "expected a key id, alias/<name> or key ARN",
            ));
        }

        Err(invalid(reference, "unknown scheme"))
    }

    /// The scheme prefix of this reference
    pub fn scheme(&self) -> &'static str {
        match self {
            KeyReference::Aws { .. } => AWS_SCHEME,
            KeyReference::Local { .. } => LOCAL_SCHEME,
        }
    }

    /// Whether an AWS reference names an alias rather than a key
    pub fn is_alias(&self) -> bool {
        match self {
            KeyReference::Aws { key_id, .. } => {
                key_id.starts_with("alias/") || key_id.contains(":alias/")
            }
            KeyReference::Local { .. } => false,
        }
    }
}

fn invalid(reference: &str, reason: &str) -> Error {
    Error::InvalidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

impl fmt::Display for KeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyReference::Aws {
                endpoint, key_id, ..
            } => write!(
                f,
                "{}{}/{}",
                AWS_SCHEME,
                endpoint.as_deref().unwrap_or(""),
                key_id
            ),
            KeyReference::Local { name } => write!(f, "{}{}", LOCAL_SCHEME, name),
        }
    }
}

impl FromStr for KeyReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_key_id() {
        let r = KeyReference::parse("awskms:///1234abcd-12ab-34cd-56ef-1234567890ab").unwrap();
        assert_eq!(
            r,
            KeyReference::Aws {
                endpoint: None,
                key_id: "1234abcd-12ab-34cd-56ef-1234567890ab".to_string(),
                region: None,
            }
        );
        assert!(!r.is_alias());
    }

    #[test]
    fn test_parse_alias_with_endpoint() {
        let r = KeyReference::parse("awskms://localhost:4566/alias/release-signing").unwrap();
        assert_eq!(
            r,
            KeyReference::Aws {
                endpoint: Some("localhost:4566".to_string()),
                key_id: "alias/release-signing".to_string(),
                region: None,
            }
        );
        assert!(r.is_alias());
        assert_eq!(r.to_string(), "awskms://localhost:4566/alias/release-signing");
    }

    #[test]
    fn test_parse_arn_takes_region() {
        let r = KeyReference::parse(
            "awskms:///arn:aws:kms:us-east-2:111122223333:key/1234abcd-12ab-34cd-56ef-1234567890ab",
        )
        .unwrap();
        match r {
            KeyReference::Aws { region, key_id, .. } => {
                assert_eq!(region.as_deref(), Some("us-east-2"));
                assert!(key_id.starts_with("arn:aws:kms:"));
            }
            other => panic!("unexpected reference {:?}", other),
        }
    }

    #[test]
    fn test_parse_local() {
        assert_eq!(
            "localkms://ephemeral-1".parse::<KeyReference>().unwrap(),
            KeyReference::Local {
                name: "ephemeral-1".to_string()
            }
        );
    }

    #[rstest]
    #[case("gcpkms://projects/p/locations/l/keyRings/r/cryptoKeys/k")]
    #[case("awskms:///not-a-key")]
    #[case("awskms://")]
    #[case("localkms://")]
    #[case("localkms://has/slash")]
    #[case("")]
    fn test_rejects_malformed(#[case] reference: &str) {
        assert!(matches!(
            KeyReference::parse(reference),
            Err(Error::InvalidReference { .. })
        ));
    }
}
