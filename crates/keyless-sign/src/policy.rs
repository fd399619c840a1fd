//! Which artifacts may be signed

/// Media types accepted unless configured otherwise
pub const DEFAULT_MEDIA_TYPES: &[&str] = &[
    "text/plain",
    "application/json",
    "application/gzip",
    "application/x-gzip",
    "application/x-tar",
    "application/zip",
    "application/x-executable",
    "application/x-mach-binary",
    "application/vnd.microsoft.portable-executable",
    "application/octet-stream",
];

/// Allow-list of artifact media types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPolicy {
    media_types: Vec<String>,
}

impl Default for ArtifactPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_TYPES.iter().copied())
    }
}

impl ArtifactPolicy {
    /// A policy accepting exactly `media_types`
    pub fn new<I, S>(media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            media_types: media_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Accepted media types
    pub fn media_types(&self) -> &[String] {
        &self.media_types
    }

    /// Whether `media_type` may be signed
    ///
    /// Parameters such as `; charset=utf-8` are ignored and the comparison
    /// is case-insensitive.
    pub fn allows(&self, media_type: &str) -> bool {
        let essence = media_type.split(';').next().unwrap_or_default().trim();
        self.media_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }

    /// Fail unless `media_type` may be signed
    pub fn check(&self, media_type: &str) -> crate::Result<()> {
        if self.allows(media_type) {
            Ok(())
        } else {
            Err(crate::Error::UnsupportedMediaType(media_type.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("text/plain", true)]
    #[case("text/plain; charset=utf-8", true)]
    #[case("APPLICATION/JSON", true)]
    #[case("application/zip", true)]
    #[case("image/png", false)]
    #[case("", false)]
    fn test_default_policy(#[case] media_type: &str, #[case] allowed: bool) {
        assert_eq!(ArtifactPolicy::default().allows(media_type), allowed);
    }

    #[test]
    fn test_custom_policy() {
        let policy = ArtifactPolicy::new(["image/png"]);
        assert!(policy.check("image/png").is_ok());
        assert!(matches!(
            policy.check("text/plain"),
            Err(crate::Error::UnsupportedMediaType(_))
        ));
    }
}
