//! Encoding wrappers for values that cross the wire as text
//!
//! Signatures, public keys and certificates travel to the issuance and log
//! services base64-encoded; digests travel hex-encoded. Keeping the encoded
//! form in a newtype stops a raw byte string from being sent by mistake.

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Standard-alphabet base64 text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Base64(String);

impl Base64 {
    /// Encode raw bytes
    pub fn encode(bytes: impl AsRef<[u8]>) -> Self {
        Base64(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Decode back to raw bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.0)
            .map_err(|e| Error::InvalidEncoding(format!("invalid base64: {}", e)))
    }

    /// Get the encoded text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Base64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase hex text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hex(String);

impl Hex {
    /// Encode raw bytes
    pub fn encode(bytes: impl AsRef<[u8]>) -> Self {
        Hex(hex::encode(bytes))
    }

    /// Decode back to raw bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        hex::decode(&self.0).map_err(|e| Error::InvalidEncoding(format!("invalid hex: {}", e)))
    }

    /// Get the encoded text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        assert_eq!(Base64::encode(b"hello").as_str(), "aGVsbG8=");
        assert_eq!(Hex::encode([0xde, 0xad, 0xbe, 0xef]).as_str(), "deadbeef");
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let bad: Base64 = serde_json::from_str("\"not base64!\"").unwrap();
        assert!(matches!(bad.decode(), Err(Error::InvalidEncoding(_))));
    }
}
