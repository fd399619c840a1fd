//! Hash function types shared by every signing backend

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Hash functions a signing backend may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashFunction {
    /// SHA2-256
    #[serde(rename = "SHA2_256")]
    Sha256,
    /// SHA2-384
    #[serde(rename = "SHA2_384")]
    Sha384,
    /// SHA2-512
    #[serde(rename = "SHA2_512")]
    Sha512,
}

impl HashFunction {
    /// Every hash function known to this crate, strongest last
    pub const ALL: [HashFunction; 3] = [
        HashFunction::Sha256,
        HashFunction::Sha384,
        HashFunction::Sha512,
    ];

    /// Get the digest size in bytes for this function
    pub fn digest_size(&self) -> usize {
        match self {
            HashFunction::Sha256 => 32,
            HashFunction::Sha384 => 48,
            HashFunction::Sha512 => 64,
        }
    }

    /// Get the OID for this function
    pub fn oid(&self) -> &'static str {
        match self {
            HashFunction::Sha256 => "2.16.840.1.101.3.4.2.1",
            HashFunction::Sha384 => "2.16.840.1.101.3.4.2.2",
            HashFunction::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Lowercase name used by transparency log entries (`sha256`, ...)
    pub fn wire_name(&self) -> &'static str {
        match self {
            HashFunction::Sha256 => "sha256",
            HashFunction::Sha384 => "sha384",
            HashFunction::Sha512 => "sha512",
        }
    }
}

impl std::fmt::Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashFunction::Sha256 => write!(f, "SHA2_256"),
            HashFunction::Sha384 => write!(f, "SHA2_384"),
            HashFunction::Sha512 => write!(f, "SHA2_512"),
        }
    }
}

impl FromStr for HashFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "sha256" | "sha2256" => Ok(HashFunction::Sha256),
            "sha384" | "sha2384" => Ok(HashFunction::Sha384),
            "sha512" | "sha2512" => Ok(HashFunction::Sha512),
            _ => Err(Error::InvalidHashFunction(s.to_string())),
        }
    }
}

/// A digest together with the function that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashOutput {
    /// The function used to produce this digest
    pub function: HashFunction,
    /// The digest bytes
    pub digest: Vec<u8>,
}

impl HashOutput {
    /// Create a new hash output
    pub fn new(function: HashFunction, digest: Vec<u8>) -> Self {
        Self { function, digest }
    }

    /// Get the digest as a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

/// Serde helper writing a [`HashFunction`] as its lowercase wire name
pub mod hash_function_lowercase {
    use super::HashFunction;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(function: &HashFunction, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(function.wire_name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashFunction, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hash_function() {
        assert_eq!("sha256".parse::<HashFunction>().unwrap(), HashFunction::Sha256);
        assert_eq!("SHA2_384".parse::<HashFunction>().unwrap(), HashFunction::Sha384);
        assert_eq!("SHA-512".parse::<HashFunction>().unwrap(), HashFunction::Sha512);
        assert!("md5".parse::<HashFunction>().is_err());
    }

    #[test]
    fn test_digest_sizes() {
        let sizes: Vec<usize> = HashFunction::ALL.iter().map(|h| h.digest_size()).collect();
        assert_eq!(sizes, vec![32, 48, 64]);
    }
}
