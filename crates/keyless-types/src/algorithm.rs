//! Key algorithm families understood by the signing backends

use crate::error::{Error, Result};
use crate::hash::HashFunction;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Asymmetric key algorithm of a signing key
///
/// The string forms are the key-spec names used by cloud key management
/// services (`ECC_NIST_P256`, `RSA_2048`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// RSA with a 2048-bit modulus
    #[serde(rename = "RSA_2048")]
    Rsa2048,
    /// RSA with a 3072-bit modulus
    #[serde(rename = "RSA_3072")]
    Rsa3072,
    /// RSA with a 4096-bit modulus
    #[serde(rename = "RSA_4096")]
    Rsa4096,
    /// ECDSA over NIST P-256
    #[serde(rename = "ECC_NIST_P256")]
    EcdsaP256,
    /// ECDSA over NIST P-384
    #[serde(rename = "ECC_NIST_P384")]
    EcdsaP384,
    /// ECDSA over NIST P-521
    #[serde(rename = "ECC_NIST_P521")]
    EcdsaP521,
}

impl KeyAlgorithm {
    /// Every algorithm, RSA first
    pub const ALL: [KeyAlgorithm; 6] = [
        KeyAlgorithm::Rsa2048,
        KeyAlgorithm::Rsa3072,
        KeyAlgorithm::Rsa4096,
        KeyAlgorithm::EcdsaP256,
        KeyAlgorithm::EcdsaP384,
        KeyAlgorithm::EcdsaP521,
    ];

    /// Key-spec name of this algorithm
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa2048 => "RSA_2048",
            KeyAlgorithm::Rsa3072 => "RSA_3072",
            KeyAlgorithm::Rsa4096 => "RSA_4096",
            KeyAlgorithm::EcdsaP256 => "ECC_NIST_P256",
            KeyAlgorithm::EcdsaP384 => "ECC_NIST_P384",
            KeyAlgorithm::EcdsaP521 => "ECC_NIST_P521",
        }
    }

    /// Hash function a key of this algorithm signs with unless told otherwise
    pub fn default_hash_function(&self) -> HashFunction {
        match self {
            KeyAlgorithm::EcdsaP384 => HashFunction::Sha384,
            KeyAlgorithm::EcdsaP521 => HashFunction::Sha512,
            _ => HashFunction::Sha256,
        }
    }

    /// Whether this is an elliptic-curve algorithm
    pub fn is_ecdsa(&self) -> bool {
        matches!(
            self,
            KeyAlgorithm::EcdsaP256 | KeyAlgorithm::EcdsaP384 | KeyAlgorithm::EcdsaP521
        )
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RSA_2048" => Ok(KeyAlgorithm::Rsa2048),
            "RSA_3072" => Ok(KeyAlgorithm::Rsa3072),
            "RSA_4096" => Ok(KeyAlgorithm::Rsa4096),
            "ECC_NIST_P256" => Ok(KeyAlgorithm::EcdsaP256),
            "ECC_NIST_P384" => Ok(KeyAlgorithm::EcdsaP384),
            "ECC_NIST_P521" => Ok(KeyAlgorithm::EcdsaP521),
            _ => Err(Error::InvalidKeyAlgorithm(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names_roundtrip() {
        for alg in [
            KeyAlgorithm::Rsa2048,
            KeyAlgorithm::Rsa3072,
            KeyAlgorithm::Rsa4096,
            KeyAlgorithm::EcdsaP256,
            KeyAlgorithm::EcdsaP384,
            KeyAlgorithm::EcdsaP521,
        ] {
            assert_eq!(alg.name().parse::<KeyAlgorithm>().unwrap(), alg);
        }
        assert!("ED25519".parse::<KeyAlgorithm>().is_err());
    }

    #[test]
    fn test_default_hash_function() {
        assert_eq!(
            KeyAlgorithm::EcdsaP256.default_hash_function(),
            HashFunction::Sha256
        );
        assert_eq!(
            KeyAlgorithm::EcdsaP384.default_hash_function(),
            HashFunction::Sha384
        );
        assert_eq!(
            KeyAlgorithm::Rsa4096.default_hash_function(),
            HashFunction::Sha256
        );
    }
}
