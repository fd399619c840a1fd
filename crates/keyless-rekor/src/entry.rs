//! Rekor log entry types

use keyless_crypto::Signature;
use keyless_types::{Base64, HashFunction, HashOutput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A log entry from Rekor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// UUID of the entry (the key in the response map)
    #[serde(skip)]
    pub uuid: String,
    /// Base64 canonicalized body
    pub body: Base64,
    /// Integrated time (Unix timestamp)
    pub integrated_time: i64,
    /// Log ID (hex-encoded SHA-256 of the log's public key)
    #[serde(rename = "logID")]
    pub log_id: String,
    /// Log index
    pub log_index: i64,
    /// Verification data
    #[serde(default)]
    pub verification: Option<Verification>,
}

/// Verification data for a log entry
///
/// Kept as returned; nothing here is checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// Signed entry timestamp (SET)
    #[serde(default)]
    pub signed_entry_timestamp: Option<Base64>,
}

/// Response from creating a log entry (map of UUID to LogEntry)
pub type LogEntryResponse = HashMap<String, LogEntry>;

/// Take the single entry out of a creation response
pub fn single_entry(response: LogEntryResponse) -> Option<LogEntry> {
    let (uuid, mut entry) = response.into_iter().next()?;
    entry.uuid = uuid;
    Some(entry)
}

/// HashedRekord entry for creating new log entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekord {
    /// API version
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    /// Entry kind
    pub kind: String,
    /// Spec containing the actual data
    pub spec: HashedRekordSpec,
}

/// HashedRekord specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekordSpec {
    /// Data containing the hash
    pub data: HashedRekordData,
    /// Signature
    pub signature: HashedRekordSignature,
}

/// Data portion of HashedRekord
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekordData {
    /// Hash of the artifact
    pub hash: HashedRekordHash,
}

/// Hash in HashedRekord
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekordHash {
    /// Hash function (serializes as lowercase for the Rekor API)
    #[serde(with = "keyless_types::hash::hash_function_lowercase")]
    pub algorithm: HashFunction,
    /// Hash value (hex encoded)
    pub value: String,
}

/// Signature in HashedRekord
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekordSignature {
    /// Signature content (base64 encoded)
    pub content: Base64,
    /// Public key
    #[serde(rename = "publicKey")]
    pub public_key: HashedRekordPublicKey,
}

/// Public key in HashedRekord
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashedRekordPublicKey {
    /// Certificate PEM, base64 encoded again
    pub content: Base64,
}

impl HashedRekord {
    /// Create a new HashedRekord entry with a certificate
    ///
    /// # Arguments
    /// * `artifact_digest` - Digest of the artifact, with the hash it was signed under
    /// * `signature` - Signature bytes
    /// * `certificate_pem` - PEM of the signing certificate
    pub fn new(artifact_digest: &HashOutput, signature: &Signature, certificate_pem: &str) -> Self {
        Self {
            api_version: "0.0.1".to_string(),
            kind: "hashedrekord".to_string(),
            spec: HashedRekordSpec {
                data: HashedRekordData {
                    hash: HashedRekordHash {
                        algorithm: artifact_digest.function,
                        value: artifact_digest.to_hex(),
                    },
                },
                signature: HashedRekordSignature {
                    content: signature.to_base64(),
                    public_key: HashedRekordPublicKey {
                        content: Base64::encode(certificate_pem),
                    },
                },
            },
        }
    }
}

/// Where an accepted entry lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLocator {
    /// Path of the entry relative to the log base URL
    pub location: String,
    /// Entry UUID
    pub uuid: String,
    /// Index in the log
    pub log_index: i64,
    /// Time the log integrated the entry (Unix timestamp)
    pub integrated_time: i64,
}

impl LogLocator {
    /// The locator appended to a log base URL
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_rekord_creation() {
        let digest = HashOutput::new(HashFunction::Sha384, vec![0xab; 48]);
        let entry = HashedRekord::new(
            &digest,
            &Signature::new(b"signature".to_vec()),
            "-----BEGIN CERTIFICATE-----\n",
        );
        assert_eq!(entry.kind, "hashedrekord");
        assert_eq!(entry.api_version, "0.0.1");
        assert_eq!(entry.spec.data.hash.algorithm, HashFunction::Sha384);
        assert_eq!(entry.spec.data.hash.value, "ab".repeat(48));
        assert_eq!(
            entry.spec.signature.public_key.content.decode().unwrap(),
            b"-----BEGIN CERTIFICATE-----\n"
        );

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["apiVersion"], "0.0.1");
        assert_eq!(json["spec"]["data"]["hash"]["algorithm"], "sha384");
        assert_eq!(json["spec"]["signature"]["content"], "c2lnbmF0dXJl");
    }

    #[test]
    fn test_single_entry_takes_uuid_from_key() {
        let json = r#"{
            "24296fb24b8ad77a": {
                "body": "e30=",
                "integratedTime": 1700000000,
                "logID": "c0d23d6ad406973f",
                "logIndex": 42,
                "verification": {"signedEntryTimestamp": "AAAA"}
            }
        }"#;
        let response: LogEntryResponse = serde_json::from_str(json).unwrap();
        let entry = single_entry(response).unwrap();
        assert_eq!(entry.uuid, "24296fb24b8ad77a");
        assert_eq!(entry.log_index, 42);
        assert_eq!(entry.integrated_time, 1700000000);
    }

    #[test]
    fn test_locator_url() {
        let locator = LogLocator {
            location: "/api/v1/log/entries/abc".to_string(),
            uuid: "abc".to_string(),
            log_index: 1,
            integrated_time: 0,
        };
        assert_eq!(
            locator.url("https://rekor.sigstore.dev"),
            "https://rekor.sigstore.dev/api/v1/log/entries/abc"
        );
    }
}
