//! Rekor client for transparency log operations

use crate::entry::{single_entry, HashedRekord, LogEntryResponse, LogLocator};
use crate::error::{Error, Result};
use keyless_crypto::Signature;
use keyless_types::{CallContext, HashOutput};

/// A client for interacting with Rekor
#[derive(Debug, Clone)]
pub struct RekorClient {
    /// Base URL of the Rekor instance
    url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl RekorClient {
    /// Create a new Rekor client
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Create a client sharing an existing HTTP client
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a client for the public Sigstore Rekor instance
    pub fn public() -> Self {
        Self::new("https://rekor.sigstore.dev")
    }

    /// Create a client for the Sigstore staging Rekor instance
    pub fn staging() -> Self {
        Self::new("https://rekor.sigstage.dev")
    }

    /// Base URL this client talks to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Record a signature made with a certificate's key
    ///
    /// A single attempt; failures are not retried.
    pub async fn upload(
        &self,
        certificate_pem: &str,
        signature: &Signature,
        artifact_digest: &HashOutput,
        ctx: &CallContext,
    ) -> Result<LogLocator> {
        let entry = HashedRekord::new(artifact_digest, signature, certificate_pem);
        ctx.run(self.create_entry(&entry)).await?
    }

    /// Create a new log entry
    pub async fn create_entry(&self, entry: &HashedRekord) -> Result<LogLocator> {
        let url = format!("{}/api/v1/log/entries", self.url);
        tracing::debug!(%url, kind = %entry.kind, "submitting log entry");

        let response = self
            .client
            .post(&url)
            .json(entry)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        locator_from_response(&body, location)
    }
}

/// Build the locator from a creation response body and its `Location` header
pub fn locator_from_response(body: &str, location: Option<String>) -> Result<LogLocator> {
    let response: LogEntryResponse = serde_json::from_str(body)?;
    let entry = single_entry(response)
        .ok_or_else(|| Error::InvalidResponse("no entry in response".to_string()))?;

    let location = location.unwrap_or_else(|| format!("/api/v1/log/entries/{}", entry.uuid));
    Ok(LogLocator {
        location,
        uuid: entry.uuid,
        log_index: entry.log_index,
        integrated_time: entry.integrated_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"abc123":{"body":"e30=","integratedTime":1700000000,"logID":"00","logIndex":7}}"#;

    #[test]
    fn test_locator_from_header() {
        let locator =
            locator_from_response(BODY, Some("/api/v1/log/entries/abc123".to_string())).unwrap();
        assert_eq!(locator.location, "/api/v1/log/entries/abc123");
        assert_eq!(locator.log_index, 7);
    }

    #[test]
    fn test_locator_without_header() {
        let locator = locator_from_response(BODY, None).unwrap();
        assert_eq!(locator.location, "/api/v1/log/entries/abc123");
        assert_eq!(locator.uuid, "abc123");
    }

    #[test]
    fn test_empty_response() {
        assert!(matches!(
            locator_from_response("{}", None),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_malformed_response() {
        assert!(matches!(
            locator_from_response("not json", None),
            Err(Error::Json(_))
        ));
    }
}
