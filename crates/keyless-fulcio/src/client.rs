//! Fulcio client for certificate operations

use crate::error::{Error, Result};
use keyless_crypto::{parse_pem_chain, ParsedCertificate, PublicKey, Signature};
use keyless_types::{Base64, CallContext};
use serde::{Deserialize, Serialize};

/// Media type of the chain returned by the v1 API
pub const PEM_CHAIN_MEDIA_TYPE: &str = "application/pem-certificate-chain";

/// A client for interacting with Fulcio
#[derive(Debug, Clone)]
pub struct FulcioClient {
    /// Base URL of the Fulcio instance
    url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl FulcioClient {
    /// Create a new Fulcio client
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

    /// Create a client for the public Sigstore Fulcio instance
    pub fn public() -> Self {
        Self::new("https://fulcio.sigstore.dev")
    }

    /// Create a client for the Sigstore staging Fulcio instance
    pub fn staging() -> Self {
        Self::new("https://fulcio.sigstage.dev")
    }

    /// Base URL this client talks to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request a signing certificate
    ///
    /// # Arguments
    /// * `identity_token` - The raw OIDC identity token, sent as bearer credentials
    /// * `public_key` - The ephemeral public key
    /// * `proof_of_possession` - Signature over the token subject made with that key
    pub async fn request_certificate(
        &self,
        identity_token: &str,
        public_key: &PublicKey,
        proof_of_possession: &Signature,
        ctx: &CallContext,
    ) -> Result<CertificateChain> {
        ctx.run(self.submit(identity_token, public_key, proof_of_possession))
            .await?
    }

    async fn submit(
        &self,
        identity_token: &str,
        public_key: &PublicKey,
        proof_of_possession: &Signature,
    ) -> Result<CertificateChain> {
        let url = format!("{}/api/v1/signingCert", self.url);
        let request = SigningCertificateRequest::new(public_key, proof_of_possession)?;
        tracing::debug!(%url, "requesting signing certificate");

        let response = self
            .client
            .post(&url)
            .bearer_auth(identity_token)
            .header(reqwest::header::ACCEPT, PEM_CHAIN_MEDIA_TYPE)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        classify_status(status, &body)?;

        CertificateChain::from_pem(&body)
    }
}

/// Map a non-2xx status onto the issuance error kinds
pub fn classify_status(status: u16, body: &str) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        500 => Err(Error::Internal {
            status,
            body: body.to_string(),
        }),
        _ => Err(Error::Rejected {
            status,
            body: body.to_string(),
        }),
    }
}

/// Body of a v1 signing certificate request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningCertificateRequest {
    /// The key to certify
    pub public_key: PublicKeyData,
    /// Proof of possession, base64
    pub signed_email_address: Base64,
}

impl SigningCertificateRequest {
    /// Build a request for `public_key` carrying `proof`
    pub fn new(public_key: &PublicKey, proof: &Signature) -> Result<Self> {
        let algorithm = if public_key.algorithm()?.is_ecdsa() {
            "ecdsa"
        } else {
            "rsa"
        };
        Ok(Self {
            public_key: PublicKeyData {
                content: Base64::encode(public_key.as_der()),
                algorithm: algorithm.to_string(),
            },
            signed_email_address: proof.to_base64(),
        })
    }
}

/// Public key data for API requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyData {
    /// DER-encoded SubjectPublicKeyInfo, base64
    pub content: Base64,
    /// Key family
    pub algorithm: String,
}

/// Certificates returned by Fulcio, leaf first
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certificates: Vec<ParsedCertificate>,
}

impl CertificateChain {
    /// Parse a PEM chain, rejecting one without certificates
    pub fn from_pem(text: &str) -> Result<Self> {
        let certificates = parse_pem_chain(text)?;
        if certificates.is_empty() {
            return Err(Error::EmptyCertificateChain);
        }
        Ok(Self { certificates })
    }

    /// The signing certificate
    pub fn leaf(&self) -> &ParsedCertificate {
        &self.certificates[0]
    }

    /// All certificates in order
    pub fn certificates(&self) -> &[ParsedCertificate] {
        &self.certificates
    }

    /// The whole chain as PEM
    pub fn to_pem(&self) -> String {
        self.certificates.iter().map(|c| c.to_pem()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyless_crypto::EcdsaKeyPair;
    use keyless_types::KeyAlgorithm;
    use rstest::rstest;

    #[rstest]
    #[case(200)]
    #[case(201)]
    fn test_classify_success(#[case] status: u16) {
        assert!(classify_status(status, "").is_ok());
    }

    #[test]
    fn test_classify_internal() {
        let err = classify_status(500, "boom").unwrap_err();
        assert!(matches!(err, Error::Internal { status: 500, .. }));
    }

    #[rstest]
    #[case(400)]
    #[case(401)]
    #[case(403)]
    #[case(502)]
    #[case(503)]
    fn test_classify_rejected(#[case] status: u16) {
        let err = classify_status(status, "no").unwrap_err();
        assert!(matches!(err, Error::Rejected { status: s, .. } if s == status));
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(matches!(
            CertificateChain::from_pem(""),
            Err(Error::EmptyCertificateChain)
        ));
        let key_only = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
        assert!(matches!(
            CertificateChain::from_pem(key_only),
            Err(Error::EmptyCertificateChain)
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let key = EcdsaKeyPair::generate(KeyAlgorithm::EcdsaP256).unwrap();
        let public_key = key.public_key().unwrap();
        let proof = Signature::new(vec![1, 2, 3]);
        let request = SigningCertificateRequest::new(&public_key, &proof).unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["publicKey"]["algorithm"], "ecdsa");
        assert_eq!(json["signedEmailAddress"], "AQID");
        assert_eq!(
            json["publicKey"]["content"],
            Base64::encode(public_key.as_der()).as_str()
        );
    }
}
