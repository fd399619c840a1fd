//! X.509 certificate utilities
//!
//! Parsing of the PEM chains a certificate authority returns, plus the bits
//! of a leaf certificate the signing flow reports back to the user.

use crate::error::{Error, Result};
use crate::signing::{encode_spki, PublicKey};
use const_oid::ObjectIdentifier;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

/// Fulcio issuer OID: 1.3.6.1.4.1.57264.1.1
/// This extension contains the OIDC issuer URL
const FULCIO_ISSUER_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.1");

/// A parsed certificate, kept together with its DER encoding
#[derive(Debug, Clone)]
pub struct ParsedCertificate {
    der: Vec<u8>,
    cert: Certificate,
}

impl ParsedCertificate {
    /// Parse a DER-encoded certificate
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let cert = Certificate::from_der(&der).map_err(|e| {
            Error::InvalidCertificate(format!("failed to parse certificate: {}", e))
        })?;
        Ok(Self { der, cert })
    }

    /// The DER encoding
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding with `CERTIFICATE` headers
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    /// The underlying x509-cert structure
    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    /// Serial number rendered as a decimal integer
    pub fn serial_decimal(&self) -> String {
        decimal_from_be_bytes(self.cert.tbs_certificate.serial_number.as_bytes())
    }

    /// The subject public key
    pub fn public_key(&self) -> Result<PublicKey> {
        encode_spki(&self.cert.tbs_certificate.subject_public_key_info)
    }

    /// Summary of the identity fields
    pub fn info(&self) -> Result<CertificateInfo> {
        let validity = &self.cert.tbs_certificate.validity;
        Ok(CertificateInfo {
            serial: self.serial_decimal(),
            identity: extract_san_identity(&self.cert)?,
            issuer: extract_fulcio_issuer(&self.cert)?,
            not_before: validity.not_before.to_unix_duration().as_secs() as i64,
            not_after: validity.not_after.to_unix_duration().as_secs() as i64,
            public_key: self.public_key()?,
        })
    }
}

/// Information extracted from a certificate
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// Decimal serial number
    pub serial: String,
    /// Identity from SAN extension (email or URI)
    pub identity: Option<String>,
    /// OIDC issuer URL from the Fulcio extension
    pub issuer: Option<String>,
    /// Not valid before (Unix timestamp)
    pub not_before: i64,
    /// Not valid after (Unix timestamp)
    pub not_after: i64,
    /// Subject public key
    pub public_key: PublicKey,
}

/// Parse every `CERTIFICATE` block in a PEM bundle, leaf first
///
/// Blocks with other tags are skipped. An input without any certificate
/// yields an empty list; callers decide whether that is an error.
pub fn parse_pem_chain(text: &str) -> Result<Vec<ParsedCertificate>> {
    let blocks = pem::parse_many(text).map_err(|e| Error::Pem(e.to_string()))?;
    blocks
        .into_iter()
        .filter(|block| block.tag() == "CERTIFICATE")
        .map(|block| ParsedCertificate::from_der(block.into_contents()))
        .collect()
}

/// Encode a certificate structure back to DER
pub fn certificate_to_der(cert: &Certificate) -> Result<Vec<u8>> {
    cert.to_der().map_err(|e| Error::Der(e.to_string()))
}

/// Render an unsigned big-endian integer in base 10
pub fn decimal_from_be_bytes(bytes: &[u8]) -> String {
    let mut digits: Vec<u8> = Vec::new();
    let mut number: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();

    while !number.is_empty() {
        let mut remainder = 0u32;
        let mut quotient = Vec::with_capacity(number.len());
        for byte in &number {
            let acc = (remainder << 8) | u32::from(*byte);
            let q = (acc / 10) as u8;
            remainder = acc % 10;
            if !(quotient.is_empty() && q == 0) {
                quotient.push(q);
            }
        }
        digits.push(b'0' + remainder as u8);
        number = quotient;
    }

    if digits.is_empty() {
        return "0".to_string();
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Extract identity from Subject Alternative Name (SAN) extension
pub fn extract_san_identity(cert: &Certificate) -> Result<Option<String>> {
    use x509_cert::ext::pkix::name::GeneralName;
    use x509_cert::ext::pkix::SubjectAltName;

    let san_opt: Option<(bool, SubjectAltName)> = cert
        .tbs_certificate
        .get()
        .map_err(|e| Error::InvalidCertificate(format!("failed to get SAN extension: {}", e)))?;

    let Some((_critical, san)) = san_opt else {
        return Ok(None);
    };

    Ok(san.0.iter().find_map(|name| match name {
        GeneralName::Rfc822Name(email) => Some(email.to_string()),
        GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
        _ => None,
    }))
}

/// Extract the OIDC issuer from the Fulcio certificate extension
pub fn extract_fulcio_issuer(cert: &Certificate) -> Result<Option<String>> {
    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return Ok(None);
    };

    Ok(extensions
        .iter()
        .find(|ext| ext.extn_id == FULCIO_ISSUER_OID)
        .and_then(|ext| {
            let value = ext.extn_value.as_bytes();
            // v1 of the extension stores raw bytes, v2 a DER UTF8String
            der::asn1::Utf8StringRef::from_der(value)
                .map(|s| s.to_string())
                .ok()
                .or_else(|| std::str::from_utf8(value).ok().map(str::to_string))
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[], "0")]
    #[case(&[0x00], "0")]
    #[case(&[0x2a], "42")]
    #[case(&[0x01, 0x00], "256")]
    #[case(&[0x00, 0xff, 0xff], "65535")]
    #[case(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], "18446744073709551616")]
    fn test_decimal_from_be_bytes(#[case] bytes: &[u8], #[case] expected: &str) {
        assert_eq!(decimal_from_be_bytes(bytes), expected);
    }

    #[test]
    fn test_parse_pem_chain_skips_other_blocks() {
        let text = "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----\n";
        assert!(parse_pem_chain(text).unwrap().is_empty());
    }

    #[test]
    fn test_parse_pem_chain_rejects_garbage_certificate() {
        let text = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            parse_pem_chain(text),
            Err(Error::InvalidCertificate(_))
        ));
    }
}
