use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use time::OffsetDateTime;
use time::macros::datetime;
use x509_parser::num_bigint::BigUint;

use crate::revoke::{
    Certificate, OcspResponse, PkiBackend, RevocationList, RevokeError, RevokeResult,
    RevokedEntry,
};

pub(crate) const CRL_URL: &str = "http://crl.example.com/ca.crl";
pub(crate) const OCSP_URL: &str = "http://ocsp.example.com";
pub(crate) const ISSUER_URL: &str = "http://ca.example.com/ca.crt";
pub(crate) const NOW: OffsetDateTime = datetime!(2024-06-01 0:00 UTC);

/// Backend that maps body bytes to canned objects
#[derive(Debug)]
pub(crate) struct FakeBackend {
    certificates: HashMap<Vec<u8>, Certificate>,
    crls: HashMap<Vec<u8>, RevocationList>,
    ocsp_responses: HashMap<Vec<u8>, OcspResponse>,
    pub(crate) ocsp_request: Vec<u8>,
    pub(crate) reject_crl_signatures: bool,
    pub(crate) signature_checks: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            certificates: HashMap::new(),
            crls: HashMap::new(),
            ocsp_responses: HashMap::new(),
            ocsp_request: b"ocsp-request".to_vec(),
            reject_crl_signatures: false,
            signature_checks: AtomicUsize::new(0),
        }
    }
}

impl FakeBackend {
    pub(crate) fn add_certificate(&mut self, der: &[u8], cert: Certificate) {
        self.certificates.insert(der.to_vec(), cert);
    }

    pub(crate) fn add_crl(&mut self, der: &[u8], crl: RevocationList) {
        self.crls.insert(der.to_vec(), crl);
    }

    pub(crate) fn add_ocsp_response(&mut self, body: &[u8], response: OcspResponse) {
        self.ocsp_responses.insert(body.to_vec(), response);
    }
}

impl PkiBackend for FakeBackend {
    fn parse_certificate(&self, der: &[u8]) -> RevokeResult<Certificate> {
        self.certificates
            .get(der)
            .cloned()
            .ok_or_else(|| RevokeError::CertificateParse("unknown certificate".to_string()))
    }

    fn parse_crl(&self, der: &[u8], distribution_point: &str) -> RevokeResult<RevocationList> {
        let mut crl = self
            .crls
            .get(der)
            .cloned()
            .ok_or_else(|| RevokeError::CrlParse("unknown CRL".to_string()))?;
        crl.distribution_point = distribution_point.to_string();
        Ok(crl)
    }

    fn verify_crl_signature(&self, _crl: &RevocationList, _issuer: &Certificate) -> RevokeResult<()> {
        self.signature_checks.fetch_add(1, Ordering::SeqCst);
        if self.reject_crl_signatures {
            return Err(RevokeError::SignatureVerification);
        }
        Ok(())
    }

    fn build_ocsp_request(&self, _leaf: &Certificate, _issuer: &Certificate) -> RevokeResult<Vec<u8>> {
        Ok(self.ocsp_request.clone())
    }

    fn parse_ocsp_response(
        &self,
        body: &[u8],
        _leaf: &Certificate,
        _issuer: &Certificate,
    ) -> RevokeResult<OcspResponse> {
        self.ocsp_responses
            .get(body)
            .cloned()
            .ok_or_else(|| RevokeError::OcspParse("unknown OCSP response".to_string()))
    }
}

/// Leaf valid for 2024 with one CRL distribution point, one OCSP
/// responder and one issuer URL
pub(crate) fn leaf_cert(serial: u64) -> Certificate {
    Certificate {
        der: b"leaf-der".to_vec(),
        serial: BigUint::from(serial),
        not_before: datetime!(2024-01-01 0:00 UTC),
        not_after: datetime!(2025-01-01 0:00 UTC),
        crl_distribution_points: vec![CRL_URL.to_string()],
        ocsp_servers: vec![OCSP_URL.to_string()],
        issuing_certificate_urls: vec![ISSUER_URL.to_string()],
    }
}

pub(crate) fn issuer_cert() -> Certificate {
    Certificate {
        der: b"issuer-der".to_vec(),
        serial: BigUint::from(1u32),
        not_before: datetime!(2020-01-01 0:00 UTC),
        not_after: datetime!(2030-01-01 0:00 UTC),
        crl_distribution_points: Vec::new(),
        ocsp_servers: Vec::new(),
        issuing_certificate_urls: Vec::new(),
    }
}

pub(crate) fn crl_listing(url: &str, serials: &[u64], next_update: OffsetDateTime) -> RevocationList {
    RevocationList {
        der: Vec::new(),
        distribution_point: url.to_string(),
        issuer: "CN=Test CA".to_string(),
        this_update: datetime!(2024-01-01 0:00 UTC),
        next_update: Some(next_update),
        revoked: serials
            .iter()
            .map(|serial| RevokedEntry {
                serial: BigUint::from(*serial),
                revocation_time: datetime!(2024-02-01 0:00 UTC),
                reason: None,
            })
            .collect(),
    }
}

pub(crate) fn pem_wrap(der: &[u8]) -> Vec<u8> {
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        STANDARD.encode(der)
    )
    .into_bytes()
}
