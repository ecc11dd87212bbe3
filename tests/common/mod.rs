#![allow(dead_code)]

use cert_revoke::revoke::{HttpClient, HttpResponse, RevokeResult};
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, CrlDistributionPoint,
    CustomExtension, DnType, DnValue, IsCa, KeyIdMethod, KeyPair, KeyUsagePurpose,
    PrintableString, RevocationReason, RevokedCertParams, SerialNumber,
};
use time::{Duration, OffsetDateTime};

pub const CRL_URL: &str = "http://crl.test/ca.crl";
pub const ISSUER_URL: &str = "http://ca.test/ca.crt";
pub const OCSP_URL: &str = "http://ocsp.test";

// Mock HTTP transport
mockall::mock! {
    pub Http {}

    impl HttpClient for Http {
        fn get(&self, url: &str) -> RevokeResult<HttpResponse>;
        fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> RevokeResult<HttpResponse>;
    }
}

/// Which revocation sources a test leaf advertises
#[derive(Debug, Clone, Copy, Default)]
pub struct Sources {
    pub crl: bool,
    pub ocsp: bool,
}

/// Self-signed CA able to issue leaves and sign CRLs
pub struct TestCa {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

impl TestCa {
    pub fn new(name: &str) -> Self {
        let mut params = ca_params();
        params.distinguished_name.push(DnType::CommonName, name);

        let key = KeyPair::generate().expect("Failed to generate CA key");
        let cert = params.self_signed(&key).expect("Failed to self-sign CA");
        Self { cert, key }
    }

    /// The same CA re-issued with its common name as a PrintableString
    /// instead of a UTF8String
    pub fn with_printable_name(&self, name: &str) -> Self {
        let mut params = ca_params();
        params.distinguished_name.push(
            DnType::CommonName,
            DnValue::PrintableString(
                PrintableString::try_from(name).expect("Name is not printable"),
            ),
        );

        let key = KeyPair::from_pem(&self.key.serialize_pem()).expect("Failed to copy CA key");
        let cert = params.self_signed(&key).expect("Failed to self-sign CA");
        Self { cert, key }
    }

    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }

    /// Leaf valid around the current time
    pub fn issue_leaf(&self, serial: u64, sources: Sources) -> rcgen::Certificate {
        let mut params = CertificateParams::new(vec!["leaf.test".to_string()])
            .expect("Failed to create leaf params");
        params.distinguished_name.push(DnType::CommonName, "leaf.test");
        params.serial_number = Some(SerialNumber::from(serial));
        let (not_before, not_after) = validity();
        params.not_before = not_before;
        params.not_after = not_after;

        if sources.crl {
            params.crl_distribution_points = vec![CrlDistributionPoint {
                uris: vec![CRL_URL.to_string()],
            }];
        }
        params.custom_extensions = vec![authority_info_access(sources.ocsp)];

        let key = KeyPair::generate().expect("Failed to generate leaf key");
        params
            .signed_by(&key, &self.cert, &self.key)
            .expect("Failed to sign leaf")
    }

    /// CRL revoking `serials` for key compromise
    pub fn crl(&self, serials: &[u64]) -> Vec<u8> {
        let now = OffsetDateTime::now_utc();
        let params = CertificateRevocationListParams {
            this_update: now - Duration::days(1),
            next_update: now + Duration::days(7),
            crl_number: SerialNumber::from(1u64),
            issuing_distribution_point: None,
            revoked_certs: serials
                .iter()
                .map(|serial| RevokedCertParams {
                    serial_number: SerialNumber::from(*serial),
                    revocation_time: now - Duration::hours(1),
                    reason_code: Some(RevocationReason::KeyCompromise),
                    invalidity_date: None,
                })
                .collect(),
            key_identifier_method: KeyIdMethod::Sha256,
        };
        params
            .signed_by(&self.cert, &self.key)
            .expect("Failed to sign CRL")
            .der()
            .to_vec()
    }
}

fn ca_params() -> CertificateParams {
    let mut params =
        CertificateParams::new(Vec::<String>::new()).expect("Failed to create CA params");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let (not_before, not_after) = validity();
    params.not_before = not_before;
    params.not_after = not_after;
    params
}

fn validity() -> (OffsetDateTime, OffsetDateTime) {
    let now = OffsetDateTime::now_utc();
    (now - Duration::days(1), now + Duration::days(365))
}

/// AuthorityInfoAccess with a CA issuers URL and optionally an OCSP responder
fn authority_info_access(ocsp: bool) -> CustomExtension {
    let mut descriptions = Vec::new();
    if ocsp {
        descriptions.extend(access_description(0x01, OCSP_URL));
    }
    descriptions.extend(access_description(0x02, ISSUER_URL));

    CustomExtension::from_oid_content(&[1, 3, 6, 1, 5, 5, 7, 1, 1], tlv(0x30, &descriptions))
}

// id-ad-ocsp is 1.3.6.1.5.5.7.48.1, id-ad-caIssuers is .48.2
fn access_description(method: u8, uri: &str) -> Vec<u8> {
    let mut content = tlv(0x06, &[0x2B, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, method]);
    content.extend(tlv(0x86, uri.as_bytes()));
    tlv(0x30, &content)
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else if len <= 0xFF {
        out.extend([0x81, len as u8]);
    } else {
        out.extend([0x82, (len >> 8) as u8, len as u8]);
    }
    out.extend_from_slice(content);
    out
}

pub fn ok(body: Vec<u8>) -> RevokeResult<HttpResponse> {
    Ok(HttpResponse::new(200, body))
}
