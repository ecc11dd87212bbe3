//! Parsing and signature primitives behind the revocation checks

use openssl::hash::MessageDigest;
use openssl::ocsp::{
    OcspCertId, OcspCertStatus as OpensslCertStatus, OcspFlag, OcspRequest,
    OcspResponse as OpensslOcspResponse, OcspResponseStatus,
};
use openssl::stack::Stack;
use openssl::x509::X509;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::verify::X509VerifyFlags;
use ::time::PrimitiveDateTime;
use ::time::macros::format_description;
use tracing::debug;
use x509_parser::oid_registry::{
    OID_PKIX_ACCESS_DESCRIPTOR_CA_ISSUERS, OID_PKIX_ACCESS_DESCRIPTOR_OCSP,
};
use x509_parser::prelude::*;

use super::errors::{OcspErrorKind, RevokeError, RevokeResult};
use super::types::{
    Certificate, OcspCertStatus, OcspResponse, RevocationList, RevokedEntry,
};

/// Certificate, CRL and OCSP codecs plus CRL signature verification
pub trait PkiBackend: Send + Sync {
    fn parse_certificate(&self, der: &[u8]) -> RevokeResult<Certificate>;

    fn parse_crl(&self, der: &[u8], distribution_point: &str) -> RevokeResult<RevocationList>;

    fn verify_crl_signature(&self, crl: &RevocationList, issuer: &Certificate) -> RevokeResult<()>;

    fn build_ocsp_request(&self, leaf: &Certificate, issuer: &Certificate) -> RevokeResult<Vec<u8>>;

    fn parse_ocsp_response(
        &self,
        body: &[u8],
        leaf: &Certificate,
        issuer: &Certificate,
    ) -> RevokeResult<OcspResponse>;
}

/// Default backend: x509-parser for certificates and CRLs, OpenSSL for OCSP
#[derive(Debug, Clone, Copy, Default)]
pub struct X509Backend;

impl PkiBackend for X509Backend {
    fn parse_certificate(&self, der: &[u8]) -> RevokeResult<Certificate> {
        Certificate::from_der(der)
    }

    fn parse_crl(&self, der: &[u8], distribution_point: &str) -> RevokeResult<RevocationList> {
        RevocationList::from_der(der, distribution_point)
    }

    fn verify_crl_signature(&self, crl: &RevocationList, issuer: &Certificate) -> RevokeResult<()> {
        let (_, parsed) = CertificateRevocationList::from_der(&crl.der)
            .map_err(|e| RevokeError::CrlParse(e.to_string()))?;
        let (_, issuer_cert) = X509Certificate::from_der(&issuer.der)
            .map_err(|e| RevokeError::CertificateParse(e.to_string()))?;

        // Compared in string form so differing ASN.1 string types still match
        let subject = issuer_cert.tbs_certificate.subject.to_string();
        let crl_issuer = parsed.tbs_cert_list.issuer.to_string();
        if subject != crl_issuer {
            debug!(
                "CRL issuer {:?} does not match certificate subject {:?}",
                crl_issuer, subject
            );
            return Err(RevokeError::IssuerMismatch);
        }

        // An issuer without KeyUsage may sign anything
        for ext in issuer_cert.tbs_certificate.extensions() {
            if let ParsedExtension::KeyUsage(ku) = ext.parsed_extension()
                && !ku.crl_sign()
            {
                return Err(RevokeError::IssuerNotCrlSigner);
            }
        }

        x509_parser::verify::verify_signature(
            &issuer_cert.tbs_certificate.subject_pki,
            &parsed.signature_algorithm,
            &parsed.signature_value,
            parsed.tbs_cert_list.as_ref(),
        )
        .map_err(|e| {
            debug!("CRL signature verification failed: {:?}", e);
            RevokeError::SignatureVerification
        })
    }

    fn build_ocsp_request(&self, leaf: &Certificate, issuer: &Certificate) -> RevokeResult<Vec<u8>> {
        let subject = X509::from_der(&leaf.der)?;
        let issuer = X509::from_der(&issuer.der)?;

        let id = OcspCertId::from_cert(MessageDigest::sha1(), &subject, &issuer)?;
        let mut request = OcspRequest::new()?;
        request.add_id(id)?;
        Ok(request.to_der()?)
    }

    fn parse_ocsp_response(
        &self,
        body: &[u8],
        leaf: &Certificate,
        issuer: &Certificate,
    ) -> RevokeResult<OcspResponse> {
        let response = OpensslOcspResponse::from_der(body)
            .map_err(|e| RevokeError::OcspParse(e.to_string()))?;

        let status = response.status();
        if status != OcspResponseStatus::SUCCESSFUL {
            return Err(match responder_error(status) {
                Some(kind) => RevokeError::OcspResponder(kind),
                None => RevokeError::OcspParse(format!(
                    "unexpected response status {}",
                    status.as_raw()
                )),
            });
        }

        let basic = response
            .basic()
            .map_err(|e| RevokeError::OcspParse(e.to_string()))?;

        let subject = X509::from_der(&leaf.der)?;
        let issuer = X509::from_der(&issuer.der)?;

        // Signed by the issuer itself or by a responder it delegated to
        let mut certs = Stack::new()?;
        certs.push(issuer.clone())?;
        let mut store = X509StoreBuilder::new()?;
        store.add_cert(issuer.clone())?;
        store.set_flags(X509VerifyFlags::PARTIAL_CHAIN)?;
        let store = store.build();
        basic
            .verify(&certs, &store, OcspFlag::TRUST_OTHER)
            .map_err(|e| RevokeError::OcspParse(format!("bad response signature: {e}")))?;

        let id = OcspCertId::from_cert(MessageDigest::sha1(), &subject, &issuer)?;
        let single = basic.find_status(&id).ok_or_else(|| {
            RevokeError::OcspParse("response does not cover the certificate".to_string())
        })?;

        let status = match single.status {
            OpensslCertStatus::GOOD => OcspCertStatus::Good,
            OpensslCertStatus::REVOKED => OcspCertStatus::Revoked,
            _ => OcspCertStatus::Unknown,
        };
        let next_update = single
            .next_update()
            .and_then(|t| parse_openssl_time(&t.to_string()));

        Ok(OcspResponse {
            status,
            next_update,
        })
    }
}

fn responder_error(status: OcspResponseStatus) -> Option<OcspErrorKind> {
    match status {
        OcspResponseStatus::MALFORMED_REQUEST => Some(OcspErrorKind::MalformedRequest),
        OcspResponseStatus::INTERNAL_ERROR => Some(OcspErrorKind::InternalError),
        OcspResponseStatus::TRY_LATER => Some(OcspErrorKind::TryLater),
        OcspResponseStatus::SIG_REQUIRED => Some(OcspErrorKind::SignatureRequired),
        OcspResponseStatus::UNAUTHORIZED => Some(OcspErrorKind::Unauthorized),
        _ => None,
    }
}

/// Parse OpenSSL's printed time form, e.g. `Jun  1 00:00:00 2024 GMT`
fn parse_openssl_time(text: &str) -> Option<::time::OffsetDateTime> {
    let format = format_description!(
        "[month repr:short] [day padding:space] [hour]:[minute]:[second] [year] GMT"
    );
    match PrimitiveDateTime::parse(text, format) {
        Ok(dt) => Some(dt.assume_utc()),
        Err(e) => {
            debug!("Ignoring unparsable OCSP next update {:?}: {}", text, e);
            None
        }
    }
}

impl Certificate {
    /// Parse a DER encoded X.509 certificate
    pub fn from_der(der: &[u8]) -> RevokeResult<Self> {
        let (remaining, cert) = X509Certificate::from_der(der)
            .map_err(|e| RevokeError::CertificateParse(e.to_string()))?;

        if !remaining.is_empty() {
            return Err(RevokeError::CertificateParse(
                "Certificate contains unparsed data after DER".to_string(),
            ));
        }

        let mut crl_distribution_points = Vec::new();
        let mut ocsp_servers = Vec::new();
        let mut issuing_certificate_urls = Vec::new();

        for ext in cert.tbs_certificate.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::CRLDistributionPoints(dps) => {
                    for point in dps.points.iter() {
                        let Some(DistributionPointName::FullName(names)) =
                            &point.distribution_point
                        else {
                            continue;
                        };
                        for name in names {
                            if let GeneralName::URI(uri) = name {
                                crl_distribution_points.push(uri.to_string());
                            }
                        }
                    }
                }
                ParsedExtension::AuthorityInfoAccess(aia) => {
                    for desc in &aia.accessdescs {
                        let GeneralName::URI(uri) = &desc.access_location else {
                            continue;
                        };
                        if desc.access_method == OID_PKIX_ACCESS_DESCRIPTOR_OCSP {
                            ocsp_servers.push(uri.to_string());
                        } else if desc.access_method == OID_PKIX_ACCESS_DESCRIPTOR_CA_ISSUERS {
                            issuing_certificate_urls.push(uri.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        let validity = cert.tbs_certificate.validity();
        Ok(Self {
            der: der.to_vec(),
            serial: cert.tbs_certificate.serial.clone(),
            not_before: validity.not_before.to_datetime(),
            not_after: validity.not_after.to_datetime(),
            crl_distribution_points,
            ocsp_servers,
            issuing_certificate_urls,
        })
    }
}

impl RevocationList {
    /// Parse a DER encoded CRL fetched from `distribution_point`
    pub fn from_der(der: &[u8], distribution_point: &str) -> RevokeResult<Self> {
        let (_, crl) = CertificateRevocationList::from_der(der)
            .map_err(|e| RevokeError::CrlParse(e.to_string()))?;

        let revoked = crl
            .iter_revoked_certificates()
            .map(|entry| RevokedEntry {
                serial: entry.user_certificate.clone(),
                revocation_time: entry.revocation_date.to_datetime(),
                reason: entry.reason_code().map(|(_, code)| code.0),
            })
            .collect();

        Ok(Self {
            der: der.to_vec(),
            distribution_point: distribution_point.to_string(),
            issuer: crl.tbs_cert_list.issuer.to_string(),
            this_update: crl.tbs_cert_list.this_update.to_datetime(),
            next_update: crl.tbs_cert_list.next_update.map(|t| t.to_datetime()),
            revoked,
        })
    }
}
