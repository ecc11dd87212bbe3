use std::cell::OnceCell;

use tracing::{debug, warn};
use x509_parser::pem::parse_x509_pem;

use super::backend::PkiBackend;
use super::errors::{RevokeError, RevokeResult};
use super::http::{BodyReader, HttpClient};
use super::types::Certificate;

/// Fetches the certificate that issued a given certificate.
///
/// A resolver lives for a single verification, so the issuer URLs of a
/// certificate are walked at most once no matter how many checks need it.
pub struct IssuerResolver<'a> {
    http: &'a dyn HttpClient,
    backend: &'a dyn PkiBackend,
    reader: &'a BodyReader,
    resolved: OnceCell<Option<Certificate>>,
}

impl<'a> IssuerResolver<'a> {
    pub fn new(http: &'a dyn HttpClient, backend: &'a dyn PkiBackend, reader: &'a BodyReader) -> Self {
        Self {
            http,
            backend,
            reader,
            resolved: OnceCell::new(),
        }
    }

    /// The first issuer certificate that can be fetched and parsed.
    ///
    /// `None` is not an error: it means no issuer URL produced a certificate.
    pub fn resolve(&self, cert: &Certificate) -> Option<&Certificate> {
        self.resolved
            .get_or_init(|| self.resolve_uncached(cert))
            .as_ref()
    }

    fn resolve_uncached(&self, cert: &Certificate) -> Option<Certificate> {
        for url in &cert.issuing_certificate_urls {
            match self.fetch(url) {
                Ok(issuer) => {
                    debug!("Resolved issuer certificate from {}", url);
                    return Some(issuer);
                }
                Err(e) => {
                    warn!("Failed to fetch issuer certificate from {}: {}", url, e);
                }
            }
        }

        debug!(
            "No issuer certificate available for serial {}",
            cert.serial_hex()
        );
        None
    }

    fn fetch(&self, url: &str) -> RevokeResult<Certificate> {
        let mut response = self.http.get(url)?;
        if !response.is_success() {
            return Err(RevokeError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let body = (self.reader)(&mut response.body)?;

        // PEM first, raw DER otherwise
        match parse_x509_pem(&body) {
            Ok((_, pem)) => self.backend.parse_certificate(&pem.contents),
            Err(_) => self.backend.parse_certificate(&body),
        }
    }
}
