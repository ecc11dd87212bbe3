use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::backend::PkiBackend;
use super::cache::{CacheLookup, CrlCache};
use super::errors::{RevokeError, RevokeResult};
use super::http::{BodyReader, HttpClient};
use super::issuer::IssuerResolver;
use super::types::{Certificate, RevocationList, Verdict};

/// Checks a certificate against the CRL at one distribution point
pub struct CrlChecker<'a> {
    pub(crate) http: &'a dyn HttpClient,
    pub(crate) backend: &'a dyn PkiBackend,
    pub(crate) reader: &'a BodyReader,
    pub(crate) cache: &'a CrlCache,
    pub(crate) issuers: &'a IssuerResolver<'a>,
}

impl CrlChecker<'_> {
    /// Revocation status of `cert` according to the CRL at `url`.
    ///
    /// A fresh cached list is used without touching the network. Otherwise the
    /// list is fetched, its signature checked when the issuer is known, and
    /// the cache refreshed. Any failure yields an unchecked verdict.
    pub fn check(&self, cert: &Certificate, url: &str, now: OffsetDateTime) -> Verdict {
        let crl = match self.cache.lookup(url, now) {
            CacheLookup::Fresh(crl) => {
                debug!("Using cached CRL from {}", url);
                crl
            }
            CacheLookup::Stale(_) | CacheLookup::Miss => match self.refresh(cert, url) {
                Ok(crl) => crl,
                Err(e) if e.is_transport() => {
                    warn!("CRL distribution point {} unreachable: {}", url, e);
                    return Verdict::unchecked(Some(e));
                }
                Err(e) => {
                    warn!("CRL from {} rejected: {}", url, e);
                    return Verdict::unchecked(Some(e));
                }
            },
        };

        match crl.find(&cert.serial) {
            Some(entry) => {
                info!(
                    "Certificate with serial {} is revoked by {} (reason: {:?})",
                    cert.serial_hex(),
                    url,
                    entry.reason
                );
                Verdict::revoked()
            }
            None => {
                debug!("Certificate not found in CRL from {}", url);
                Verdict::good()
            }
        }
    }

    fn refresh(&self, cert: &Certificate, url: &str) -> RevokeResult<Arc<RevocationList>> {
        let crl = self.fetch(url)?;

        match self.issuers.resolve(cert) {
            Some(issuer) => self.backend.verify_crl_signature(&crl, issuer)?,
            None => warn!(
                "Issuer unavailable, accepting CRL from {} without signature check",
                url
            ),
        }

        let crl = Arc::new(crl);
        self.cache.insert(url, Arc::clone(&crl));

        info!("Successfully fetched and cached CRL from {}", url);
        Ok(crl)
    }

    fn fetch(&self, url: &str) -> RevokeResult<RevocationList> {
        info!("Fetching CRL from: {}", url);

        let mut response = self.http.get(url)?;
        if !response.is_success() {
            return Err(RevokeError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let body = (self.reader)(&mut response.body)?;
        self.backend.parse_crl(&body, url)
    }
}
