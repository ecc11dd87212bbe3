use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use url::Url;
use x509_parser::pem::parse_x509_pem;

use super::backend::{PkiBackend, X509Backend};
use super::cache::CrlCache;
use super::crl::CrlChecker;
use super::errors::{RevokeError, RevokeResult};
use super::http::{BodyReader, HttpClient, default_client, read_to_end};
use super::issuer::IssuerResolver;
use super::ocsp::OcspChecker;
use super::types::{Certificate, Policy, Verdict};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("cert-revoke/", env!("CARGO_PKG_VERSION"));

/// Construction-time settings of a [`Verifier`]
#[derive(Clone)]
pub struct VerifierConfig {
    policy: Policy,
    http: Arc<dyn HttpClient>,
    backend: Arc<dyn PkiBackend>,
    certificate_reader: BodyReader,
    crl_reader: BodyReader,
    ocsp_reader: BodyReader,
}

impl VerifierConfig {
    /// Lenient policy, a blocking reqwest client and the x509 backend.
    ///
    /// Returns an error if the HTTP client cannot be initialized
    pub fn new() -> RevokeResult<Self> {
        let client = default_client(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)?;
        Ok(Self::from_client(Arc::new(client)))
    }

    /// Defaults around a caller supplied HTTP client
    pub fn from_client(http: Arc<dyn HttpClient>) -> Self {
        Self {
            policy: Policy::default(),
            http,
            backend: Arc::new(X509Backend),
            certificate_reader: read_to_end(),
            crl_reader: read_to_end(),
            ocsp_reader: read_to_end(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Shorthand for [`Policy::Strict`] or [`Policy::Lenient`]
    pub fn strict(self, strict: bool) -> Self {
        self.with_policy(if strict {
            Policy::Strict
        } else {
            Policy::Lenient
        })
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn PkiBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Reader for issuer certificate bodies
    pub fn with_certificate_reader(mut self, reader: BodyReader) -> Self {
        self.certificate_reader = reader;
        self
    }

    pub fn with_crl_reader(mut self, reader: BodyReader) -> Self {
        self.crl_reader = reader;
        self
    }

    pub fn with_ocsp_reader(mut self, reader: BodyReader) -> Self {
        self.ocsp_reader = reader;
        self
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Revocation verifier owning its CRL cache.
///
/// A `Verifier` is `Sync`; share it between threads to share the cache.
#[derive(Debug)]
pub struct Verifier {
    config: VerifierConfig,
    cache: CrlCache,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            cache: CrlCache::new(),
        }
    }

    /// Returns an error if the HTTP client cannot be initialized
    pub fn with_defaults() -> RevokeResult<Self> {
        Ok(Self::new(VerifierConfig::new()?))
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn cache(&self) -> &CrlCache {
        &self.cache
    }

    /// Check `cert` as of now
    pub fn verify(&self, cert: &Certificate) -> Verdict {
        self.verify_at(cert, OffsetDateTime::now_utc())
    }

    /// Check `cert` as of `now`: validity window first, then each CRL
    /// distribution point in order, then OCSP.
    ///
    /// The first distribution point that fails to check ends the run; under a
    /// strict policy that failure is reported as revoked.
    #[instrument(skip_all, fields(serial = %cert.serial_hex()))]
    pub fn verify_at(&self, cert: &Certificate, now: OffsetDateTime) -> Verdict {
        if let Err(e) = check_validity(cert, now) {
            warn!("{e}");
            return Verdict::invalid(e);
        }

        let policy = self.config.policy;
        let http = self.config.http.as_ref();
        let backend = self.config.backend.as_ref();
        let issuers = IssuerResolver::new(http, backend, &self.config.certificate_reader);

        let crl = CrlChecker {
            http,
            backend,
            reader: &self.config.crl_reader,
            cache: &self.cache,
            issuers: &issuers,
        };
        for url in &cert.crl_distribution_points {
            if !is_supported_url(url) {
                debug!("Skipping unsupported CRL distribution point {}", url);
                continue;
            }

            let verdict = crl.check(cert, url, now);
            if !verdict.checked {
                return Verdict::fail(verdict.error, policy);
            }
            if verdict.revoked {
                info!("Certificate is revoked according to CRL");
                return Verdict::revoked();
            }
        }

        let ocsp = OcspChecker {
            http,
            backend,
            reader: &self.config.ocsp_reader,
            issuers: &issuers,
            policy,
        };
        let verdict = ocsp.check(cert);
        if !verdict.checked {
            return Verdict::fail(verdict.error, policy);
        }
        if verdict.revoked {
            info!("Certificate is revoked according to OCSP");
            return Verdict::revoked();
        }

        debug!("Certificate is not revoked");
        Verdict::good()
    }

    /// Parse a PEM or DER certificate and check it as of now.
    ///
    /// A certificate that cannot be parsed is reported unchecked.
    pub fn verify_bytes(&self, bytes: &[u8]) -> Verdict {
        let parsed = match parse_x509_pem(bytes) {
            Ok((_, pem)) => self.config.backend.parse_certificate(&pem.contents),
            Err(_) => self.config.backend.parse_certificate(bytes),
        };

        match parsed {
            Ok(cert) => self.verify(&cert),
            Err(e) => Verdict::unchecked(Some(e)),
        }
    }
}

/// `now` must fall strictly inside the validity window
fn check_validity(cert: &Certificate, now: OffsetDateTime) -> RevokeResult<()> {
    if now >= cert.not_after {
        return Err(RevokeError::Expired {
            not_after: cert.not_after,
        });
    }
    if now <= cert.not_before {
        return Err(RevokeError::NotYetValid {
            not_before: cert.not_before,
        });
    }
    Ok(())
}

/// LDAP distribution points can't be fetched over HTTP
fn is_supported_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => !matches!(parsed.scheme(), "ldap" | "ldaps"),
        Err(_) => true,
    }
}
