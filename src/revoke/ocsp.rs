use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use super::backend::PkiBackend;
use super::errors::{OcspErrorKind, RevokeError, RevokeResult};
use super::http::{BodyReader, HttpClient};
use super::issuer::IssuerResolver;
use super::types::{Certificate, OcspCertStatus, OcspResponse, Policy, Verdict};

pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// Requests up to this size go out as GET, larger ones as POST
pub const MAX_GET_REQUEST_SIZE: usize = 256;

// Unsigned OCSPResponse carrying only an error responseStatus
const MALFORMED_REQUEST_RESPONSE: &[u8] = &[0x30, 0x03, 0x0A, 0x01, 0x01];
const INTERNAL_ERROR_RESPONSE: &[u8] = &[0x30, 0x03, 0x0A, 0x01, 0x02];
const TRY_LATER_RESPONSE: &[u8] = &[0x30, 0x03, 0x0A, 0x01, 0x03];
const SIG_REQUIRED_RESPONSE: &[u8] = &[0x30, 0x03, 0x0A, 0x01, 0x05];
const UNAUTHORIZED_RESPONSE: &[u8] = &[0x30, 0x03, 0x0A, 0x01, 0x06];

/// Queries the OCSP responders listed in a certificate
pub struct OcspChecker<'a> {
    pub(crate) http: &'a dyn HttpClient,
    pub(crate) backend: &'a dyn PkiBackend,
    pub(crate) reader: &'a BodyReader,
    pub(crate) issuers: &'a IssuerResolver<'a>,
    pub(crate) policy: Policy,
}

impl OcspChecker<'_> {
    /// Revocation status of `cert` according to its OCSP responders.
    ///
    /// Responders are tried in order; the first usable answer decides. Under
    /// a strict policy the first failing responder ends the check.
    pub fn check(&self, cert: &Certificate) -> Verdict {
        if cert.ocsp_servers.is_empty() {
            debug!("OCSP not enabled for serial {}", cert.serial_hex());
            return Verdict::good();
        }

        let Some(issuer) = self.issuers.resolve(cert) else {
            warn!("Cannot build OCSP request without the issuer certificate");
            return Verdict::unchecked(None);
        };

        let request = match self.backend.build_ocsp_request(cert, issuer) {
            Ok(request) => request,
            Err(e) => return Verdict::unchecked(Some(e)),
        };

        let mut last_error = None;
        for server in &cert.ocsp_servers {
            match self.send(server, &request, cert, issuer) {
                Ok(response) => return Self::interpret(server, &response),
                Err(e) if self.policy.is_strict() => {
                    warn!("OCSP responder {} failed: {}", server, e);
                    return Verdict::unchecked(Some(e));
                }
                Err(e) => {
                    if e.is_transport() {
                        warn!("OCSP responder {} unreachable, trying next: {}", server, e);
                    } else {
                        warn!("OCSP responder {} sent an unusable answer, trying next: {}", server, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Verdict::unchecked(last_error)
    }

    fn interpret(server: &str, response: &OcspResponse) -> Verdict {
        match response.status {
            OcspCertStatus::Good => {
                debug!("OCSP responder {} reports good", server);
                Verdict::good()
            }
            status => {
                info!("OCSP responder {} reports {:?}", server, status);
                Verdict::revoked()
            }
        }
    }

    /// Send one request. An error only means no usable answer was obtained.
    fn send(
        &self,
        server: &str,
        request: &[u8],
        leaf: &Certificate,
        issuer: &Certificate,
    ) -> RevokeResult<OcspResponse> {
        let mut response = if request.len() > MAX_GET_REQUEST_SIZE {
            self.http
                .post(server, OCSP_REQUEST_CONTENT_TYPE, request.to_vec())?
        } else {
            self.http.get(&get_url(server, request))?
        };

        if response.status != 200 {
            return Err(RevokeError::HttpStatus {
                url: server.to_string(),
                status: response.status,
            });
        }

        let body = (self.reader)(&mut response.body)?;
        if let Some(kind) = known_error_response(&body) {
            return Err(RevokeError::OcspResponder(kind));
        }

        self.backend.parse_ocsp_response(&body, leaf, issuer)
    }
}

/// GET form of an OCSP request: base64 of the DER, URL-escaped, as a path segment
pub fn get_url(server: &str, request: &[u8]) -> String {
    let encoded = STANDARD.encode(request);
    format!(
        "{}/{}",
        server.trim_end_matches('/'),
        urlencoding::encode(&encoded)
    )
}

fn known_error_response(body: &[u8]) -> Option<OcspErrorKind> {
    match body {
        UNAUTHORIZED_RESPONSE => Some(OcspErrorKind::Unauthorized),
        MALFORMED_REQUEST_RESPONSE => Some(OcspErrorKind::MalformedRequest),
        INTERNAL_ERROR_RESPONSE => Some(OcspErrorKind::InternalError),
        TRY_LATER_RESPONSE => Some(OcspErrorKind::TryLater),
        SIG_REQUIRED_RESPONSE => Some(OcspErrorKind::SignatureRequired),
        _ => None,
    }
}
