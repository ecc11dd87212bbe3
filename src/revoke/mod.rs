//! Certificate revocation checking
//!
//! A certificate is checked in three stages, stopping at the first conclusive one:
//! - its validity window against the current time
//! - the CRLs at each of its distribution points, cached per URL until their next update
//! - its OCSP responders
//!
//! Failures to complete a check are reported according to the configured [`Policy`].

mod backend;
mod cache;
mod crl;
mod errors;
pub mod http;
mod issuer;
mod ocsp;
mod types;
mod verifier;

// Re-export public types
pub use backend::{PkiBackend, X509Backend};
pub use cache::{CacheLookup, CrlCache};
pub use crl::CrlChecker;
pub use errors::{OcspErrorKind, RevokeError, RevokeResult};
pub use http::{BodyReader, HttpClient, HttpResponse};
pub use issuer::IssuerResolver;
pub use ocsp::{MAX_GET_REQUEST_SIZE, OCSP_REQUEST_CONTENT_TYPE, OcspChecker};
pub use types::{
    Certificate, OcspCertStatus, OcspResponse, Policy, RevocationList, RevokedEntry, Verdict,
};
pub use verifier::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, Verifier, VerifierConfig};
pub use x509_parser::num_bigint::BigUint;
