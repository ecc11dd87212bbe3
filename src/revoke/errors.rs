use openssl::error::ErrorStack;
use thiserror::Error;
use time::OffsetDateTime;

/// Error responses an OCSP responder may send in place of a signed answer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcspErrorKind {
    #[error("malformed request")]
    MalformedRequest,

    #[error("internal error")]
    InternalError,

    #[error("try later")]
    TryLater,

    #[error("signature required")]
    SignatureRequired,

    #[error("unauthorized")]
    Unauthorized,
}

/// Revocation checking errors
#[derive(Error, Debug)]
pub enum RevokeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error {status}: failed to retrieve {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to read response body: {0}")]
    Io(#[from] std::io::Error),

    #[error("Certificate parsing failed: {0}")]
    CertificateParse(String),

    #[error("CRL parsing failed: {0}")]
    CrlParse(String),

    #[error("OCSP response parsing failed: {0}")]
    OcspParse(String),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),

    #[error("CRL signature verification failed")]
    SignatureVerification,

    #[error("CRL issuer does not match issuer certificate subject")]
    IssuerMismatch,

    #[error("Issuer not authorized for CRL signing")]
    IssuerNotCrlSigner,

    #[error("OCSP responder error: {0}")]
    OcspResponder(OcspErrorKind),

    #[error("Certificate expired {not_after}")]
    Expired { not_after: OffsetDateTime },

    #[error("Certificate isn't valid until {not_before}")]
    NotYetValid { not_before: OffsetDateTime },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl RevokeError {
    /// Whether the error came from the network rather than from the data
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Transport(_)
                | Self::HttpStatus { .. }
                | Self::Io(_)
                | Self::OcspResponder(_)
        )
    }
}

/// Convenient Result type alias
pub type RevokeResult<T> = Result<T, RevokeError>;
