use time::OffsetDateTime;
use x509_parser::num_bigint::BigUint;

use super::errors::RevokeError;

/// The parts of an X.509 certificate revocation checking looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The raw certificate in DER format
    pub der: Vec<u8>,
    pub serial: BigUint,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    /// URLs from the CRL Distribution Points extension
    pub crl_distribution_points: Vec<String>,
    /// OCSP responder URLs from Authority Information Access
    pub ocsp_servers: Vec<String>,
    /// caIssuers URLs from Authority Information Access
    pub issuing_certificate_urls: Vec<String>,
}

impl Certificate {
    /// Hex form of the serial number, for logs
    pub fn serial_hex(&self) -> String {
        hex::encode(self.serial.to_bytes_be())
    }
}

/// A single entry of a revocation list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedEntry {
    pub serial: BigUint,
    pub revocation_time: OffsetDateTime,
    /// CRLReason code, if the entry carries one
    pub reason: Option<u8>,
}

/// A parsed Certificate Revocation List
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationList {
    /// The raw CRL data in DER format
    pub der: Vec<u8>,
    /// Distribution point URL this CRL was fetched from
    pub distribution_point: String,
    pub issuer: String,
    pub this_update: OffsetDateTime,
    pub next_update: Option<OffsetDateTime>,
    pub revoked: Vec<RevokedEntry>,
}

impl RevocationList {
    /// A list is fresh only while `now` precedes its next update.
    /// Lists without a next update are never fresh.
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.next_update.is_some_and(|next| now < next)
    }

    /// Find the entry revoking `serial`, if any
    pub fn find(&self, serial: &BigUint) -> Option<&RevokedEntry> {
        self.revoked.iter().find(|entry| &entry.serial == serial)
    }
}

/// Certificate status reported by an OCSP responder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcspCertStatus {
    Good,
    Revoked,
    Unknown,
}

/// A parsed OCSP response for one certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspResponse {
    pub status: OcspCertStatus,
    pub next_update: Option<OffsetDateTime>,
}

/// How a failure to complete a check is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// A failed check is reported as revoked (fail closed)
    Strict,
    /// A failed check is reported as unchecked (fail open)
    #[default]
    Lenient,
}

impl Policy {
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

/// Outcome of a revocation check.
///
/// `checked == false` means the result is not authoritative: callers must
/// not read `revoked == false` as "not revoked" unless `checked` is set.
#[derive(Debug)]
pub struct Verdict {
    pub revoked: bool,
    pub checked: bool,
    pub error: Option<RevokeError>,
}

impl Verdict {
    /// Checked and not revoked
    pub fn good() -> Self {
        Self {
            revoked: false,
            checked: true,
            error: None,
        }
    }

    /// Checked and revoked
    pub fn revoked() -> Self {
        Self {
            revoked: true,
            checked: true,
            error: None,
        }
    }

    /// Certificate outside its validity window
    pub fn invalid(error: RevokeError) -> Self {
        Self {
            revoked: true,
            checked: true,
            error: Some(error),
        }
    }

    /// The check could not be completed
    pub fn unchecked(error: Option<RevokeError>) -> Self {
        Self {
            revoked: false,
            checked: false,
            error,
        }
    }

    /// Apply the failure policy to an unchecked result
    pub(crate) fn fail(error: Option<RevokeError>, policy: Policy) -> Self {
        Self {
            revoked: policy.is_strict(),
            checked: false,
            error,
        }
    }

    /// True only when the check succeeded and found no revocation
    pub fn is_trusted(&self) -> bool {
        self.checked && !self.revoked
    }

    /// The `(revoked, checked)` pair without the error
    pub fn into_parts(self) -> (bool, bool) {
        (self.revoked, self.checked)
    }
}
