pub mod config;
pub mod revoke;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_utils;

pub use revoke::{Certificate, Policy, Verdict, Verifier, VerifierConfig};
