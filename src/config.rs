use std::{collections::HashMap, sync::Arc, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::revoke::{
    DEFAULT_USER_AGENT, RevokeResult, VerifierConfig,
    http::{default_client, limited},
};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Treat incomplete checks as revoked
    pub strict: bool,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub max_certificate_bytes: u64,
    pub max_crl_bytes: u64,
    pub max_ocsp_bytes: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("strict", false)?
            .set_default("http_timeout_secs", 30)?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("max_certificate_bytes", MIB)?
            .set_default("max_crl_bytes", 64 * MIB)?
            .set_default("max_ocsp_bytes", MIB)?
            .add_source(File::with_name("config/revoke").required(false));

        // Explicit overrides keep tests independent of the process environment
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. REVOKE_STRICT=true or REVOKE_MAX_CRL_BYTES=1048576
            builder = builder.add_source(
                Environment::with_prefix("REVOKE")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Verifier configuration with a size-limited reader per body kind.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn verifier_config(&self) -> RevokeResult<VerifierConfig> {
        let client = default_client(self.http_timeout(), &self.user_agent)?;
        Ok(VerifierConfig::from_client(Arc::new(client))
            .strict(self.strict)
            .with_certificate_reader(limited(self.max_certificate_bytes))
            .with_crl_reader(limited(self.max_crl_bytes))
            .with_ocsp_reader(limited(self.max_ocsp_bytes)))
    }
}
