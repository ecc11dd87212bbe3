use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

static INIT: OnceLock<()> = OnceLock::new();

pub const DEFAULT_DIRECTIVES: &str = "warn,cert_revoke=info";
pub const VERBOSE_DIRECTIVES: &str = "info,cert_revoke=debug";

/// Log to stderr, keeping stdout for the verdict.
///
/// `RUST_LOG` takes precedence over `default_directives`. Only the first call
/// installs a subscriber.
pub fn init_tracing(default_directives: &str) {
    let _ = INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives));
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init();
    });
}
