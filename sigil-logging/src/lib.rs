//! Structured logging setup for Sigil services
//!
//! Security relevant events are grouped under a small log hierarchy rooted at
//! `Security`. Each [`SecurityLog`] category maps onto a `tracing` target so
//! that `RUST_LOG=security::keystore=debug` style filters work as expected.

use std::fmt;
use tracing_subscriber::{
    fmt as fmt_layer,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Root target for all security events
pub const SECURITY_TARGET: &str = "security";
/// Target for configuration problems (unavailable providers, bad bindings)
pub const CONFIGURATION_TARGET: &str = "security::configuration";
/// Target for key store lifecycle events
pub const KEYSTORE_TARGET: &str = "security::keystore";
/// Target for certificate signing events
pub const SIGNING_TARGET: &str = "security::signing";

/// Security log categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityLog {
    /// Root security log
    Default,
    /// Configuration errors and warnings
    Configuration,
    /// Key store add/load/save
    KeyStore,
    /// Certificate signing
    Signing,
}

impl SecurityLog {
    /// Dotted hierarchy name, e.g. `Security.Configuration`
    pub fn canonical_name(&self) -> &'static str {
        match self {
            SecurityLog::Default => "Security",
            SecurityLog::Configuration => "Security.Configuration",
            SecurityLog::KeyStore => "Security.KeyStore",
            SecurityLog::Signing => "Security.Signing",
        }
    }

    /// `tracing` target used when emitting events for this category
    pub fn target(&self) -> &'static str {
        match self {
            SecurityLog::Default => SECURITY_TARGET,
            SecurityLog::Configuration => CONFIGURATION_TARGET,
            SecurityLog::KeyStore => KEYSTORE_TARGET,
            SecurityLog::Signing => SIGNING_TARGET,
        }
    }
}

impl fmt::Display for SecurityLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize structured logging for Sigil services
///
/// This sets up:
/// - JSON formatted logs (for production)
/// - Environment-based log level filtering
/// - Service name tagging
///
/// Calling it a second time in the same process is a no-op.
pub fn init_logging(service_name: &str, default_level: &str) {
    let initialized = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            fmt_layer::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(false)
                .with_span_list(false),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!(
            target: SECURITY_TARGET,
            service = service_name,
            log = %SecurityLog::Default,
            "Logging initialized"
        );
    }
}

/// Initialize simple console logging (for development)
///
/// This sets up:
/// - Human-readable formatted logs
/// - Environment-based log level filtering
pub fn init_console_logging(service_name: &str, default_level: &str) {
    let initialized = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!(
            target: SECURITY_TARGET,
            service = service_name,
            "Console logging initialized"
        );
    }
}
