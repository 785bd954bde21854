//! Configuration management for Sigil services
//!
//! Values come from built-in defaults overridden by `SIGIL_` prefixed
//! environment variables, with `__` separating nested keys
//! (`SIGIL_KEYSTORE__FORMAT=JCEKS`). A `.env` file is honoured when present.

use config::{Config, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SIGIL";

/// Configuration errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Key store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KeyStoreConfig {
    /// Storage format name (PKCS12, JCEKS, BKS, UBER)
    pub format: String,
    /// Where the key store is persisted
    pub path: PathBuf,
    /// Alias for generated entries
    pub alias: String,
}

/// Certificate defaults used when certifying generated keys
#[derive(Debug, Clone, Deserialize)]
pub struct CertificateConfig {
    /// Issuer distinguished name
    pub issuer: String,
    /// Subject distinguished name, defaults to the issuer (self-signed)
    pub subject: Option<String>,
    /// Validity window in days starting now
    pub validity_days: i64,
    /// Signature algorithm name, e.g. `SHA256withECDSA`
    pub signature_algorithm: String,
}

impl CertificateConfig {
    /// Subject name, falling back to the issuer
    pub fn subject(&self) -> &str {
        self.subject.as_deref().unwrap_or(&self.issuer)
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub keystore: KeyStoreConfig,
    pub certificate: CertificateConfig,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, SettingsError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_environment(Self::environment())
    }

    /// Load configuration from an explicit environment source
    pub fn from_environment(environment: Environment) -> Result<Self, SettingsError> {
        let config: AppConfig = Config::builder()
            .set_default("keystore.format", "PKCS12")?
            .set_default("keystore.path", "./sigil.p12")?
            .set_default("keystore.alias", "sigil")?
            .set_default("certificate.issuer", "CN=Sigil,O=Sigil")?
            .set_default("certificate.validity_days", 365)?
            .set_default("certificate.signature_algorithm", "SHA256withECDSA")?
            .set_default("log_level", "info")?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Environment source with the Sigil prefix and separator
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.keystore.path.as_os_str().is_empty() {
            return Err(SettingsError::Invalid(
                "keystore.path must not be empty".to_string(),
            ));
        }
        if self.keystore.alias.is_empty() {
            return Err(SettingsError::Invalid(
                "keystore.alias must not be empty".to_string(),
            ));
        }
        if self.certificate.validity_days <= 0 {
            return Err(SettingsError::Invalid(format!(
                "certificate.validity_days must be positive, got {}",
                self.certificate.validity_days
            )));
        }
        Ok(())
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
