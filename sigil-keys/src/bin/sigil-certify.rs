//! Sigil Certify
//!
//! Generates a key pair, issues a self-signed certificate for it and stores
//! both as a private key entry in the configured key store.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use anyhow::Context;
use sigil_config::AppConfig;
use sigil_keys::{
    DistinguishedName, KeyEntry, KeyManager, KeySigner, Password, SignatureAlgorithm,
    SigningConfig, SigningKey, StorageFormat, ValidityPeriod, X509KeySigner,
};
use sigil_logging::init_console_logging;
use tracing::info;
use zeroize::Zeroizing;

const STORE_PASSWORD_VAR: &str = "SIGIL_KEYSTORE_PASSWORD";
const ENTRY_PASSWORD_VAR: &str = "SIGIL_ENTRY_PASSWORD";

/// Store and entry passwords. Entry protection falls back to the store password.
fn passwords(
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<(Zeroizing<String>, Zeroizing<String>)> {
    let store_password = lookup(STORE_PASSWORD_VAR)
        .filter(|p| !p.is_empty())
        .map(Zeroizing::new)
        .with_context(|| format!("{} must be set", STORE_PASSWORD_VAR))?;
    let entry_password = lookup(ENTRY_PASSWORD_VAR)
        .filter(|p| !p.is_empty())
        .map(Zeroizing::new)
        .unwrap_or_else(|| store_password.clone());
    Ok((store_password, entry_password))
}

fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_console_logging("sigil-certify", config.log_level());

    let format: StorageFormat = config
        .keystore
        .format
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let algorithm: SignatureAlgorithm = config
        .certificate
        .signature_algorithm
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let (store_password, entry_password) = passwords(|var| std::env::var(var).ok())?;

    let mut manager = KeyManager::with_format(format)?;
    let path = config.keystore.path.as_path();
    if path.exists() {
        manager
            .load(path, &mut Password::from(store_password.as_str()))
            .with_context(|| format!("Failed to open key store {}", path.display()))?;
        info!(entries = manager.len(), "Opened existing key store");
    }

    // Issue the certificate
    let key_pair = SigningKey::generate(algorithm)?;
    let subject = DistinguishedName::new(config.certificate.subject());
    let mut signing = SigningConfig::self_signed(
        subject,
        ValidityPeriod::days_from_now(config.certificate.validity_days),
        &key_pair,
    );
    signing.issuer = DistinguishedName::new(config.certificate.issuer.as_str());
    let certificate = X509KeySigner::new().sign_public_key(&signing)?;

    let entry = KeyEntry::private_key(key_pair.pkcs8_der.to_vec(), vec![certificate.der.clone()]);
    manager.add(
        &config.keystore.alias,
        entry,
        &mut Password::from(entry_password.as_str()),
    )?;
    manager.save(path, &mut Password::from(store_password.as_str()))?;

    info!(
        alias = %config.keystore.alias,
        format = %format,
        path = %path.display(),
        "Stored certificate"
    );
    println!("serial:      {}", certificate.serial);
    println!("subject:     {}", certificate.subject);
    println!("issuer:      {}", certificate.issuer);
    println!("not after:   {}", certificate.not_after);
    println!("fingerprint: {}", certificate.fingerprint);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_password_falls_back_to_store_password() {
        let (store, entry) = passwords(|var| {
            (var == STORE_PASSWORD_VAR).then(|| "store-secret".to_string())
        })
        .unwrap();
        assert_eq!(store.as_str(), "store-secret");
        assert_eq!(entry.as_str(), "store-secret");
    }

    #[test]
    fn test_separate_entry_password() {
        let (store, entry) = passwords(|var| match var {
            STORE_PASSWORD_VAR => Some("store-secret".to_string()),
            ENTRY_PASSWORD_VAR => Some("entry-secret".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(store.as_str(), "store-secret");
        assert_eq!(entry.as_str(), "entry-secret");
    }

    #[test]
    fn test_missing_store_password() {
        assert!(passwords(|_| None).is_err());
        assert!(passwords(|_| Some(String::new())).is_err());
    }
}
