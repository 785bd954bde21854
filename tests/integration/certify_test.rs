//! Integration Tests for the Certify Flow
//!
//! Configuration drives key generation, self-signing and storage, then the
//! stored certificate is read back from disk.

use sigil_config::AppConfig;
use sigil_keys::{
    DistinguishedName, KdfParams, KeyEntry, KeyManager, KeySigner, Password, ProviderBinding,
    SignatureAlgorithm, SigningConfig, SigningKey, SoftwareProvider, StorageFormat,
    ValidityPeriod, X509KeySigner,
};
use std::sync::Arc;
use tempfile::TempDir;
use x509_parser::prelude::*;

fn config_for(dir: &TempDir) -> AppConfig {
    let path = dir.path().join("certify.jceks");
    let vars: config::Map<String, String> = [
        ("SIGIL_KEYSTORE__FORMAT", "jceks".to_string()),
        ("SIGIL_KEYSTORE__PATH", path.display().to_string()),
        ("SIGIL_KEYSTORE__ALIAS", "gateway".to_string()),
        ("SIGIL_CERTIFICATE__ISSUER", "CN=Gateway CA,O=Sigil".to_string()),
        ("SIGIL_CERTIFICATE__SUBJECT", "CN=gateway,O=Sigil".to_string()),
        ("SIGIL_CERTIFICATE__VALIDITY_DAYS", "30".to_string()),
        ("SIGIL_CERTIFICATE__SIGNATURE_ALGORITHM", "Ed25519".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    AppConfig::from_environment(AppConfig::environment().source(Some(vars))).unwrap()
}

fn manager(format: StorageFormat) -> KeyManager {
    let provider = SoftwareProvider::default().with_kdf(KdfParams::new(64, 1, 1));
    KeyManager::new(ProviderBinding::new(format, Arc::new(provider)).unwrap())
}

#[test]
fn test_certify_and_store() {
    sigil_logging::init_console_logging("certify-test", "debug");

    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let format: StorageFormat = config.keystore.format.parse().unwrap();
    let algorithm: SignatureAlgorithm = config.certificate.signature_algorithm.parse().unwrap();
    assert_eq!(format, StorageFormat::Jceks);
    assert_eq!(algorithm, SignatureAlgorithm::Ed25519);

    let key_pair = SigningKey::generate(algorithm).unwrap();
    let mut signing = SigningConfig::self_signed(
        DistinguishedName::new(config.certificate.subject()),
        ValidityPeriod::days_from_now(config.certificate.validity_days),
        &key_pair,
    );
    signing.issuer = DistinguishedName::new(config.certificate.issuer.as_str());
    let certificate = X509KeySigner::new().sign_public_key(&signing).unwrap();

    let mut writer = manager(format);
    writer
        .add(
            &config.keystore.alias,
            KeyEntry::private_key(key_pair.pkcs8_der.to_vec(), vec![certificate.der.clone()]),
            &mut Password::from("entry"),
        )
        .unwrap();
    writer
        .save(&config.keystore.path, &mut Password::from("store"))
        .unwrap();

    let mut reader = manager(format);
    reader
        .load(&config.keystore.path, &mut Password::from("store"))
        .unwrap();
    let entry = reader
        .get("gateway", &mut Password::from("entry"))
        .unwrap()
        .unwrap();

    let stored = entry.certificate().expect("private key entries carry a chain");
    assert_eq!(stored, &certificate.der[..]);

    let (_, cert) = parse_x509_certificate(stored).unwrap();
    assert_eq!(cert.public_key().raw, &key_pair.public_key[..]);
    assert_eq!(
        cert.validity().not_after.timestamp() - cert.validity().not_before.timestamp(),
        30 * 24 * 60 * 60
    );
}
