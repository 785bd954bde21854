//! Integration Tests for Key Store Persistence
//!
//! Exercise the key manager against real files in a temporary directory.

use proptest::prelude::*;
use sigil_keys::{
    ConfigurationError, EntryKind, KdfParams, KeyEntry, KeyManager, ManagerError, Password,
    ProviderBinding, SoftwareProvider, StorageFormat,
};
use std::sync::Arc;
use tempfile::TempDir;

fn fast_provider(formats: impl IntoIterator<Item = StorageFormat>) -> Arc<SoftwareProvider> {
    Arc::new(SoftwareProvider::with_formats(formats).with_kdf(KdfParams::new(64, 1, 1)))
}

fn manager(format: StorageFormat) -> KeyManager {
    let binding = ProviderBinding::new(format, fast_provider(StorageFormat::ALL))
        .expect("software provider implements every format");
    KeyManager::new(binding)
}

#[test]
fn test_jceks_secret_key_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.jceks");

    let mut manager = manager(StorageFormat::Jceks);
    let mut protection = Password::from("b");
    manager
        .add("a", KeyEntry::secret_key("AES", vec![0x61]), &mut protection)
        .unwrap();
    assert!(protection.is_zeroed());

    let mut store_password = Password::from("foo");
    manager.save(&path, &mut store_password).unwrap();
    assert!(store_password.is_zeroed());

    let mut reopened = self::manager(StorageFormat::Jceks);
    reopened.load(&path, &mut Password::from("foo")).unwrap();
    assert!(reopened.contains_alias("a"));

    let entry = reopened
        .get("a", &mut Password::from("b"))
        .unwrap()
        .expect("entry survives a save and load");
    assert_eq!(entry.secret_key_bytes(), Some(&[0x61][..]));
    assert_eq!(reopened.entry_info("a").unwrap().kind, EntryKind::SecretKey);
}

#[test]
fn test_jceks_reload_with_wrong_password() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.jceks");

    let mut manager = manager(StorageFormat::Jceks);
    manager
        .add("test", KeyEntry::secret_key("AES", vec![0x61]), &mut Password::from("b"))
        .unwrap();
    manager.save(&path, &mut Password::from("foo")).unwrap();

    let mut wrong = Password::from("wrong");
    let result = manager.load(&path, &mut wrong);
    assert!(matches!(result, Err(ManagerError::Load { .. })));
    assert!(wrong.is_zeroed());

    assert_eq!(manager.aliases(), vec!["test".to_string()]);
    let entry = manager
        .get("test", &mut Password::from("b"))
        .unwrap()
        .expect("store left intact");
    assert_eq!(entry.secret_key_bytes(), Some(&[0x61][..]));
}

#[test]
fn test_wrong_password_keeps_current_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.p12");

    let mut writer = manager(StorageFormat::Pkcs12);
    writer
        .add("cert", KeyEntry::trusted_certificate(vec![1, 2, 3]), &mut Password::from(""))
        .unwrap();
    writer.save(&path, &mut Password::from("secret")).unwrap();

    let mut reader = manager(StorageFormat::Pkcs12);
    reader
        .add("existing", KeyEntry::trusted_certificate(vec![9]), &mut Password::from(""))
        .unwrap();

    let mut wrong = Password::from("wrong");
    let result = reader.load(&path, &mut wrong);
    assert!(matches!(result, Err(ManagerError::Load { .. })));
    assert!(wrong.is_zeroed());
    assert_eq!(reader.aliases(), vec!["existing".to_string()]);
}

#[test]
fn test_corrupted_file_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.p12");

    let mut writer = manager(StorageFormat::Pkcs12);
    writer
        .add("cert", KeyEntry::trusted_certificate(vec![1, 2, 3]), &mut Password::from(""))
        .unwrap();
    writer.save(&path, &mut Password::from("secret")).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes.truncate(middle);
    std::fs::write(&path, &bytes).unwrap();

    let mut reader = manager(StorageFormat::Pkcs12);
    let result = reader.load(&path, &mut Password::from("secret"));
    assert!(matches!(result, Err(ManagerError::Load { .. })));
    assert!(reader.is_empty());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut password = Password::from("secret");
    let result = manager(StorageFormat::Jceks).load(dir.path().join("absent.jceks"), &mut password);
    assert!(matches!(result, Err(ManagerError::Io { .. })));
    assert!(password.is_zeroed());
}

#[test]
fn test_store_saved_in_one_format_is_rejected_by_another() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.bks");

    let mut writer = manager(StorageFormat::Bks);
    writer
        .add("cert", KeyEntry::trusted_certificate(vec![7]), &mut Password::from(""))
        .unwrap();
    writer.save(&path, &mut Password::from("secret")).unwrap();

    let result = manager(StorageFormat::Uber).load(&path, &mut Password::from("secret"));
    assert!(matches!(result, Err(ManagerError::Load { .. })));
}

#[test]
fn test_unavailable_format_is_configuration_error() {
    let provider = fast_provider([StorageFormat::Pkcs12, StorageFormat::Jceks]);
    let result = ProviderBinding::new(StorageFormat::Bks, provider);
    match result {
        Err(ConfigurationError::UnsupportedFormat { format, .. }) => {
            assert_eq!(format, StorageFormat::Bks)
        }
        other => panic!("expected unsupported format, got {:?}", other),
    }
}

#[test]
fn test_pkcs12_rejects_secret_keys() {
    let mut manager = manager(StorageFormat::Pkcs12);
    let mut protection = Password::from("b");
    let result = manager.add("a", KeyEntry::secret_key("AES", vec![0x61]), &mut protection);
    assert!(matches!(result, Err(ManagerError::UnsupportedEntry { .. })));
    assert!(protection.is_zeroed());
    assert!(!manager.contains_alias("a"));
}

#[test]
fn test_every_format_round_trips_private_keys() {
    let dir = TempDir::new().unwrap();
    for format in StorageFormat::ALL {
        let path = dir.path().join(format!("keys.{}", format.file_extension()));

        let mut writer = manager(format);
        let entry = KeyEntry::private_key(vec![0x30, 0x01], vec![vec![0x30, 0x02], vec![0x30, 0x03]]);
        writer.add("signing", entry.clone(), &mut Password::from("entry")).unwrap();
        writer.save(&path, &mut Password::from("store")).unwrap();

        let mut reader = self::manager(format);
        reader.load(&path, &mut Password::from("store")).unwrap();
        let loaded = reader.get("signing", &mut Password::from("entry")).unwrap();
        assert_eq!(loaded, Some(entry), "{} round trip", format);
    }
}

#[test]
fn test_wrong_entry_password_is_retrieve_error() {
    let mut manager = manager(StorageFormat::Jceks);
    manager
        .add("a", KeyEntry::secret_key("AES", vec![1; 32]), &mut Password::from("right"))
        .unwrap();
    let result = manager.get("a", &mut Password::from("wrong"));
    assert!(matches!(result, Err(ManagerError::Retrieve { .. })));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_passwords_are_erased_after_use(
        protection in "[a-zA-Z0-9]{0,16}",
        store in "[a-zA-Z0-9]{0,16}",
    ) {
        let mut manager = manager(StorageFormat::Jceks);

        let mut protection = Password::from(protection.as_str());
        let _ = manager.add("key", KeyEntry::secret_key("AES", vec![0x61]), &mut protection);
        prop_assert!(protection.is_zeroed());

        let mut store_password = Password::from(store.as_str());
        let bytes = manager.save_to_bytes(&mut store_password);
        prop_assert!(store_password.is_zeroed());

        if let Ok(bytes) = bytes {
            let mut load_password = Password::from("not-the-password-");
            let _ = manager.load_from_bytes(&bytes, &mut load_password);
            prop_assert!(load_password.is_zeroed());
        }
    }
}
