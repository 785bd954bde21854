//! Key manager: format-independent add, load and save
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


use crate::credential::{CredentialGuard, Password};
use crate::entry::{EntryInfo, EntryKind, KeyEntry};
use crate::error::{ConfigurationError, KeyResult, ManagerError, ProviderError};
use crate::provider::{ProviderBinding, StoreHandle};
use crate::storage::StorageFormat;
use sigil_logging::KEYSTORE_TARGET;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Manages one in-memory key store bound to a storage format and provider.
///
/// The store is created empty on first use or replaced by [`KeyManager::load`].
/// Nothing reaches persistent storage until [`KeyManager::save`]. A manager
/// is not internally synchronized; share it behind a lock if needed.
pub struct KeyManager {
    binding: ProviderBinding,
    store: Option<StoreHandle>,
}

impl KeyManager {
    /// Create a key manager for an already validated binding
    pub fn new(binding: ProviderBinding) -> Self {
        Self {
            binding,
            store: None,
        }
    }

    /// Create a key manager using the built-in software provider
    pub fn with_format(format: StorageFormat) -> Result<Self, ConfigurationError> {
        Ok(Self::new(ProviderBinding::with_default_provider(format)?))
    }

    pub fn format(&self) -> StorageFormat {
        self.binding.format()
    }

    pub fn binding(&self) -> &ProviderBinding {
        &self.binding
    }

    /// Add an entry under `alias`, replacing any existing entry.
    ///
    /// `protection` guards this entry only and is erased before returning.
    pub fn add(&mut self, alias: &str, entry: KeyEntry, protection: &mut Password) -> KeyResult<()> {
        let protection = protection.consume();

        validate_alias(alias)?;
        let kind = entry.kind();
        if kind.is_protected() && protection.is_zeroed() {
            return Err(ManagerError::InvalidArgument(format!(
                "Protection password for {} entry '{}' must not be empty or erased",
                kind, alias
            )));
        }
        if let KeyEntry::PrivateKey {
            certificate_chain, ..
        } = &entry
        {
            if certificate_chain.is_empty() {
                return Err(ManagerError::InvalidArgument(format!(
                    "Private key entry '{}' requires a certificate chain",
                    alias
                )));
            }
        }

        let format = self.format();
        let unsupported = || ManagerError::UnsupportedEntry {
            alias: alias.to_string(),
            kind,
            format,
        };
        if kind == EntryKind::SecretKey && !format.supports_secret_keys() {
            warn!(target: KEYSTORE_TARGET, alias = %alias, format = %format, "Secret keys not supported");
            return Err(unsupported());
        }

        let store = self.store_mut()?;
        match store.set_entry(alias, &entry, protection.chars()) {
            Ok(()) => {}
            Err(ProviderError::UnsupportedEntry { .. }) => return Err(unsupported()),
            Err(e) => return Err(ManagerError::Store(e)),
        }

        info!(target: KEYSTORE_TARGET, alias = %alias, kind = %kind, format = %format, "Added key store entry");
        Ok(())
    }

    /// Read an entry back, unsealing it with its protection password
    pub fn get(&self, alias: &str, protection: &mut Password) -> KeyResult<Option<KeyEntry>> {
        let protection = protection.consume();
        validate_alias(alias)?;

        let store = match &self.store {
            Some(store) => store,
            None => return Ok(None),
        };
        store
            .get_entry(alias, protection.chars())
            .map_err(|source| ManagerError::Retrieve {
                alias: alias.to_string(),
                source,
            })
    }

    /// Load a key store file, replacing the current contents.
    ///
    /// On failure the current contents are left as they were.
    pub fn load(&mut self, location: impl AsRef<Path>, password: &mut Password) -> KeyResult<()> {
        let location = location.as_ref();
        let password = password.consume();

        validate_location(location)?;
        validate_password(&password)?;

        let bytes = fs::read(location).map_err(|source| ManagerError::Io {
            location: location.to_path_buf(),
            source,
        })?;

        self.load_checked(&bytes, &password)?;
        info!(target: KEYSTORE_TARGET, location = %location.display(), format = %self.format(), "Loaded key store");
        Ok(())
    }

    /// Load a key store from serialized bytes, replacing the current contents
    pub fn load_from_bytes(&mut self, bytes: &[u8], password: &mut Password) -> KeyResult<()> {
        let password = password.consume();
        validate_password(&password)?;

        self.load_checked(bytes, &password)?;
        info!(target: KEYSTORE_TARGET, format = %self.format(), "Loaded key store from memory");
        Ok(())
    }

    /// Write the key store to `location`, protected by `password`
    pub fn save(&self, location: impl AsRef<Path>, password: &mut Password) -> KeyResult<()> {
        let location = location.as_ref();
        let password = password.consume();

        validate_location(location)?;
        validate_password(&password)?;

        let bytes = self.encode(&password)?;
        fs::write(location, bytes).map_err(|source| ManagerError::Io {
            location: location.to_path_buf(),
            source,
        })?;

        info!(target: KEYSTORE_TARGET, location = %location.display(), format = %self.format(), "Saved key store");
        Ok(())
    }

    /// Serialize the key store without touching persistent storage
    pub fn save_to_bytes(&self, password: &mut Password) -> KeyResult<Vec<u8>> {
        let password = password.consume();
        validate_password(&password)?;

        self.encode(&password)
    }

    /// Remove an entry, returning whether it existed
    pub fn remove(&mut self, alias: &str) -> bool {
        let removed = self
            .store
            .as_mut()
            .map(|store| store.delete_entry(alias))
            .unwrap_or(false);
        if removed {
            info!(target: KEYSTORE_TARGET, alias = %alias, "Removed key store entry");
        }
        removed
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.store
            .as_ref()
            .map(|store| store.contains_alias(alias))
            .unwrap_or(false)
    }

    pub fn aliases(&self) -> Vec<String> {
        self.store
            .as_ref()
            .map(|store| store.aliases())
            .unwrap_or_default()
    }

    pub fn entry_info(&self, alias: &str) -> Option<EntryInfo> {
        self.store.as_ref().and_then(|store| store.entry_info(alias))
    }

    pub fn len(&self) -> usize {
        self.store.as_ref().map(|store| store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store_mut(&mut self) -> KeyResult<&mut StoreHandle> {
        let store = match self.store.take() {
            Some(store) => store,
            None => {
                let store = self.binding.construct_store().map_err(ManagerError::Store)?;
                debug!(target: KEYSTORE_TARGET, format = %self.format(), "Initialized empty key store");
                store
            }
        };
        Ok(self.store.insert(store))
    }

    fn load_checked(&mut self, bytes: &[u8], password: &CredentialGuard<'_>) -> KeyResult<()> {
        let format = self.format();
        let mut fresh = self.binding.construct_store().map_err(ManagerError::Store)?;

        if let Err(source) = fresh.load(bytes, password.chars()) {
            warn!(target: KEYSTORE_TARGET, format = %format, error = %source, "Key store load failed");
            return Err(ManagerError::Load { format, source });
        }

        self.store = Some(fresh);
        Ok(())
    }

    fn encode(&self, password: &CredentialGuard<'_>) -> KeyResult<Vec<u8>> {
        let format = self.format();
        let result = match &self.store {
            Some(store) => store.store(password.chars()),
            None => self
                .binding
                .construct_store()
                .and_then(|empty| empty.store(password.chars())),
        };
        result.map_err(|source| ManagerError::Save { format, source })
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("binding", &self.binding)
            .field("entries", &self.len())
            .finish()
    }
}

fn validate_alias(alias: &str) -> KeyResult<()> {
    if alias.is_empty() {
        return Err(ManagerError::InvalidArgument(
            "Alias must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_location(location: &Path) -> KeyResult<()> {
    if location.as_os_str().is_empty() {
        return Err(ManagerError::InvalidArgument(
            "Key store location must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &CredentialGuard<'_>) -> KeyResult<()> {
    if password.is_empty() {
        return Err(ManagerError::InvalidArgument(
            "Key store password must not be empty".to_string(),
        ));
    }
    if password.is_zeroed() {
        return Err(ManagerError::InvalidArgument(
            "Key store password has already been erased".to_string(),
        ));
    }
    Ok(())
}
