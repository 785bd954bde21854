//! Security provider abstraction
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


use crate::entry::{EntryInfo, KeyEntry};
use crate::error::{ConfigurationError, ProviderError};
use crate::software::SoftwareProvider;
use crate::storage::StorageFormat;
use sigil_logging::CONFIGURATION_TARGET;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Provider-owned in-memory store instance
pub type StoreHandle = Box<dyn Store>;

/// A pluggable implementation of store codecs for one or more formats.
///
/// Implementations are injected into a [`ProviderBinding`]; nothing is looked
/// up from process-wide registration.
pub trait SecurityProvider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Create an empty store of the given format
    fn construct(&self, format: StorageFormat) -> Result<StoreHandle, ProviderError>;
}

/// Format-specific store instance produced by a provider.
///
/// Passwords are handed over as character slices; erasing the caller's buffer
/// is the manager's job.
pub trait Store: Send {
    fn format(&self) -> StorageFormat;

    /// Add or overwrite an entry
    fn set_entry(
        &mut self,
        alias: &str,
        entry: &KeyEntry,
        protection: &[char],
    ) -> Result<(), ProviderError>;

    /// Read an entry, unsealing it with its protection password
    fn get_entry(&self, alias: &str, protection: &[char]) -> Result<Option<KeyEntry>, ProviderError>;

    fn entry_info(&self, alias: &str) -> Option<EntryInfo>;

    fn delete_entry(&mut self, alias: &str) -> bool;

    fn contains_alias(&self, alias: &str) -> bool;

    fn aliases(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the contents with the decoded bytes
    fn load(&mut self, bytes: &[u8], password: &[char]) -> Result<(), ProviderError>;

    /// Encode the contents protected by the given password
    fn store(&self, password: &[char]) -> Result<Vec<u8>, ProviderError>;
}

/// A storage format paired with a provider known to implement it
#[derive(Clone)]
pub struct ProviderBinding {
    format: StorageFormat,
    provider: Arc<dyn SecurityProvider>,
}

impl ProviderBinding {
    /// Bind a format to a provider.
    ///
    /// The provider is asked to construct a store right away so that an
    /// unavailable format surfaces here and not on first use.
    pub fn new(
        format: StorageFormat,
        provider: Arc<dyn SecurityProvider>,
    ) -> Result<Self, ConfigurationError> {
        match provider.construct(format) {
            Ok(_) => {
                debug!(
                    target: CONFIGURATION_TARGET,
                    format = %format,
                    provider = provider.name(),
                    "Provider binding created"
                );
                Ok(Self { format, provider })
            }
            Err(e) => {
                warn!(
                    target: CONFIGURATION_TARGET,
                    format = %format,
                    provider = provider.name(),
                    error = %e,
                    "Storage format unavailable"
                );
                Err(ConfigurationError::UnsupportedFormat {
                    format,
                    provider: provider.name().to_string(),
                    source: e,
                })
            }
        }
    }

    /// Bind a format to the built-in [`SoftwareProvider`]
    pub fn with_default_provider(format: StorageFormat) -> Result<Self, ConfigurationError> {
        Self::new(format, Arc::new(SoftwareProvider::default()))
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Create a new empty store of the bound format
    pub fn construct_store(&self) -> Result<StoreHandle, ProviderError> {
        self.provider.construct(self.format)
    }
}

impl fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("format", &self.format)
            .field("provider", &self.provider.name())
            .finish()
    }
}
