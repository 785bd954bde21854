//! Storage format descriptors
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


use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage used when a caller does not pick one
pub const DEFAULT_STORAGE: StorageFormat = StorageFormat::Pkcs12;

/// Supported key store encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageFormat {
    /// PKCS #12, no secret key entries
    Pkcs12,
    /// Sun JCEKS
    Jceks,
    /// BouncyCastle BKS
    Bks,
    /// BouncyCastle UBER
    Uber,
}

impl StorageFormat {
    /// All formats known to this crate
    pub const ALL: [StorageFormat; 4] = [
        StorageFormat::Pkcs12,
        StorageFormat::Jceks,
        StorageFormat::Bks,
        StorageFormat::Uber,
    ];

    /// Canonical storage name
    pub fn name(&self) -> &'static str {
        match self {
            StorageFormat::Pkcs12 => "PKCS12",
            StorageFormat::Jceks => "JCEKS",
            StorageFormat::Bks => "BKS",
            StorageFormat::Uber => "UBER",
        }
    }

    /// Whether symmetric secret key entries can be stored
    pub fn supports_secret_keys(&self) -> bool {
        !matches!(self, StorageFormat::Pkcs12)
    }

    /// Default file extension, without the leading dot
    pub fn file_extension(&self) -> &'static str {
        match self {
            StorageFormat::Pkcs12 => "p12",
            StorageFormat::Jceks => "jceks",
            StorageFormat::Bks => "bks",
            StorageFormat::Uber => "uber",
        }
    }
}

impl Default for StorageFormat {
    fn default() -> Self {
        DEFAULT_STORAGE
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StorageFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::Invalid(format!("Unknown storage format: {}", s)))
    }
}
