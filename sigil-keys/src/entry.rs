//! Key store entry definitions
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


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Unique identifier of an entry within a store
pub type Alias = String;

/// Entry classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Symmetric secret key
    SecretKey,
    /// Private key with its certificate chain
    PrivateKey,
    /// Trusted certificate, stored without protection
    TrustedCertificate,
}

impl EntryKind {
    /// Whether entries of this kind are sealed with a protection password
    pub fn is_protected(&self) -> bool {
        !matches!(self, EntryKind::TrustedCertificate)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::SecretKey => "secret key",
            EntryKind::PrivateKey => "private key",
            EntryKind::TrustedCertificate => "trusted certificate",
        })
    }
}

/// A single key store entry
#[derive(Clone, PartialEq, Eq)]
pub enum KeyEntry {
    /// Raw symmetric key bytes and the algorithm they belong to
    SecretKey {
        algorithm: String,
        key: Zeroizing<Vec<u8>>,
    },
    /// PKCS #8 DER private key with a DER certificate chain, leaf first
    PrivateKey {
        key: Zeroizing<Vec<u8>>,
        certificate_chain: Vec<Vec<u8>>,
    },
    /// DER encoded certificate
    TrustedCertificate { certificate: Vec<u8> },
}

impl KeyEntry {
    pub fn secret_key(algorithm: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        KeyEntry::SecretKey {
            algorithm: algorithm.into(),
            key: Zeroizing::new(key.into()),
        }
    }

    pub fn private_key(key: impl Into<Vec<u8>>, certificate_chain: Vec<Vec<u8>>) -> Self {
        KeyEntry::PrivateKey {
            key: Zeroizing::new(key.into()),
            certificate_chain,
        }
    }

    pub fn trusted_certificate(certificate: impl Into<Vec<u8>>) -> Self {
        KeyEntry::TrustedCertificate {
            certificate: certificate.into(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            KeyEntry::SecretKey { .. } => EntryKind::SecretKey,
            KeyEntry::PrivateKey { .. } => EntryKind::PrivateKey,
            KeyEntry::TrustedCertificate { .. } => EntryKind::TrustedCertificate,
        }
    }

    /// Secret key bytes, if this is a secret key entry
    pub fn secret_key_bytes(&self) -> Option<&[u8]> {
        match self {
            KeyEntry::SecretKey { key, .. } => Some(key.as_slice()),
            _ => None,
        }
    }

    /// Leaf certificate of a private key entry, or the trusted certificate
    pub fn certificate(&self) -> Option<&[u8]> {
        match self {
            KeyEntry::PrivateKey {
                certificate_chain, ..
            } => certificate_chain.first().map(Vec::as_slice),
            KeyEntry::TrustedCertificate { certificate } => Some(certificate.as_slice()),
            KeyEntry::SecretKey { .. } => None,
        }
    }
}

impl fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyEntry::SecretKey { algorithm, key } => f
                .debug_struct("SecretKey")
                .field("algorithm", algorithm)
                .field("key", &format_args!("[REDACTED; {}]", key.len()))
                .finish(),
            KeyEntry::PrivateKey {
                key,
                certificate_chain,
            } => f
                .debug_struct("PrivateKey")
                .field("key", &format_args!("[REDACTED; {}]", key.len()))
                .field("certificate_chain", &certificate_chain.len())
                .finish(),
            KeyEntry::TrustedCertificate { certificate } => f
                .debug_struct("TrustedCertificate")
                .field("certificate", &certificate.len())
                .finish(),
        }
    }
}

/// Public facts about a stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub alias: Alias,
    pub kind: EntryKind,
    pub created_at: DateTime<Utc>,
}
