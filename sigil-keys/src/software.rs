//! Software security provider with password-sealed stores
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


use crate::credential::secret_bytes;
use crate::entry::{EntryInfo, EntryKind, KeyEntry};
use crate::error::ProviderError;
use crate::provider::{SecurityProvider, Store, StoreHandle};
use crate::storage::StorageFormat;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sigil_logging::KEYSTORE_TARGET;
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::Zeroizing;

/// Name reported by [`SoftwareProvider`]
pub const PROVIDER_NAME: &str = "Sigil Software Provider";

/// Current envelope layout version
const ENVELOPE_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
/// Highest accepted multiple of the default Argon2 costs
const KDF_COST_LIMIT: u32 = 8;

/// Argon2id cost parameters used to turn passwords into AES-256 keys.
///
/// The parameters are written next to every sealed payload, so stores created
/// with different costs can still be opened by any provider instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// Largest parameter set a store may ask for
    pub fn limit() -> Self {
        Self::new(
            Params::DEFAULT_M_COST * KDF_COST_LIMIT,
            Params::DEFAULT_T_COST * KDF_COST_LIMIT,
            Params::DEFAULT_P_COST * KDF_COST_LIMIT,
        )
    }

    /// Reject costs above [`KdfParams::limit`]
    fn check_limit(&self) -> Result<(), String> {
        let limit = Self::limit();
        if self.memory_kib > limit.memory_kib
            || self.iterations > limit.iterations
            || self.parallelism > limit.parallelism
        {
            return Err(format!(
                "Key derivation costs {:?} exceed the limit {:?}",
                self, limit
            ));
        }
        Ok(())
    }

    fn derive_key(&self, password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, ProviderError> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| ProviderError::KeyDerivation(format!("Invalid parameters: {}", e)))?;

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password, salt, &mut *key)
            .map_err(|e| ProviderError::KeyDerivation(e.to_string()))?;
        Ok(key)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(
            Params::DEFAULT_M_COST,
            Params::DEFAULT_T_COST,
            Params::DEFAULT_P_COST,
        )
    }
}

/// Password-derived AES-256-GCM ciphertext
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedBox {
    kdf: KdfParams,
    salt: String,
    nonce: String,
    ciphertext: String,
}

impl SealedBox {
    fn seal(kdf: KdfParams, password: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Self, ProviderError> {
        kdf.check_limit().map_err(ProviderError::KeyDerivation)?;

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let key = kdf.derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| ProviderError::Encryption(format!("Invalid key: {}", e)))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad })
            .map_err(|e| ProviderError::Encryption(format!("Encryption failed: {}", e)))?;

        Ok(Self {
            kdf,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        })
    }

    fn open(&self, password: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, ProviderError> {
        // The parameters are read from unauthenticated data
        self.kdf.check_limit().map_err(ProviderError::Malformed)?;

        let salt = decode_hex("salt", &self.salt)?;
        let nonce_bytes = decode_hex("nonce", &self.nonce)?;
        let ciphertext = decode_hex("ciphertext", &self.ciphertext)?;

        if nonce_bytes.len() != NONCE_LEN {
            return Err(ProviderError::Malformed(format!(
                "Nonce must be {} bytes, found {}",
                NONCE_LEN,
                nonce_bytes.len()
            )));
        }

        let key = self.kdf.derive_key(password, &salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| ProviderError::Decryption(format!("Invalid key: {}", e)))?;

        // Authentication failure covers both a wrong password and tampering
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &ciphertext,
                    aad,
                },
            )
            .map_err(|_| {
                ProviderError::Decryption("Wrong password or corrupted data".to_string())
            })?;

        Ok(Zeroizing::new(plaintext))
    }
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, ProviderError> {
    hex::decode(value).map_err(|e| ProviderError::Malformed(format!("Invalid {}: {}", field, e)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredPayload {
    SecretKey {
        algorithm: String,
        sealed: SealedBox,
    },
    PrivateKey {
        sealed: SealedBox,
        certificate_chain: Vec<String>,
    },
    TrustedCertificate {
        certificate: String,
    },
}

impl StoredPayload {
    fn kind(&self) -> EntryKind {
        match self {
            StoredPayload::SecretKey { .. } => EntryKind::SecretKey,
            StoredPayload::PrivateKey { .. } => EntryKind::PrivateKey,
            StoredPayload::TrustedCertificate { .. } => EntryKind::TrustedCertificate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    created_at: DateTime<Utc>,
    payload: StoredPayload,
}

#[derive(Serialize, Deserialize)]
struct StoreBody {
    entries: BTreeMap<String, StoredEntry>,
}

/// Outer, unencrypted container written by [`SoftwareStore::store`]
#[derive(Serialize, Deserialize)]
struct Envelope {
    format: StorageFormat,
    version: u32,
    sealed: SealedBox,
}

/// In-memory store produced by [`SoftwareProvider`].
///
/// Protected entries are sealed as soon as they are added, so key material is
/// only held in the clear while an operation needs it.
pub struct SoftwareStore {
    format: StorageFormat,
    kdf: KdfParams,
    entries: BTreeMap<String, StoredEntry>,
}

impl SoftwareStore {
    fn new(format: StorageFormat, kdf: KdfParams) -> Self {
        Self {
            format,
            kdf,
            entries: BTreeMap::new(),
        }
    }

    fn entry_aad(&self, alias: &str) -> Vec<u8> {
        format!("{}:{}", self.format, alias).into_bytes()
    }

    fn check_supported(&self, kind: EntryKind) -> Result<(), ProviderError> {
        if kind == EntryKind::SecretKey && !self.format.supports_secret_keys() {
            return Err(ProviderError::UnsupportedEntry {
                kind,
                format: self.format,
            });
        }
        Ok(())
    }
}

impl Store for SoftwareStore {
    fn format(&self) -> StorageFormat {
        self.format
    }

    fn set_entry(
        &mut self,
        alias: &str,
        entry: &KeyEntry,
        protection: &[char],
    ) -> Result<(), ProviderError> {
        self.check_supported(entry.kind())?;

        let protection = secret_bytes(protection);
        let aad = self.entry_aad(alias);
        let payload = match entry {
            KeyEntry::SecretKey { algorithm, key } => StoredPayload::SecretKey {
                algorithm: algorithm.clone(),
                sealed: SealedBox::seal(self.kdf, &protection, key, &aad)?,
            },
            KeyEntry::PrivateKey {
                key,
                certificate_chain,
            } => StoredPayload::PrivateKey {
                sealed: SealedBox::seal(self.kdf, &protection, key, &aad)?,
                certificate_chain: certificate_chain.iter().map(hex::encode).collect(),
            },
            KeyEntry::TrustedCertificate { certificate } => StoredPayload::TrustedCertificate {
                certificate: hex::encode(certificate),
            },
        };

        self.entries.insert(
            alias.to_string(),
            StoredEntry {
                created_at: Utc::now(),
                payload,
            },
        );
        Ok(())
    }

    fn get_entry(&self, alias: &str, protection: &[char]) -> Result<Option<KeyEntry>, ProviderError> {
        let stored = match self.entries.get(alias) {
            Some(stored) => stored,
            None => return Ok(None),
        };

        let protection = secret_bytes(protection);
        let aad = self.entry_aad(alias);
        let entry = match &stored.payload {
            StoredPayload::SecretKey { algorithm, sealed } => KeyEntry::SecretKey {
                algorithm: algorithm.clone(),
                key: sealed.open(&protection, &aad)?,
            },
            StoredPayload::PrivateKey {
                sealed,
                certificate_chain,
            } => KeyEntry::PrivateKey {
                key: sealed.open(&protection, &aad)?,
                certificate_chain: certificate_chain
                    .iter()
                    .map(|c| decode_hex("certificate", c))
                    .collect::<Result<_, _>>()?,
            },
            StoredPayload::TrustedCertificate { certificate } => KeyEntry::TrustedCertificate {
                certificate: decode_hex("certificate", certificate)?,
            },
        };
        Ok(Some(entry))
    }

    fn entry_info(&self, alias: &str) -> Option<EntryInfo> {
        self.entries.get(alias).map(|stored| EntryInfo {
            alias: alias.to_string(),
            kind: stored.payload.kind(),
            created_at: stored.created_at,
        })
    }

    fn delete_entry(&mut self, alias: &str) -> bool {
        self.entries.remove(alias).is_some()
    }

    fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    fn aliases(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn load(&mut self, bytes: &[u8], password: &[char]) -> Result<(), ProviderError> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|e| ProviderError::Malformed(format!("Not a key store: {}", e)))?;

        if envelope.version != ENVELOPE_VERSION {
            return Err(ProviderError::Malformed(format!(
                "Unsupported key store version {}",
                envelope.version
            )));
        }
        if envelope.format != self.format {
            return Err(ProviderError::Malformed(format!(
                "Key store contains {} data, expected {}",
                envelope.format, self.format
            )));
        }

        let password = secret_bytes(password);
        let plaintext = envelope
            .sealed
            .open(&password, self.format.name().as_bytes())?;
        let body: StoreBody = serde_json::from_slice(&plaintext)?;

        if let Some(stored) = body.entries.values().find(|s| self.check_supported(s.payload.kind()).is_err()) {
            return Err(ProviderError::UnsupportedEntry {
                kind: stored.payload.kind(),
                format: self.format,
            });
        }

        debug!(
            target: KEYSTORE_TARGET,
            format = %self.format,
            entries = body.entries.len(),
            "Decoded key store"
        );
        self.entries = body.entries;
        Ok(())
    }

    fn store(&self, password: &[char]) -> Result<Vec<u8>, ProviderError> {
        let body = StoreBody {
            entries: self.entries.clone(),
        };
        let plaintext = Zeroizing::new(serde_json::to_vec(&body)?);

        let password = secret_bytes(password);
        let envelope = Envelope {
            format: self.format,
            version: ENVELOPE_VERSION,
            sealed: SealedBox::seal(self.kdf, &password, &plaintext, self.format.name().as_bytes())?,
        };

        debug!(
            target: KEYSTORE_TARGET,
            format = %self.format,
            entries = self.entries.len(),
            "Encoded key store"
        );
        Ok(serde_json::to_vec_pretty(&envelope)?)
    }
}

/// Built-in provider implementing every [`StorageFormat`] in software.
///
/// A provider can be restricted to a subset of formats, which is how a
/// deployment lacking some formats is modelled.
#[derive(Debug, Clone)]
pub struct SoftwareProvider {
    formats: Vec<StorageFormat>,
    kdf: KdfParams,
}

impl SoftwareProvider {
    /// Provider offering only the given formats
    pub fn with_formats(formats: impl IntoIterator<Item = StorageFormat>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
            kdf: KdfParams::default(),
        }
    }

    /// Use the given key derivation costs for newly sealed data
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn formats(&self) -> &[StorageFormat] {
        &self.formats
    }
}

impl Default for SoftwareProvider {
    fn default() -> Self {
        Self::with_formats(StorageFormat::ALL)
    }
}

impl SecurityProvider for SoftwareProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn construct(&self, format: StorageFormat) -> Result<StoreHandle, ProviderError> {
        if !self.formats.contains(&format) {
            return Err(ProviderError::UnsupportedFormat {
                provider: PROVIDER_NAME.to_string(),
                format,
            });
        }
        Ok(Box::new(SoftwareStore::new(format, self.kdf)))
    }
}
