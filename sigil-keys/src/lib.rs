//! Key store management and certificate signing for Sigil
//!
//! Stores secret keys, private keys and trusted certificates in password
//! protected key stores, and issues X.509 v3 certificates signed with a
//! caller supplied private key.
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


pub mod credential;
pub mod entry;
pub mod error;
pub mod manager;
pub mod name;
pub mod provider;
pub mod serial;
pub mod signer;
pub mod software;
pub mod storage;

pub use credential::{CredentialGuard, Password};
pub use entry::{Alias, EntryInfo, EntryKind, KeyEntry};
pub use error::{ConfigurationError, KeyResult, ManagerError, ProviderError, SigningError, SigningResult};
pub use manager::KeyManager;
pub use name::DistinguishedName;
pub use provider::{ProviderBinding, SecurityProvider, Store, StoreHandle};
pub use serial::SerialNumber;
pub use signer::{
    GeneratedKeyPair, KeySigner, SignatureAlgorithm, SignedCertificate, SigningConfig, SigningKey,
    ValidityPeriod, X509KeySigner,
};
pub use software::{KdfParams, SoftwareProvider};
pub use storage::{StorageFormat, DEFAULT_STORAGE};
