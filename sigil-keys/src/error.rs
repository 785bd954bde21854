//! Error types for key management and certificate signing
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


use crate::entry::EntryKind;
use crate::storage::StorageFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a security provider or one of its stores.
///
/// These never reach callers directly; the manager wraps them into
/// [`ManagerError`] or [`ConfigurationError`].
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} does not implement {format} storage")]
    UnsupportedFormat {
        provider: String,
        format: StorageFormat,
    },

    #[error("{kind} entries are not supported by {format} storage")]
    UnsupportedEntry {
        kind: EntryKind,
        format: StorageFormat,
    },

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Malformed store: {0}")]
    Malformed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Raised when a storage format cannot be realized by the bound provider
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Storage {format} is not available from provider '{provider}': {source}")]
    UnsupportedFormat {
        format: StorageFormat,
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Key manager errors
///
/// All variants are terminal for the call that produced them; nothing in the
/// manager retries.
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot add '{alias}': {kind} entries are not supported by {format} storage")]
    UnsupportedEntry {
        alias: String,
        kind: EntryKind,
        format: StorageFormat,
    },

    #[error("Unable to load {format} key store: {source}")]
    Load {
        format: StorageFormat,
        #[source]
        source: ProviderError,
    },

    #[error("Unable to save {format} key store: {source}")]
    Save {
        format: StorageFormat,
        #[source]
        source: ProviderError,
    },

    #[error("IO error on '{}': {source}", location.display())]
    Io {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to retrieve '{alias}': {source}")]
    Retrieve {
        alias: String,
        #[source]
        source: ProviderError,
    },

    #[error("Key store error: {0}")]
    Store(#[source] ProviderError),
}

/// Certificate signing errors
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Invalid signing configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot create certificate: {message}")]
    Builder {
        message: String,
        #[source]
        source: Option<rcgen::Error>,
    },

    #[error("Unable to sign the certificate with the given private key: {message}")]
    Signer {
        message: String,
        #[source]
        source: Option<rcgen::Error>,
    },

    #[error("Implementation error, cannot encode certificate: {0}")]
    Encoding(#[source] rcgen::Error),

    #[error("Implementation error, certificate conversion failed: {0}")]
    Conversion(String),
}

impl SigningError {
    /// True for failures that indicate a bug in certificate construction
    /// rather than bad input. These must not be retried.
    pub fn is_implementation_error(&self) -> bool {
        matches!(self, SigningError::Encoding(_) | SigningError::Conversion(_))
    }

    pub(crate) fn builder(message: impl Into<String>) -> Self {
        SigningError::Builder {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for key manager operations
pub type KeyResult<T> = Result<T, ManagerError>;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;
