//! Erasable password buffers
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


use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// A password or passphrase protecting a key store or a single entry.
///
/// Every key manager operation that accepts a `Password` overwrites each
/// character with `'\0'` before it returns, whether the call succeeded or not.
/// The length is kept so callers can verify the buffer was cleared.
/// Dropping a `Password` clears it as well.
pub struct Password {
    chars: Vec<char>,
}

impl Password {
    pub fn new(chars: Vec<char>) -> Self {
        Self { chars }
    }

    pub fn as_chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// True once every character has been overwritten
    pub fn is_zeroed(&self) -> bool {
        self.chars.iter().all(|c| *c == '\0')
    }

    /// Borrow the password for the duration of one operation.
    ///
    /// The returned guard clears the buffer when it goes out of scope, which
    /// covers early returns and `?` propagation.
    pub fn consume(&mut self) -> CredentialGuard<'_> {
        CredentialGuard { password: self }
    }
}

impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.chars.as_mut_slice().zeroize();
    }
}

impl Drop for Password {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self::new(value.chars().collect())
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        let value = Zeroizing::new(value);
        Self::from(value.as_str())
    }
}

impl From<Vec<char>> for Password {
    fn from(chars: Vec<char>) -> Self {
        Self::new(chars)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password([REDACTED; {}])", self.chars.len())
    }
}

/// Scoped access to a [`Password`] that erases it on drop
pub struct CredentialGuard<'a> {
    password: &'a mut Password,
}

impl CredentialGuard<'_> {
    pub fn is_empty(&self) -> bool {
        self.password.is_empty()
    }

    /// True for an empty password or one a previous call already erased
    pub fn is_zeroed(&self) -> bool {
        self.password.is_zeroed()
    }

    pub fn chars(&self) -> &[char] {
        self.password.as_chars()
    }

    /// UTF-8 encoding of the password, erased when dropped
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        secret_bytes(self.chars())
    }
}

impl Drop for CredentialGuard<'_> {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// UTF-8 encode a character slice into an erasable buffer
pub(crate) fn secret_bytes(chars: &[char]) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(Vec::with_capacity(chars.len() * 4));
    let mut buf = [0u8; 4];
    for c in chars {
        bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }
    buf.zeroize();
    bytes
}
