//! Certificate serial numbers
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


use crate::error::{SigningError, SigningResult};
use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;

/// Number of decimal digits in a generated serial
pub const SERIAL_DIGITS: usize = 40;

/// A 40 digit decimal certificate serial number.
///
/// Built from 128 random bits split into two unsigned 64-bit halves, each
/// zero padded to 20 digits. Uniqueness is probabilistic; no counter is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(String);

impl SerialNumber {
    pub fn generate() -> Self {
        let value: u128 = OsRng.gen();
        Self::from_halves((value >> 64) as u64, value as u64)
    }

    fn from_halves(high: u64, low: u64) -> Self {
        SerialNumber(format!("{:020}{:020}", high, low))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Minimal big-endian magnitude of the decimal value
    pub fn to_be_bytes(&self) -> SigningResult<Vec<u8>> {
        BigUint::parse_bytes(self.0.as_bytes(), 10)
            .map(|value| value.to_bytes_be())
            .ok_or_else(|| SigningError::builder(format!("Serial number '{}' is not decimal", self.0)))
    }

    /// Decimal value without leading zeros
    pub fn to_decimal(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() {
            "0"
        } else {
            trimmed
        }
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
