//! X.500 distinguished names
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


use crate::error::SigningError;
use rcgen::DnType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuer or subject identity, e.g. `CN=gateway,O=Example,C=FI`.
///
/// The string is kept as given; it is only parsed when a certificate is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistinguishedName(String);

impl DistinguishedName {
    pub fn new(name: impl Into<String>) -> Self {
        DistinguishedName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into the attribute list used by certificate construction
    pub(crate) fn to_rcgen(&self) -> Result<rcgen::DistinguishedName, SigningError> {
        let attributes = split_attributes(&self.0)?;
        if attributes.iter().all(|a| a.trim().is_empty()) {
            return Err(SigningError::builder("Distinguished name is empty"));
        }

        let mut dn = rcgen::DistinguishedName::new();
        let mut seen = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            let (key, value) = attribute.split_once('=').ok_or_else(|| {
                SigningError::builder(format!(
                    "Malformed attribute '{}' in '{}'",
                    attribute.trim(),
                    self.0
                ))
            })?;
            let value = value.trim();
            if value.is_empty() {
                return Err(SigningError::builder(format!(
                    "Empty value for '{}' in '{}'",
                    key.trim(),
                    self.0
                )));
            }
            // rcgen keeps a single value per attribute type
            let dn_type = attribute_type(key.trim(), &self.0)?;
            if seen.contains(&dn_type) {
                return Err(SigningError::builder(format!(
                    "Repeated attribute '{}' in '{}' cannot be encoded",
                    key.trim(),
                    self.0
                )));
            }
            seen.push(dn_type.clone());
            dn.push(dn_type, value.to_string());
        }
        Ok(dn)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DistinguishedName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Split on unescaped commas, unescaping `\,` and `\\`
fn split_attributes(name: &str) -> Result<Vec<String>, SigningError> {
    let mut attributes = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => current.push(next),
                None => {
                    return Err(SigningError::builder(format!(
                        "Dangling escape at the end of '{}'",
                        name
                    )))
                }
            },
            ',' => attributes.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    attributes.push(current);
    Ok(attributes)
}

fn attribute_type(key: &str, name: &str) -> Result<DnType, SigningError> {
    let dn_type = match key.to_ascii_uppercase().as_str() {
        "CN" => DnType::CommonName,
        "O" => DnType::OrganizationName,
        "OU" => DnType::OrganizationalUnitName,
        "C" => DnType::CountryName,
        "ST" => DnType::StateOrProvinceName,
        "L" => DnType::LocalityName,
        "STREET" => DnType::CustomDnType(vec![2, 5, 4, 9]),
        "SERIALNUMBER" => DnType::CustomDnType(vec![2, 5, 4, 5]),
        "DC" => DnType::CustomDnType(vec![0, 9, 2342, 19200300, 100, 1, 25]),
        "UID" => DnType::CustomDnType(vec![0, 9, 2342, 19200300, 100, 1, 1]),
        "E" | "EMAILADDRESS" => DnType::CustomDnType(vec![1, 2, 840, 113549, 1, 9, 1]),
        _ => {
            return Err(SigningError::builder(format!(
                "Unknown attribute type '{}' in '{}'",
                key, name
            )))
        }
    };
    Ok(dn_type)
}
