//! X.509 v3 public key certificates
//!
//! Certificates are issued directly by a caller supplied key pair. There is no
//! chain building; the intended use is trust between two parties that already
//! trust each other out of band.
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
use crate::name::DistinguishedName;
use crate::serial::SerialNumber;
use chrono::{DateTime, Duration, Utc};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair, SubjectPublicKeyInfo};
use sha2::{Digest, Sha256};
use sigil_logging::SIGNING_TARGET;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use tracing::{debug, info};
use x509_parser::prelude::{parse_x509_certificate, X509Version};
use zeroize::Zeroizing;

/// Signature algorithms available for signing certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    EcdsaP256Sha256,
    EcdsaP384Sha384,
    Ed25519,
    RsaSha256,
    RsaSha384,
    RsaSha512,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 6] = [
        SignatureAlgorithm::EcdsaP256Sha256,
        SignatureAlgorithm::EcdsaP384Sha384,
        SignatureAlgorithm::Ed25519,
        SignatureAlgorithm::RsaSha256,
        SignatureAlgorithm::RsaSha384,
        SignatureAlgorithm::RsaSha512,
    ];

    /// Conventional algorithm name, e.g. `SHA256withECDSA`
    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::EcdsaP256Sha256 => "SHA256withECDSA",
            SignatureAlgorithm::EcdsaP384Sha384 => "SHA384withECDSA",
            SignatureAlgorithm::Ed25519 => "Ed25519",
            SignatureAlgorithm::RsaSha256 => "SHA256withRSA",
            SignatureAlgorithm::RsaSha384 => "SHA384withRSA",
            SignatureAlgorithm::RsaSha512 => "SHA512withRSA",
        }
    }

    fn rcgen(&self) -> &'static rcgen::SignatureAlgorithm {
        match self {
            SignatureAlgorithm::EcdsaP256Sha256 => &rcgen::PKCS_ECDSA_P256_SHA256,
            SignatureAlgorithm::EcdsaP384Sha384 => &rcgen::PKCS_ECDSA_P384_SHA384,
            SignatureAlgorithm::Ed25519 => &rcgen::PKCS_ED25519,
            SignatureAlgorithm::RsaSha256 => &rcgen::PKCS_RSA_SHA256,
            SignatureAlgorithm::RsaSha384 => &rcgen::PKCS_RSA_SHA384,
            SignatureAlgorithm::RsaSha512 => &rcgen::PKCS_RSA_SHA512,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignatureAlgorithm::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SigningError::Signer {
                message: format!("Unsupported signature algorithm: {}", s),
                source: None,
            })
    }
}

/// PKCS #8 private key used to sign certificates
#[derive(Clone)]
pub struct SigningKey {
    pem: Zeroizing<String>,
}

impl SigningKey {
    /// Wrap a PEM encoded PKCS #8 private key
    pub fn from_pkcs8_pem(pem: impl Into<String>) -> Self {
        Self {
            pem: Zeroizing::new(pem.into()),
        }
    }

    /// Generate a new key pair. RSA keys cannot be generated and must be
    /// imported with [`SigningKey::from_pkcs8_pem`].
    pub fn generate(algorithm: SignatureAlgorithm) -> SigningResult<GeneratedKeyPair> {
        let key_pair = KeyPair::generate_for(algorithm.rcgen()).map_err(|e| SigningError::Signer {
            message: format!("Cannot generate {} key pair", algorithm),
            source: Some(e),
        })?;

        Ok(GeneratedKeyPair {
            algorithm,
            signing_key: SigningKey::from_pkcs8_pem(key_pair.serialize_pem()),
            pkcs8_der: Zeroizing::new(key_pair.serialize_der()),
            public_key: key_pair.public_key_der(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pem.trim().is_empty()
    }

    fn key_pair(&self, algorithm: SignatureAlgorithm) -> SigningResult<KeyPair> {
        KeyPair::from_pem_and_sign_algo(&self.pem, algorithm.rcgen()).map_err(|e| {
            SigningError::Signer {
                message: format!("Private key is not usable with {}", algorithm),
                source: Some(e),
            }
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// Output of [`SigningKey::generate`]
#[derive(Clone)]
pub struct GeneratedKeyPair {
    pub algorithm: SignatureAlgorithm,
    pub signing_key: SigningKey,
    /// PKCS #8 DER encoding of the private key, for key store entries
    pub pkcs8_der: Zeroizing<Vec<u8>>,
    /// DER SubjectPublicKeyInfo
    pub public_key: Vec<u8>,
}

impl fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("algorithm", &self.algorithm)
            .field("public_key", &hex::encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

/// Certificate validity window, second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityPeriod {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl ValidityPeriod {
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// Valid from the current second for the given number of days
    pub fn days_from_now(days: i64) -> Self {
        let now = Utc::now();
        let now = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        Self::new(now, now + Duration::days(days))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.not_before <= instant && instant <= self.not_after
    }
}

/// Everything needed to issue one certificate
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub issuer: DistinguishedName,
    pub subject: DistinguishedName,
    pub validity: ValidityPeriod,
    /// DER SubjectPublicKeyInfo of the key being certified
    pub public_key: Vec<u8>,
    /// Issuer's private key
    pub signing_key: SigningKey,
    pub signature_algorithm: SignatureAlgorithm,
}

impl SigningConfig {
    /// Configuration for a certificate issued by the key it certifies
    pub fn self_signed(
        name: DistinguishedName,
        validity: ValidityPeriod,
        key_pair: &GeneratedKeyPair,
    ) -> Self {
        Self {
            issuer: name.clone(),
            subject: name,
            validity,
            public_key: key_pair.public_key.clone(),
            signing_key: key_pair.signing_key.clone(),
            signature_algorithm: key_pair.algorithm,
        }
    }

    fn validate(&self) -> SigningResult<()> {
        if self.validity.not_before > self.validity.not_after {
            return Err(SigningError::InvalidConfiguration(format!(
                "Validity starts ({}) after it ends ({})",
                self.validity.not_before, self.validity.not_after
            )));
        }
        if self.public_key.is_empty() {
            return Err(SigningError::InvalidConfiguration(
                "Public key is missing".to_string(),
            ));
        }
        if self.signing_key.is_empty() {
            return Err(SigningError::InvalidConfiguration(
                "Private signing key is missing".to_string(),
            ));
        }
        Ok(())
    }
}

/// A signed X.509 v3 certificate and the values read back from it
#[derive(Debug, Clone)]
pub struct SignedCertificate {
    pub der: Vec<u8>,
    pub pem: String,
    pub serial: SerialNumber,
    pub issuer: String,
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// DER SubjectPublicKeyInfo as encoded in the certificate
    pub public_key: Vec<u8>,
    /// Hex SHA-256 of the DER encoding
    pub fingerprint: String,
}

/// Creates public key certificates signed with a given private key
pub trait KeySigner {
    fn sign_public_key(&self, config: &SigningConfig) -> SigningResult<SignedCertificate>;
}

/// [`KeySigner`] backed by rcgen and ring. Stateless; safe to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct X509KeySigner;

impl X509KeySigner {
    pub fn new() -> Self {
        Self
    }

    fn certificate_params(
        &self,
        subject: &DistinguishedName,
        validity: &ValidityPeriod,
        serial: Option<&SerialNumber>,
    ) -> SigningResult<CertificateParams> {
        let mut params = CertificateParams::default();
        params.distinguished_name = subject.to_rcgen()?;
        params.not_before = to_offset(validity.not_before)?;
        params.not_after = to_offset(validity.not_after)?;
        params.serial_number = serial
            .map(|s| s.to_be_bytes().map(rcgen::SerialNumber::from))
            .transpose()?;
        Ok(params)
    }

    /// Issuer certificate carrying the issuer name, used only to sign
    fn issuer_certificate(
        &self,
        config: &SigningConfig,
        signing_key: &KeyPair,
    ) -> SigningResult<rcgen::Certificate> {
        let mut params = self.certificate_params(&config.issuer, &config.validity, None)?;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.self_signed(signing_key).map_err(|e| SigningError::Signer {
            message: "Cannot sign with the given private key".to_string(),
            source: Some(e),
        })
    }

    fn convert(&self, certificate: rcgen::Certificate, serial: SerialNumber) -> SigningResult<SignedCertificate> {
        let der = certificate.der().to_vec();
        let pem = certificate.pem();

        let (_, parsed) = parse_x509_certificate(&der)
            .map_err(|e| SigningError::Conversion(format!("Cannot parse encoded certificate: {}", e)))?;

        if parsed.version() != X509Version::V3 {
            return Err(SigningError::Conversion(format!(
                "Expected an X.509 v3 certificate, got {:?}",
                parsed.version()
            )));
        }

        let encoded_serial = parsed.tbs_certificate.serial.to_string();
        if encoded_serial != serial.to_decimal() {
            return Err(SigningError::Conversion(format!(
                "Serial number mismatch: generated {}, encoded {}",
                serial, encoded_serial
            )));
        }

        let validity = parsed.validity();
        let not_before = from_timestamp(validity.not_before.timestamp())?;
        let not_after = from_timestamp(validity.not_after.timestamp())?;

        Ok(SignedCertificate {
            pem,
            serial,
            issuer: parsed.issuer().to_string(),
            subject: parsed.subject().to_string(),
            not_before,
            not_after,
            public_key: parsed.public_key().raw.to_vec(),
            fingerprint: hex::encode(Sha256::digest(&der)),
            der,
        })
    }
}

impl KeySigner for X509KeySigner {
    fn sign_public_key(&self, config: &SigningConfig) -> SigningResult<SignedCertificate> {
        config.validate()?;

        // Unsigned certificate: names, validity, public key and a fresh serial
        let serial = SerialNumber::generate();
        let params = self.certificate_params(&config.subject, &config.validity, Some(&serial))?;
        let public_key =
            SubjectPublicKeyInfo::from_der(&config.public_key).map_err(|e| SigningError::Builder {
                message: "Public key is not a valid SubjectPublicKeyInfo".to_string(),
                source: Some(e),
            })?;

        // Content signer bound to the private key and algorithm
        let signing_key = config.signing_key.key_pair(config.signature_algorithm)?;
        let issuer = self.issuer_certificate(config, &signing_key)?;
        debug!(
            target: SIGNING_TARGET,
            algorithm = %config.signature_algorithm,
            issuer = %config.issuer,
            "Content signer ready"
        );

        let certificate = params
            .signed_by(&public_key, &issuer, &signing_key)
            .map_err(SigningError::Encoding)?;
        let signed = self.convert(certificate, serial)?;

        info!(
            target: SIGNING_TARGET,
            serial = %signed.serial,
            subject = %signed.subject,
            issuer = %signed.issuer,
            fingerprint = %signed.fingerprint,
            "Signed public key certificate"
        );
        Ok(signed)
    }
}

fn to_offset(instant: DateTime<Utc>) -> SigningResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(instant.timestamp())
        .map_err(|e| SigningError::builder(format!("Unrepresentable time {}: {}", instant, e)))
}

fn from_timestamp(seconds: i64) -> SigningResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| SigningError::Conversion(format!("Invalid timestamp {}", seconds)))
}
