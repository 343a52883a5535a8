//! Time-based one-time codes rendered over an arbitrary character set.
//!
//! Codes follow HOTP dynamic truncation (RFC 4226) driven by a time counter
//! (RFC 6238). Instead of taking the truncated value modulo `10^digits`, the
//! value is spelled out in base `char_set.len()`, so a decimal character set
//! yields the familiar numeric codes while the default set yields short
//! uppercase codes without the look-alike characters `0`, `O` and `I`.

use data_encoding::{BASE32, BASE32_NOPAD};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use subtle::ConstantTimeEq;
use std::{
    fmt,
    str::FromStr,
    time::{SystemTime, UNIX_EPOCH},
};

pub const DEFAULT_CHAR_SET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ123456789";
pub const DEFAULT_DIGITS: u32 = 6;
pub const DEFAULT_ALGORITHM: OtpAlgorithm = OtpAlgorithm::Sha256;

const SECRET_BYTES: usize = 20;
const MAX_DIGITS: u32 = 10;
// Steps accepted on either side of the current one.
const VERIFY_WINDOW: u64 = 1;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("unsupported OTP algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("OTP secret must be valid base32")]
    InvalidSecret,
    #[error("OTP period must be greater than zero")]
    InvalidPeriod,
    #[error("OTP character set needs at least two distinct characters")]
    InvalidCharSet,
    #[error("OTP digits must be between 1 and {MAX_DIGITS}")]
    InvalidDigits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl OtpAlgorithm {
    #[must_use]
    pub const fn as_db_value(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    fn digest(self, key: &[u8], counter: u64) -> Result<Vec<u8>, OtpError> {
        let message = counter.to_be_bytes();
        let digest = match self {
            Self::Sha1 => {
                let mut mac =
                    Hmac::<Sha1>::new_from_slice(key).map_err(|_| OtpError::InvalidSecret)?;
                mac.update(&message);
                mac.finalize().into_bytes().to_vec()
            }
            Self::Sha256 => {
                let mut mac =
                    Hmac::<Sha256>::new_from_slice(key).map_err(|_| OtpError::InvalidSecret)?;
                mac.update(&message);
                mac.finalize().into_bytes().to_vec()
            }
            Self::Sha512 => {
                let mut mac =
                    Hmac::<Sha512>::new_from_slice(key).map_err(|_| OtpError::InvalidSecret)?;
                mac.update(&message);
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(digest)
    }
}

impl fmt::Display for OtpAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_value())
    }
}

impl FromStr for OtpAlgorithm {
    type Err = OtpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(OtpError::UnsupportedAlgorithm(value.to_string())),
        }
    }
}

/// Everything needed to regenerate and check a code; persisted per challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpParams {
    secret: String,
    algorithm: OtpAlgorithm,
    char_set: String,
    digits: u32,
    period: u64,
}

impl OtpParams {
    /// Rebuild parameters from stored values.
    ///
    /// # Errors
    /// Returns an error if any value cannot produce codes.
    pub fn new(
        secret: String,
        algorithm: OtpAlgorithm,
        char_set: String,
        digits: u32,
        period: u64,
    ) -> Result<Self, OtpError> {
        decode_secret(&secret)?;
        if period == 0 {
            return Err(OtpError::InvalidPeriod);
        }
        if digits == 0 || digits > MAX_DIGITS {
            return Err(OtpError::InvalidDigits);
        }
        let mut distinct: Vec<char> = char_set.chars().collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 || distinct.len() != char_set.chars().count() {
            return Err(OtpError::InvalidCharSet);
        }
        Ok(Self {
            secret,
            algorithm,
            char_set,
            digits,
            period,
        })
    }

    /// Fresh random secret with the default algorithm, character set and length.
    ///
    /// # Errors
    /// Returns an error if `period` is zero.
    pub fn generate(period: u64) -> Result<Self, OtpError> {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self::new(
            BASE32_NOPAD.encode(&bytes),
            DEFAULT_ALGORITHM,
            DEFAULT_CHAR_SET.to_string(),
            DEFAULT_DIGITS,
            period,
        )
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    #[must_use]
    pub fn algorithm(&self) -> OtpAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn char_set(&self) -> &str {
        &self.char_set
    }

    #[must_use]
    pub fn digits(&self) -> u32 {
        self.digits
    }

    #[must_use]
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Code for the time step containing `unix_seconds`.
    ///
    /// # Errors
    /// Returns an error if the stored secret is not valid base32.
    pub fn code_at(&self, unix_seconds: u64) -> Result<String, OtpError> {
        self.code_for_counter(unix_seconds / self.period)
    }

    /// Code for the current time step.
    ///
    /// # Errors
    /// Returns an error if the stored secret is not valid base32.
    pub fn current_code(&self) -> Result<String, OtpError> {
        self.code_at(now_unix())
    }

    /// Check `code` against the step containing `unix_seconds` and its neighbours.
    ///
    /// # Errors
    /// Returns an error if the stored secret is not valid base32.
    pub fn verify_at(&self, code: &str, unix_seconds: u64) -> Result<bool, OtpError> {
        let candidate = self.normalize(code);
        if candidate.chars().count() != self.digits as usize {
            return Ok(false);
        }
        let counter = unix_seconds / self.period;
        let first = counter.saturating_sub(VERIFY_WINDOW);
        let last = counter.saturating_add(VERIFY_WINDOW);
        let mut matched = false;
        for step in first..=last {
            let expected = self.code_for_counter(step)?;
            matched |= bool::from(expected.as_bytes().ct_eq(candidate.as_bytes()));
        }
        Ok(matched)
    }

    /// Check `code` against the current time.
    ///
    /// # Errors
    /// Returns an error if the stored secret is not valid base32.
    pub fn verify(&self, code: &str) -> Result<bool, OtpError> {
        self.verify_at(code, now_unix())
    }

    fn code_for_counter(&self, counter: u64) -> Result<String, OtpError> {
        let key = decode_secret(&self.secret)?;
        let digest = self.algorithm.digest(&key, counter)?;
        let offset = usize::from(digest[digest.len() - 1] & 0x0f);
        let mut value = (u64::from(digest[offset] & 0x7f) << 24)
            | (u64::from(digest[offset + 1]) << 16)
            | (u64::from(digest[offset + 2]) << 8)
            | u64::from(digest[offset + 3]);

        let alphabet: Vec<char> = self.char_set.chars().collect();
        let base = alphabet.len() as u64;
        let mut code = Vec::with_capacity(self.digits as usize);
        for _ in 0..self.digits {
            // `value % base` is always below `alphabet.len()`.
            code.push(alphabet[usize::try_from(value % base).unwrap_or_default()]);
            value /= base;
        }
        code.reverse();
        Ok(code.into_iter().collect())
    }

    fn normalize(&self, code: &str) -> String {
        let trimmed = code.trim();
        if self.char_set.chars().any(|c| c.is_ascii_lowercase()) {
            trimmed.to_string()
        } else {
            trimmed.to_ascii_uppercase()
        }
    }
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, OtpError> {
    let normalized = secret.trim().to_ascii_uppercase();
    let decoded = BASE32_NOPAD
        .decode(normalized.as_bytes())
        .or_else(|_| BASE32.decode(normalized.as_bytes()))
        .map_err(|_| OtpError::InvalidSecret)?;
    if decoded.is_empty() {
        return Err(OtpError::InvalidSecret);
    }
    Ok(decoded)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
