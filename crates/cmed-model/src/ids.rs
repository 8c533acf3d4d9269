//! Identifier newtypes.
//!
//! Barcodes and registration numbers are normalized at construction so that
//! every index key in the system is already in comparison form. Parsing is
//! total: malformed input yields `None`, never an error, because a missing
//! or garbage barcode is an expected state of transaction data.

use std::fmt;

use crate::CmedError;

/// Key length shared by EAN barcodes and ANVISA registration numbers.
const KEY_DIGITS: usize = 13;

/// Stable identifier of one canonical product.
///
/// Lexicographic ordering on the inner string is the deterministic
/// tie-break of last resort in the fuzzy matcher.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(value: impl Into<String>) -> Result<Self, CmedError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CmedError::InvalidProductId(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized EAN-13 barcode.
///
/// Normalization: keep digits only, take the last 13 of a 14-digit GTIN,
/// left-pad shorter codes with zeros. An all-zero code or anything that
/// does not land on exactly 13 digits is rejected.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Barcode(String);

impl Barcode {
    /// Parse a raw barcode field. Returns `None` for absent, placeholder
    /// ("SEM GTIN"), or structurally invalid values.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        let digits = if digits.len() == KEY_DIGITS + 1 {
            digits[1..].to_string()
        } else {
            digits
        };
        if digits.len() > KEY_DIGITS {
            return None;
        }
        let padded = format!("{digits:0>width$}", width = KEY_DIGITS);
        if padded.bytes().all(|b| b == b'0') {
            return None;
        }
        Some(Self(padded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized ANVISA registration number (13 digits).
///
/// Unlike barcodes, overlong values are truncated to the first 13 digits;
/// source systems append check digits inconsistently.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RegistrationNumber(String);

impl RegistrationNumber {
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        let truncated = if digits.len() > KEY_DIGITS {
            digits[..KEY_DIGITS].to_string()
        } else {
            digits
        };
        let padded = format!("{truncated:0>width$}", width = KEY_DIGITS);
        if padded.bytes().all(|b| b == b'0') {
            return None;
        }
        Some(Self(padded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deterministic transaction row identifier.
///
/// Derived from a stable source id plus the record number, rendered as
/// lowercase hex. Two runs over the same input produce the same ids.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TransactionId([u8; 16]);

impl TransactionId {
    pub fn from_first_16_bytes_of_sha256(digest: [u8; 32]) -> Self {
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest[..16]);
        Self(out)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
