// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Country and postal code normalization.
//!
//! Service areas are keyed by a normalized postal code, so every lookup
//! normalizes its input first. Malformed input is rejected here, before any
//! storage access happens.
//!
//! ## Formats
//!
//! - US: `NNNNN`, `NNNNN-NNNN` or `NNNNNNNNN`; normalized to the 5-digit ZIP
//! - CA: `ANA NAN` with optional space; normalized to uppercase `ANA NAN`
//! - GB: outward code (2-4 chars) + inward code (`NAA`); normalized to
//!   uppercase `OUTWARD INWARD`

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported postal systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CountryCode {
    /// United States.
    #[serde(rename = "US")]
    Us,
    /// Canada.
    #[serde(rename = "CA")]
    Ca,
    /// United Kingdom.
    #[serde(rename = "GB")]
    Gb,
}

impl CountryCode {
    /// Returns the ISO 3166-1 alpha-2 representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Ca => "CA",
            Self::Gb => "GB",
        }
    }
}

impl FromStr for CountryCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" | "USA" => Ok(Self::Us),
            "CA" | "CAN" => Ok(Self::Ca),
            "GB" | "UK" | "GBR" => Ok(Self::Gb),
            _ => Err(DomainError::InvalidCountryCode(s.to_string())),
        }
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A postal code that has passed country-specific validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostalCode {
    country: CountryCode,
    value: String,
}

impl PostalCode {
    /// Parses and normalizes a raw postal code for the given country.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPostalCode` if the input does not match
    /// the country's format.
    pub fn parse(country: CountryCode, raw: &str) -> Result<Self, DomainError> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        let value: String = match country {
            CountryCode::Us => normalize_us(&compact),
            CountryCode::Ca => normalize_ca(&compact),
            CountryCode::Gb => normalize_gb(&compact),
        }
        .map_err(|reason| DomainError::InvalidPostalCode {
            country,
            postal_code: raw.to_string(),
            reason,
        })?;

        Ok(Self { country, value })
    }

    /// Returns the country this postal code belongs to.
    #[must_use]
    pub const fn country(&self) -> CountryCode {
        self.country
    }

    /// Returns the normalized postal code.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for PostalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

fn normalize_us(compact: &str) -> Result<String, String> {
    let digits_only = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    if !compact.is_ascii() {
        return Err(String::from("expected digits only"));
    }

    match compact.len() {
        5 | 9 if digits_only(compact) => Ok(compact[..5].to_string()),
        10 => {
            let (zip, rest) = compact.split_at(5);
            match rest.strip_prefix('-') {
                Some(plus4) if digits_only(zip) && digits_only(plus4) => Ok(zip.to_string()),
                _ => Err(String::from("expected ZIP+4 in the form NNNNN-NNNN")),
            }
        }
        _ => Err(String::from("expected 5-digit ZIP or ZIP+4")),
    }
}

/// Letters never used in Canadian postal codes.
const CA_EXCLUDED_LETTERS: &[char] = &['D', 'F', 'I', 'O', 'Q', 'U'];

fn normalize_ca(compact: &str) -> Result<String, String> {
    let chars: Vec<char> = compact.chars().collect();
    if chars.len() != 6 {
        return Err(String::from("expected six characters in the form ANA NAN"));
    }

    for (index, c) in chars.iter().enumerate() {
        let valid: bool = if index % 2 == 0 {
            c.is_ascii_alphabetic() && !CA_EXCLUDED_LETTERS.contains(c)
        } else {
            c.is_ascii_digit()
        };
        if !valid {
            return Err(format!("unexpected character '{c}' at position {}", index + 1));
        }
    }

    Ok(format!("{} {}", &compact[..3], &compact[3..]))
}

fn normalize_gb(compact: &str) -> Result<String, String> {
    if !(5..=7).contains(&compact.len()) || !compact.is_ascii() {
        return Err(String::from("expected 5 to 7 characters"));
    }

    let (outward, inward) = compact.split_at(compact.len() - 3);
    let inward_chars: Vec<char> = inward.chars().collect();

    let inward_valid: bool = inward_chars[0].is_ascii_digit()
        && inward_chars[1].is_ascii_alphabetic()
        && inward_chars[2].is_ascii_alphabetic();
    if !inward_valid {
        return Err(String::from("inward code must be a digit followed by two letters"));
    }

    let outward_valid: bool = outward.chars().all(|c| c.is_ascii_alphanumeric())
        && outward.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && outward.chars().any(|c| c.is_ascii_digit());
    if !outward_valid {
        return Err(String::from("outward code must start with a letter and contain a digit"));
    }

    Ok(format!("{outward} {inward}"))
}

/// Coarse proximity between two normalized postal codes of the same country.
///
/// Numeric codes compare by absolute difference. Alphanumeric codes compare by
/// how many trailing characters differ after the longest shared prefix.
/// Used only when geographic coordinates are unavailable.
#[must_use]
pub fn postal_proximity(a: &PostalCode, b: &PostalCode) -> u64 {
    let numeric = |s: &str| s.parse::<u64>().ok();

    if let (Some(x), Some(y)) = (numeric(a.value()), numeric(b.value())) {
        return x.abs_diff(y);
    }

    let a_chars: Vec<char> = a.value().chars().filter(|c| !c.is_whitespace()).collect();
    let b_chars: Vec<char> = b.value().chars().filter(|c| !c.is_whitespace()).collect();
    let shared: usize = a_chars
        .iter()
        .zip(b_chars.iter())
        .take_while(|(x, y)| x == y)
        .count();
    let longest: usize = a_chars.len().max(b_chars.len());

    u64::try_from(longest - shared).unwrap_or(u64::MAX)
}
