// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking records and the customer details they carry.

use crate::booking_status::BookingStatus;
use crate::error::DomainError;
use crate::postal::PostalCode;
use crate::schedule::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum length of an idempotency key, in characters.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// How the customer prefers to be contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Phone,
    Sms,
    Email,
}

impl ContactMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl FromStr for ContactMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(Self::Phone),
            "sms" => Ok(Self::Sms),
            "email" => Ok(Self::Email),
            _ => Err(DomainError::InvalidContactMethod(s.to_string())),
        }
    }
}

/// The channel a booking arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    Web,
    Phone,
    Chat,
    Partner,
    Other,
}

impl BookingSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Phone => "phone",
            Self::Chat => "chat",
            Self::Partner => "partner",
            Self::Other => "other",
        }
    }
}

impl FromStr for BookingSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "phone" => Ok(Self::Phone),
            "chat" => Ok(Self::Chat),
            "partner" => Ok(Self::Partner),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::InvalidBookingSource(s.to_string())),
        }
    }
}

/// Customer contact details and consent flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub preferred_contact_method: ContactMethod,
    pub sms_consent: bool,
    pub email_consent: bool,
}

/// Where the work will be performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub street: String,
    pub unit: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: PostalCode,
}

/// A client-supplied token that makes one logical request produce one booking.
///
/// Holds 1 to 128 printable characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Parses a key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidIdempotencyKey` if the key is empty,
    /// longer than 128 characters or contains control characters.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Err(DomainError::InvalidIdempotencyKey(String::from(
                "must not be empty",
            )));
        }
        if raw.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(DomainError::InvalidIdempotencyKey(format!(
                "must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(DomainError::InvalidIdempotencyKey(String::from(
                "must contain printable characters only",
            )));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cancellation details recorded on a cancelled booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub reason: String,
    /// Identifier of whoever cancelled (customer, dispatcher, system).
    pub cancelled_by: String,
    pub cancelled_at: DateTime<Utc>,
}

/// A booking that has been planned but not yet stored.
///
/// Produced by the engine inside the commit transaction; persistence assigns
/// the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub business_id: i64,
    pub service_id: i64,
    pub confirmation_code: String,
    pub requested_at: DateTime<Utc>,
    pub scheduled: Interval,
    /// Assigned technicians, preferred technician first.
    pub technician_ids: Vec<i64>,
    pub customer: CustomerContact,
    pub address: ServiceAddress,
    pub problem_description: Option<String>,
    pub source: BookingSource,
    pub idempotency_key: IdempotencyKey,
    pub created_at: DateTime<Utc>,
}

/// A stored booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: i64,
    pub business_id: i64,
    pub service_id: i64,
    pub confirmation_code: String,
    pub status: BookingStatus,
    pub requested_at: DateTime<Utc>,
    pub scheduled: Interval,
    pub technician_ids: Vec<i64>,
    pub customer: CustomerContact,
    pub address: ServiceAddress,
    pub problem_description: Option<String>,
    pub source: BookingSource,
    pub idempotency_key: IdempotencyKey,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancellation: Option<Cancellation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Whether this booking currently holds its technicians.
    #[must_use]
    pub const fn holds_capacity(&self) -> bool {
        self.status.holds_capacity()
    }
}
