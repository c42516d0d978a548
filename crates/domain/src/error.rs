// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::postal::CountryCode;

/// Errors that can occur during domain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Country code is not one of the supported postal systems.
    InvalidCountryCode(String),
    /// Postal code does not match the country's format.
    InvalidPostalCode {
        /// The country whose format was applied.
        country: CountryCode,
        /// The raw postal code as supplied.
        postal_code: String,
        /// Why the postal code was rejected.
        reason: String,
    },
    /// Timezone is not a known IANA timezone name.
    InvalidTimezone(String),
    /// A service or working-hours window is malformed.
    InvalidServiceWindow {
        /// Description of the validation error.
        reason: String,
    },
    /// Weekday number outside ISO 1-7.
    InvalidWeekday(u8),
    /// Service duration settings are inconsistent.
    InvalidDuration {
        /// Description of the validation error.
        reason: String,
    },
    /// Technician count bounds are inconsistent.
    InvalidTechnicianCount {
        /// Minimum technicians required.
        min: u32,
        /// Maximum technicians allowed.
        max: u32,
    },
    /// Response-time bounds are inconsistent.
    InvalidResponseWindow {
        /// Minimum response hours.
        min: u32,
        /// Maximum response hours.
        max: u32,
    },
    /// Interval end is not after its start.
    InvalidInterval {
        /// Interval start (RFC 3339).
        start: String,
        /// Interval end (RFC 3339).
        end: String,
    },
    /// A customer-supplied field failed validation.
    InvalidCustomerField {
        /// The field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// Idempotency key is empty, too long or contains control characters.
    InvalidIdempotencyKey(String),
    /// Unknown booking status string.
    InvalidBookingStatus {
        /// The rejected status.
        status: String,
    },
    /// Status transition not permitted by the booking lifecycle.
    InvalidStatusTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
        /// Why the transition was refused.
        reason: String,
    },
    /// Unknown price type string.
    InvalidPriceType(String),
    /// Unknown contact method string.
    InvalidContactMethod(String),
    /// Unknown booking source string.
    InvalidBookingSource(String),
    /// Requested interval falls outside the service's weekday/time window.
    OutsideServiceWindow {
        /// Description of the violation.
        reason: String,
    },
    /// Requested start is earlier than the minimum lead time allows.
    LeadTimeNotSatisfied {
        /// Earliest permitted start (RFC 3339).
        earliest: String,
    },
    /// Requested start is beyond the advance-booking limit.
    BeyondAdvanceLimit {
        /// Latest permitted start (RFC 3339).
        latest: String,
    },
    /// Date arithmetic overflow.
    DateArithmeticOverflow {
        /// Description of the operation that failed.
        operation: String,
    },
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCountryCode(code) => {
                write!(f, "Unsupported country code '{code}'. Expected US, CA or GB")
            }
            Self::InvalidPostalCode {
                country,
                postal_code,
                reason,
            } => {
                write!(
                    f,
                    "Invalid {} postal code '{postal_code}': {reason}",
                    country.as_str()
                )
            }
            Self::InvalidTimezone(tz) => write!(f, "Invalid timezone: {tz}"),
            Self::InvalidServiceWindow { reason } => {
                write!(f, "Invalid service window: {reason}")
            }
            Self::InvalidWeekday(day) => {
                write!(f, "Invalid weekday {day}. Must be between 1 (Monday) and 7")
            }
            Self::InvalidDuration { reason } => write!(f, "Invalid duration: {reason}"),
            Self::InvalidTechnicianCount { min, max } => {
                write!(
                    f,
                    "Invalid technician count: min {min}, max {max}. Require 1 <= min <= max"
                )
            }
            Self::InvalidResponseWindow { min, max } => {
                write!(
                    f,
                    "Invalid response window: min {min}h exceeds max {max}h"
                )
            }
            Self::InvalidInterval { start, end } => {
                write!(f, "Invalid interval: end {end} is not after start {start}")
            }
            Self::InvalidCustomerField { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
            Self::InvalidIdempotencyKey(reason) => {
                write!(f, "Invalid idempotency key: {reason}")
            }
            Self::InvalidBookingStatus { status } => {
                write!(f, "Invalid booking status: {status}")
            }
            Self::InvalidStatusTransition { from, to, reason } => {
                write!(f, "Cannot transition booking from {from} to {to}: {reason}")
            }
            Self::InvalidPriceType(value) => write!(f, "Invalid price type: {value}"),
            Self::InvalidContactMethod(value) => write!(f, "Invalid contact method: {value}"),
            Self::InvalidBookingSource(value) => write!(f, "Invalid booking source: {value}"),
            Self::OutsideServiceWindow { reason } => {
                write!(f, "Requested time is outside the service window: {reason}")
            }
            Self::LeadTimeNotSatisfied { earliest } => {
                write!(f, "Requested time is too soon; earliest bookable start is {earliest}")
            }
            Self::BeyondAdvanceLimit { latest } => {
                write!(f, "Requested time is too far ahead; latest bookable start is {latest}")
            }
            Self::DateArithmeticOverflow { operation } => {
                write!(f, "Date arithmetic overflow while {operation}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
