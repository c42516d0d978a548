// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Error types for the API layer.

use fieldbook::CoreError;
use fieldbook_domain::DomainError;
use fieldbook_persistence::PersistenceError;

/// API-level errors.
///
/// These are distinct from domain/core errors and represent the API contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A request field is missing, malformed or out of range.
    InvalidFormat {
        /// The offending field.
        field: String,
        /// Description of the problem.
        message: String,
    },
    /// The service does not exist for the business or is inactive.
    ServiceNotFound {
        /// The requested service.
        service_id: i64,
    },
    /// A backing store could not be reached. The request may be retried.
    ServiceUnavailable {
        /// Description of the outage.
        message: String,
    },
    /// The requested slot was taken or expired between browse and commit.
    SlotNoLongerAvailable {
        /// Description of what was lost.
        message: String,
    },
    /// No booking with this identifier exists.
    BookingNotFound {
        /// The requested booking.
        booking_id: i64,
    },
    /// The booking's current status does not permit the requested change.
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
        /// Why the change was refused.
        message: String,
    },
    /// The customer's address is outside the business's coverage.
    AreaNotServiced {
        /// The normalized postal code.
        postal_code: String,
        /// ISO country code.
        country: String,
    },
    /// An unexpected internal error occurred.
    Internal {
        /// Description of the error.
        message: String,
    },
}

impl ApiError {
    /// Stable machine-readable code for the error body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
            Self::ServiceNotFound { .. } => "SERVICE_NOT_FOUND",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::SlotNoLongerAvailable { .. } => "SLOT_NO_LONGER_AVAILABLE",
            Self::BookingNotFound { .. } => "BOOKING_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AreaNotServiced { .. } => "AREA_NOT_SERVICED",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    /// Whether the same request may succeed if sent again.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. } | Self::SlotNoLongerAvailable { .. }
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat { field, message } => {
                write!(f, "Invalid {field}: {message}")
            }
            Self::ServiceNotFound { service_id } => {
                write!(f, "Service {service_id} not found")
            }
            Self::ServiceUnavailable { message } => {
                write!(f, "Service temporarily unavailable: {message}")
            }
            Self::SlotNoLongerAvailable { message } => {
                write!(f, "Requested slot is no longer available: {message}")
            }
            Self::BookingNotFound { booking_id } => {
                write!(f, "Booking {booking_id} not found")
            }
            Self::InvalidTransition { from, to, message } => {
                write!(f, "Cannot move booking from {from} to {to}: {message}")
            }
            Self::AreaNotServiced {
                postal_code,
                country,
            } => {
                write!(f, "We do not service {postal_code} ({country})")
            }
            Self::Internal { message } => write!(f, "Internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

fn invalid(field: &str, err: &DomainError) -> ApiError {
    ApiError::InvalidFormat {
        field: field.to_string(),
        message: err.to_string(),
    }
}

/// Translates a domain error into an API error.
///
/// Errors caused by the caller's input become `InvalidFormat` tagged with
/// the request field. Catalog settings that fail validation are the
/// business's misconfiguration, not the caller's, and surface as `Internal`.
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn translate_domain_error(err: DomainError) -> ApiError {
    match &err {
        DomainError::InvalidCountryCode(_) => invalid("country_code", &err),
        DomainError::InvalidPostalCode { .. } => invalid("postal_code", &err),
        DomainError::InvalidTimezone(_) => invalid("timezone", &err),
        DomainError::InvalidCustomerField { field, .. } => invalid(field, &err),
        DomainError::InvalidIdempotencyKey(_) => invalid("idempotency_key", &err),
        DomainError::InvalidBookingStatus { .. } => invalid("status", &err),
        DomainError::InvalidContactMethod(_) => invalid("preferred_contact_method", &err),
        DomainError::InvalidBookingSource(_) => invalid("source", &err),
        DomainError::InvalidInterval { .. }
        | DomainError::OutsideServiceWindow { .. }
        | DomainError::LeadTimeNotSatisfied { .. }
        | DomainError::BeyondAdvanceLimit { .. } => invalid("requested_at", &err),
        DomainError::DateArithmeticOverflow { .. } => invalid("date", &err),
        DomainError::InvalidStatusTransition { from, to, reason } => ApiError::InvalidTransition {
            from: from.clone(),
            to: to.clone(),
            message: reason.clone(),
        },
        DomainError::InvalidServiceWindow { .. }
        | DomainError::InvalidWeekday(_)
        | DomainError::InvalidDuration { .. }
        | DomainError::InvalidTechnicianCount { .. }
        | DomainError::InvalidResponseWindow { .. }
        | DomainError::InvalidPriceType(_) => ApiError::Internal {
            message: format!("Service catalog misconfigured: {err}"),
        },
    }
}

/// Translates a core error into an API error.
#[must_use]
pub fn translate_core_error(err: CoreError) -> ApiError {
    match err {
        CoreError::DomainViolation(domain_err) => translate_domain_error(domain_err),
        CoreError::ServiceNotFound { service_id } => ApiError::ServiceNotFound { service_id },
        CoreError::SlotNoLongerAvailable { reason } => {
            ApiError::SlotNoLongerAvailable { message: reason }
        }
        CoreError::AreaNotServiced {
            postal_code,
            country,
        } => ApiError::AreaNotServiced {
            postal_code,
            country,
        },
    }
}

/// Translates a persistence error into an API error.
///
/// Storage outages are retryable `ServiceUnavailable`; records that cannot
/// be decoded are `Internal`.
#[must_use]
pub fn translate_persistence_error(err: PersistenceError) -> ApiError {
    match err {
        PersistenceError::BookingNotFound(booking_id) => ApiError::BookingNotFound { booking_id },
        PersistenceError::CommitRejected(core_err) => translate_core_error(core_err),
        PersistenceError::DatabaseError(_)
        | PersistenceError::DatabaseConnectionFailed(_)
        | PersistenceError::MigrationFailed(_)
        | PersistenceError::QueryFailed(_)
        | PersistenceError::InitializationError(_)
        | PersistenceError::ForeignKeyEnforcementNotEnabled
        | PersistenceError::DuplicateIdempotencyKey(_) => ApiError::ServiceUnavailable {
            message: err.to_string(),
        },
        PersistenceError::CorruptRecord { .. }
        | PersistenceError::SerializationError(_)
        | PersistenceError::NotFound(_) => ApiError::Internal {
            message: err.to_string(),
        },
    }
}
