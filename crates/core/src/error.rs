// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use fieldbook_domain::DomainError;

/// Errors raised by the availability and booking engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A domain rule was violated.
    DomainViolation(DomainError),
    /// The service does not exist for the business or is inactive.
    ServiceNotFound {
        /// The requested service.
        service_id: i64,
    },
    /// The requested interval can no longer be reserved.
    ///
    /// Raised when capacity was taken by a concurrent booking, when the
    /// booking horizon moved past the requested start, or when the
    /// reservation lock could not be acquired in time.
    SlotNoLongerAvailable {
        /// Description of what was lost.
        reason: String,
    },
    /// A customer address was supplied that the business does not serve.
    AreaNotServiced {
        /// The normalized postal code.
        postal_code: String,
        /// ISO country code.
        country: String,
    },
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainViolation(err) => write!(f, "Domain violation: {err}"),
            Self::ServiceNotFound { service_id } => {
                write!(f, "Service {service_id} not found or inactive")
            }
            Self::SlotNoLongerAvailable { reason } => {
                write!(f, "Slot no longer available: {reason}")
            }
            Self::AreaNotServiced {
                postal_code,
                country,
            } => write!(f, "Postal code {postal_code} ({country}) is not serviced"),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<DomainError> for CoreError {
    fn from(err: DomainError) -> Self {
        Self::DomainViolation(err)
    }
}
