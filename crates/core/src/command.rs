// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::CoreError;
use fieldbook_domain::{BookingStatus, DomainError};

/// A command represents intent to change a stored booking, as data only.
///
/// Booking creation is not a command; it goes through `plan_booking`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Finalize technician assignment.
    Confirm,
    /// Technicians arrived and began work.
    Start,
    /// Work finished.
    Complete,
    /// Customer was absent for a confirmed appointment.
    MarkNoShow,
    /// Cancel the booking and release its technicians.
    Cancel {
        /// Why the booking was cancelled.
        reason: String,
    },
}

impl Command {
    /// Builds the command that moves a booking to `target`.
    ///
    /// Cancellation needs a reason and is built directly.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStatusTransition` for `pending` and
    /// `cancelled`.
    pub fn for_target(target: BookingStatus) -> Result<Self, CoreError> {
        match target {
            BookingStatus::Confirmed => Ok(Self::Confirm),
            BookingStatus::InProgress => Ok(Self::Start),
            BookingStatus::Completed => Ok(Self::Complete),
            BookingStatus::NoShow => Ok(Self::MarkNoShow),
            BookingStatus::Pending | BookingStatus::Cancelled => {
                Err(CoreError::DomainViolation(DomainError::InvalidStatusTransition {
                    from: String::from("any"),
                    to: target.as_str().to_string(),
                    reason: String::from("status cannot be set directly"),
                }))
            }
        }
    }

    /// The status a booking holds after this command.
    #[must_use]
    pub const fn target(&self) -> BookingStatus {
        match self {
            Self::Confirm => BookingStatus::Confirmed,
            Self::Start => BookingStatus::InProgress,
            Self::Complete => BookingStatus::Completed,
            Self::MarkNoShow => BookingStatus::NoShow,
            Self::Cancel { .. } => BookingStatus::Cancelled,
        }
    }

    /// Action name recorded in the booking history.
    #[must_use]
    pub const fn action_name(&self) -> &'static str {
        match self {
            Self::Confirm => "ConfirmBooking",
            Self::Start => "StartBooking",
            Self::Complete => "CompleteBooking",
            Self::MarkNoShow => "MarkNoShow",
            Self::Cancel { .. } => "CancelBooking",
        }
    }
}
