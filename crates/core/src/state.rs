// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use chrono_tz::Tz;
use fieldbook_audit::BookingEvent;
use fieldbook_domain::{BookableService, Booking, BookingAssignment, NewBooking, Technician};

/// Everything the engine reads to evaluate capacity for one service.
///
/// Loaded by the caller as an explicit snapshot. Inside a commit the snapshot
/// is read within the same write transaction that stores the booking.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilitySnapshot {
    pub service: BookableService,
    /// Timezone local wall-clock times are resolved in.
    pub tz: Tz,
    /// Response-time floor of the resolved service area, zero without one.
    pub min_response_time_hours: u32,
    /// Technicians of the business. Inactive ones are filtered by the engine.
    pub technicians: Vec<Technician>,
    /// Non-cancelled booking assignments that may overlap the query.
    pub assignments: Vec<BookingAssignment>,
}

/// A booking ready to be stored with its creation event.
///
/// Transitions are atomic: the booking and the event are stored together
/// or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPlan {
    pub booking: NewBooking,
    pub event: BookingEvent,
}

/// The result of a successful status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    /// The booking after the transition.
    pub booking: Booking,
    /// The event recording this transition.
    pub event: BookingEvent,
}
