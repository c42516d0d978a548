// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking planning: the checks a commit repeats against fresh state.

use crate::availability::{booking_horizon, qualifying_technicians};
use crate::error::CoreError;
use crate::state::{AvailabilitySnapshot, BookingPlan};
use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use fieldbook_audit::{Action, Actor, BookingEvent, Cause};
use fieldbook_domain::{
    BookableService, BookingSource, BookingStatus, CustomerContact, DomainError, IdempotencyKey,
    Interval, NewBooking, ServiceAddress, validate_customer_contact, validate_service_address,
};
use std::collections::BTreeSet;

/// A request to book one service interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub business_id: i64,
    pub service_id: i64,
    /// Requested start. The end follows from the estimated duration.
    pub requested_start: DateTime<Utc>,
    pub preferred_technician_id: Option<i64>,
    pub customer: CustomerContact,
    pub address: ServiceAddress,
    pub problem_description: Option<String>,
    pub source: BookingSource,
    pub idempotency_key: IdempotencyKey,
}

impl BookingRequest {
    /// Validates customer-supplied fields.
    ///
    /// # Errors
    ///
    /// Returns a domain violation for blank names, malformed phone or email
    /// values and blank address lines.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_customer_contact(&self.customer)?;
        validate_service_address(&self.address)?;
        Ok(())
    }

    /// The actor recorded for the creation event.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::new(self.customer.name.clone(), String::from("customer"))
    }

    /// The cause recorded for the creation event.
    #[must_use]
    pub fn cause(&self) -> Cause {
        Cause::new(
            self.idempotency_key.to_string(),
            format!("Booking request via {}", self.source.as_str()),
        )
    }
}

/// The interval a booking starting at `start` occupies.
///
/// # Errors
///
/// Returns a domain violation if the duration is zero or overflows.
pub fn requested_interval(
    service: &BookableService,
    start: DateTime<Utc>,
) -> Result<Interval, CoreError> {
    let end: DateTime<Utc> = start
        .checked_add_signed(Duration::minutes(i64::from(
            service.estimated_duration_minutes,
        )))
        .ok_or_else(|| DomainError::DateArithmeticOverflow {
            operation: String::from("deriving booking end"),
        })?;
    Ok(Interval::new(start, end)?)
}

/// Checks the interval against the service's offered weekdays and local
/// time-of-day window.
///
/// # Errors
///
/// Returns `DomainError::OutsideServiceWindow` when the interval is not
/// bookable on any calendar.
pub fn check_service_window(
    service: &BookableService,
    interval: &Interval,
    tz: Tz,
) -> Result<(), CoreError> {
    let local_start = interval.start().with_timezone(&tz);
    let local_end = interval.end().with_timezone(&tz);

    if !service.offered_on(local_start.weekday()) {
        return Err(DomainError::OutsideServiceWindow {
            reason: format!("{} is not offered on {}", service.name, local_start.weekday()),
        }
        .into());
    }

    let same_day: bool = local_start.date_naive() == local_end.date_naive();
    if !same_day
        || !service
            .available_times
            .covers(local_start.time(), local_end.time())
    {
        return Err(DomainError::OutsideServiceWindow {
            reason: format!(
                "{} to {} is outside {} to {}",
                local_start.time(),
                local_end.time(),
                service.available_times.start(),
                service.available_times.end()
            ),
        }
        .into());
    }
    Ok(())
}

/// Checks lead-time and advance-booking limits at `now`.
///
/// # Errors
///
/// Returns `CoreError::SlotNoLongerAvailable`: a slot that was open when
/// browsed may have moved inside the lead time since.
pub fn check_booking_horizon(
    service: &BookableService,
    min_response_time_hours: u32,
    interval: &Interval,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    let (earliest, latest) = booking_horizon(service, min_response_time_hours, now)?;
    if interval.start() < earliest {
        return Err(CoreError::SlotNoLongerAvailable {
            reason: DomainError::LeadTimeNotSatisfied {
                earliest: earliest.to_rfc3339(),
            }
            .to_string(),
        });
    }
    if interval.end() > latest {
        return Err(CoreError::SlotNoLongerAvailable {
            reason: DomainError::BeyondAdvanceLimit {
                latest: latest.to_rfc3339(),
            }
            .to_string(),
        });
    }
    Ok(())
}

/// Picks exactly `needed` technicians from `qualifying`.
///
/// The preferred technician takes the first seat when qualifying; remaining
/// seats go by ascending identifier. Returns `None` when too few qualify.
#[must_use]
pub fn select_technicians(
    qualifying: &[i64],
    preferred: Option<i64>,
    needed: u32,
) -> Option<Vec<i64>> {
    let needed: usize = usize::try_from(needed).ok()?;
    if qualifying.len() < needed {
        return None;
    }

    let mut ordered: Vec<i64> = qualifying.to_vec();
    ordered.sort_unstable();
    if let Some(position) = preferred.and_then(|p| ordered.iter().position(|id| *id == p)) {
        let id = ordered.remove(position);
        ordered.insert(0, id);
    }
    ordered.truncate(needed);
    Some(ordered)
}

/// Plans a booking against a fresh snapshot.
///
/// Repeats the qualifying-technician check for the requested interval and
/// assigns exactly `min_technicians`. The snapshot must be read in the same
/// write transaction that stores the plan.
///
/// # Errors
///
/// Returns an error if:
/// - The service is inactive (`ServiceNotFound`)
/// - The interval falls outside the service window (domain violation)
/// - The lead-time or advance limit no longer holds, or fewer than
///   `min_technicians` still qualify (`SlotNoLongerAvailable`)
pub fn plan_booking(
    snapshot: &AvailabilitySnapshot,
    request: &BookingRequest,
    confirmation_code: String,
    now: DateTime<Utc>,
) -> Result<BookingPlan, CoreError> {
    let service: &BookableService = &snapshot.service;
    if !service.is_active || service.business_id != request.business_id {
        return Err(CoreError::ServiceNotFound {
            service_id: request.service_id,
        });
    }

    let interval: Interval = requested_interval(service, request.requested_start)?;
    check_service_window(service, &interval, snapshot.tz)?;
    check_booking_horizon(service, snapshot.min_response_time_hours, &interval, now)?;

    let qualifying: Vec<i64> = qualifying_technicians(
        &snapshot.technicians,
        &snapshot.assignments,
        service,
        &interval,
        snapshot.tz,
        &BTreeSet::new(),
    );
    let technician_ids: Vec<i64> = select_technicians(
        &qualifying,
        request.preferred_technician_id,
        service.min_technicians,
    )
    .ok_or_else(|| CoreError::SlotNoLongerAvailable {
        reason: format!(
            "{} of {} required technicians are free at {}",
            qualifying.len(),
            service.min_technicians,
            interval.start().to_rfc3339()
        ),
    })?;

    let booking: NewBooking = NewBooking {
        business_id: request.business_id,
        service_id: request.service_id,
        confirmation_code,
        requested_at: now,
        scheduled: interval,
        technician_ids,
        customer: request.customer.clone(),
        address: request.address.clone(),
        problem_description: request.problem_description.clone(),
        source: request.source,
        idempotency_key: request.idempotency_key.clone(),
        created_at: now,
    };

    let event: BookingEvent = BookingEvent::new(
        0,
        request.actor(),
        request.cause(),
        Action::new(
            String::from("CreateBooking"),
            Some(format!(
                "Booked {} at {}",
                service.name,
                interval.start().to_rfc3339()
            )),
        ),
        None,
        BookingStatus::Pending,
        now,
    );

    Ok(BookingPlan { booking, event })
}
