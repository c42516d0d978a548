// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Slot computation.
//!
//! ## Algorithm
//!
//! 1. Clip the requested local date range to the booking horizon
//!    (`now + lead` to `now + max_advance_days`)
//! 2. Walk each offered weekday from the service window start in steps of
//!    the estimated duration
//! 3. Keep candidates whose qualifying technicians give a non-zero capacity
//!
//! Local times that do not exist in the timezone are skipped.

use crate::error::CoreError;
use crate::state::AvailabilitySnapshot;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use fieldbook_domain::{
    BookableService, BookingAssignment, DomainError, Interval, Technician, TimeOfDay, TimeSlot,
};
use std::collections::{BTreeMap, BTreeSet};

/// Optional narrowing of an availability query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilters {
    /// Only return slots this technician can take; listed first.
    pub preferred_technician_id: Option<i64>,
    /// Technicians never considered.
    pub excluded_technician_ids: BTreeSet<i64>,
    /// Parts of the day to keep. Empty keeps all.
    pub preferred_times: Vec<TimeOfDay>,
}

/// An availability query over inclusive local dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub filters: SlotFilters,
}

/// Open slots grouped by local calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    pub slots_by_date: BTreeMap<NaiveDate, Vec<TimeSlot>>,
    pub earliest: Option<DateTime<FixedOffset>>,
    pub latest: Option<DateTime<FixedOffset>>,
    pub total_slots: usize,
}

/// Computes open slots for a service over a date range.
///
/// An empty window (end before start, or a range entirely outside the
/// booking horizon) yields an empty result rather than an error.
///
/// # Errors
///
/// Returns `CoreError::ServiceNotFound` for an inactive service, or a
/// domain violation if the service's catalog settings are inconsistent.
pub fn compute_availability(
    snapshot: &AvailabilitySnapshot,
    query: &AvailabilityQuery,
    now: DateTime<Utc>,
) -> Result<Availability, CoreError> {
    let service: &BookableService = &snapshot.service;
    if !service.is_active {
        return Err(CoreError::ServiceNotFound {
            service_id: service.service_id.unwrap_or_default(),
        });
    }
    service.validate()?;

    let Some(window) = effective_window(
        service,
        snapshot.min_response_time_hours,
        query.start_date,
        query.end_date,
        snapshot.tz,
        now,
    )?
    else {
        return Ok(Availability::default());
    };

    let mut availability: Availability = Availability::default();
    let first_day: NaiveDate = window.start().with_timezone(&snapshot.tz).date_naive();
    let last_day: NaiveDate = (window.end() - Duration::seconds(1))
        .with_timezone(&snapshot.tz)
        .date_naive();

    for day in first_day.iter_days().take_while(|d| *d <= last_day) {
        if !service.offered_on(day.weekday()) {
            continue;
        }

        let slots: Vec<TimeSlot> = candidate_intervals(service, day, snapshot.tz)
            .into_iter()
            .filter(|interval| interval.start() >= window.start() && interval.end() <= window.end())
            .filter_map(|interval| evaluate_slot(snapshot, &interval, &query.filters))
            .collect();

        if !slots.is_empty() {
            availability.total_slots += slots.len();
            availability.slots_by_date.insert(day, slots);
        }
    }

    availability.earliest = availability
        .slots_by_date
        .values()
        .next()
        .and_then(|slots| slots.first())
        .map(|slot| slot.start);
    availability.latest = availability
        .slots_by_date
        .values()
        .next_back()
        .and_then(|slots| slots.last())
        .map(|slot| slot.start);

    Ok(availability)
}

/// Minimum notice for a service in an area, in hours.
#[must_use]
pub fn lead_time_hours(service: &BookableService, min_response_time_hours: u32) -> u32 {
    service.min_lead_time_hours.max(min_response_time_hours)
}

/// Earliest and latest permitted booking instants at `now`.
///
/// # Errors
///
/// Returns `DomainError::DateArithmeticOverflow` if the horizon cannot be
/// represented.
pub fn booking_horizon(
    service: &BookableService,
    min_response_time_hours: u32,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), DomainError> {
    let lead: Duration = Duration::hours(i64::from(lead_time_hours(
        service,
        min_response_time_hours,
    )));
    let advance: Duration = Duration::days(i64::from(service.max_advance_days));

    let earliest = now
        .checked_add_signed(lead)
        .ok_or_else(|| DomainError::DateArithmeticOverflow {
            operation: String::from("adding lead time"),
        })?;
    let latest = now
        .checked_add_signed(advance)
        .ok_or_else(|| DomainError::DateArithmeticOverflow {
            operation: String::from("adding advance-booking limit"),
        })?;
    Ok((earliest, latest))
}

/// Intersects the requested local date range with the booking horizon.
///
/// Returns `None` when the resulting window is empty.
///
/// # Errors
///
/// Returns `DomainError::DateArithmeticOverflow` at the edges of the
/// representable calendar.
pub fn effective_window(
    service: &BookableService,
    min_response_time_hours: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<Option<Interval>, DomainError> {
    if end_date < start_date {
        return Ok(None);
    }

    let (earliest, latest) = booking_horizon(service, min_response_time_hours, now)?;
    let day_after_end: NaiveDate =
        end_date
            .succ_opt()
            .ok_or_else(|| DomainError::DateArithmeticOverflow {
                operation: String::from("advancing past end date"),
            })?;

    let start: DateTime<Utc> = start_of_day(tz, start_date)?.max(earliest);
    let end: DateTime<Utc> = start_of_day(tz, day_after_end)?.min(latest);

    if start >= end {
        return Ok(None);
    }
    Ok(Some(Interval::new(start, end)?))
}

/// First existing instant of a local date.
fn start_of_day(tz: Tz, date: NaiveDate) -> Result<DateTime<Utc>, DomainError> {
    (0..=3)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| local_to_utc(tz, date.and_time(time)))
        .ok_or_else(|| DomainError::DateArithmeticOverflow {
            operation: format!("resolving start of {date} in {tz}"),
        })
}

/// Resolves a local wall-clock time to UTC.
///
/// Nonexistent times yield `None`. Ambiguous times resolve to the earlier
/// instant.
#[must_use]
pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Candidate slot intervals for one local day, before capacity checks.
fn candidate_intervals(service: &BookableService, day: NaiveDate, tz: Tz) -> Vec<Interval> {
    let step: Duration = Duration::minutes(i64::from(service.estimated_duration_minutes));
    let window_end: NaiveTime = service.available_times.end();
    let mut intervals: Vec<Interval> = Vec::new();
    let mut local_start: NaiveTime = service.available_times.start();

    loop {
        let (local_end, wrapped) = local_start.overflowing_add_signed(step);
        if wrapped != 0 || local_end > window_end || local_end <= local_start {
            break;
        }

        let start = local_to_utc(tz, day.and_time(local_start));
        let end = local_to_utc(tz, day.and_time(local_end));
        if let (Some(start), Some(end)) = (start, end) {
            if let Ok(interval) = Interval::new(start, end) {
                intervals.push(interval);
            }
        }

        local_start = local_end;
    }

    intervals
}

fn evaluate_slot(
    snapshot: &AvailabilitySnapshot,
    interval: &Interval,
    filters: &SlotFilters,
) -> Option<TimeSlot> {
    let service: &BookableService = &snapshot.service;
    let local_start = interval.start().with_timezone(&snapshot.tz);

    if !filters.preferred_times.is_empty()
        && !filters
            .preferred_times
            .contains(&TimeOfDay::of(local_start.time()))
    {
        return None;
    }

    let mut technician_ids: Vec<i64> = qualifying_technicians(
        &snapshot.technicians,
        &snapshot.assignments,
        service,
        interval,
        snapshot.tz,
        &filters.excluded_technician_ids,
    );

    if let Some(preferred) = filters.preferred_technician_id {
        let position = technician_ids.iter().position(|id| *id == preferred)?;
        let preferred = technician_ids.remove(position);
        technician_ids.insert(0, preferred);
    }

    let qualifying: u32 = u32::try_from(technician_ids.len()).unwrap_or(u32::MAX);
    let capacity: u32 = qualifying / service.min_technicians.max(1);
    if capacity == 0 {
        return None;
    }

    let booked_count: usize = snapshot
        .assignments
        .iter()
        .filter(|a| a.interval.overlaps(interval))
        .count();

    let duration: u32 = u32::try_from(interval.duration_minutes()).unwrap_or(u32::MAX);

    Some(TimeSlot {
        start: local_start.fixed_offset(),
        end: interval.end().with_timezone(&snapshot.tz).fixed_offset(),
        capacity,
        booked_count: u32::try_from(booked_count).unwrap_or(u32::MAX),
        technician_ids,
        price_cents: service.slot_price_cents(duration),
    })
}

/// Technicians able to take `interval`, in ascending identifier order.
///
/// A technician qualifies when active, holding every required skill,
/// working the whole interval in local time, free of external commitments
/// and free of overlapping non-cancelled assignments.
#[must_use]
pub fn qualifying_technicians(
    technicians: &[Technician],
    assignments: &[BookingAssignment],
    service: &BookableService,
    interval: &Interval,
    tz: Tz,
    excluded: &BTreeSet<i64>,
) -> Vec<i64> {
    let busy: BTreeSet<i64> = assignments
        .iter()
        .filter(|a| a.interval.overlaps(interval))
        .flat_map(|a| a.technician_ids.iter().copied())
        .collect();

    let mut ids: Vec<i64> = technicians
        .iter()
        .filter(|t| t.is_active && t.has_skills(&service.required_skills))
        .filter_map(|t| t.technician_id.map(|id| (id, t)))
        .filter(|(id, _)| !excluded.contains(id) && !busy.contains(id))
        .filter(|(_, t)| t.works_during(interval, tz) && !t.is_committed_during(interval))
        .map(|(id, _)| id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Technicians that could ever take the service: active and skilled.
///
/// Used to pick reservation lock keys before the detailed check.
#[must_use]
pub fn candidate_technicians(technicians: &[Technician], service: &BookableService) -> Vec<i64> {
    let mut ids: Vec<i64> = technicians
        .iter()
        .filter(|t| t.is_active && t.has_skills(&service.required_skills))
        .filter_map(|t| t.technician_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
