// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Time intervals, technicians and computed slots.
//!
//! ## Invariants
//!
//! - Intervals are half-open `[start, end)` in UTC; back-to-back intervals do
//!   not overlap
//! - Working hours are local wall-clock windows keyed by ISO weekday
//! - Slots are computed values, never persisted

use crate::catalog::{ServiceWindow, iso_weekday};
use crate::error::DomainError;
use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A half-open UTC time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInterval` if `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::InvalidInterval {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether two intervals share any instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Length of the interval in whole minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A technician: the unit of booking capacity.
///
/// Supplied as a read-only snapshot by the external roster. The engine
/// reserves against technicians through booking assignments only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    /// Database identifier. `None` until persisted.
    pub technician_id: Option<i64>,
    pub business_id: i64,
    pub name: String,
    pub skills: BTreeSet<String>,
    /// Local working window per ISO weekday. Missing days are days off.
    pub working_hours: BTreeMap<u8, ServiceWindow>,
    /// Occupied intervals from the external calendar.
    pub commitments: Vec<Interval>,
    pub is_active: bool,
}

impl Technician {
    /// Whether the technician holds every skill in `required`.
    #[must_use]
    pub fn has_skills(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.skills)
    }

    /// Whether the technician's working window covers the interval when
    /// viewed in `tz`. Intervals that cross local midnight are never covered.
    #[must_use]
    pub fn works_during(&self, interval: &Interval, tz: Tz) -> bool {
        let local_start = interval.start().with_timezone(&tz);
        let local_end = interval.end().with_timezone(&tz);
        if local_start.date_naive() != local_end.date_naive()
            && local_end.time() != NaiveTime::MIN
        {
            return false;
        }

        let weekday: u8 = iso_weekday(local_start.weekday());
        let end_time: NaiveTime = if local_end.date_naive() == local_start.date_naive() {
            local_end.time()
        } else {
            // Interval ends exactly at midnight.
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
        };

        self.working_hours
            .get(&weekday)
            .is_some_and(|window| window.covers(local_start.time(), end_time))
    }

    /// Whether an external calendar commitment overlaps the interval.
    #[must_use]
    pub fn is_committed_during(&self, interval: &Interval) -> bool {
        self.commitments.iter().any(|c| c.overlaps(interval))
    }
}

/// A non-cancelled booking's hold on one or more technicians.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingAssignment {
    pub booking_id: i64,
    pub service_id: i64,
    pub technician_ids: Vec<i64>,
    pub interval: Interval,
}

/// A bookable opportunity computed from current technician and booking state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Number of simultaneous bookings the qualifying technicians can absorb.
    pub capacity: u32,
    /// Non-cancelled bookings of any service overlapping the slot.
    pub booked_count: u32,
    pub technician_ids: Vec<i64>,
    pub price_cents: Option<i64>,
}

/// Customer preference for part of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Starts before noon.
    Morning,
    /// Starts from noon until 17:00.
    Afternoon,
    /// Starts at 17:00 or later.
    Evening,
}

impl TimeOfDay {
    /// Classifies a local start time.
    #[must_use]
    pub fn of(time: NaiveTime) -> Self {
        let noon: NaiveTime = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
        let five_pm: NaiveTime = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);
        if time < noon {
            Self::Morning
        } else if time < five_pm {
            Self::Afternoon
        } else {
            Self::Evening
        }
    }
}
