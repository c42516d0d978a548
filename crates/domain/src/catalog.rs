// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Catalog reference data: businesses and bookable services.
//!
//! Both are owned by upstream catalog services and are read-only to the
//! booking engine.

use crate::error::DomainError;
use crate::service_area::parse_timezone;
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// A tenant of the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub business_id: i64,
    pub name: String,
    /// Default IANA timezone used when no service area is resolved.
    pub timezone: String,
    pub is_active: bool,
}

impl Business {
    /// Parses the business default timezone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTimezone` for unknown names.
    pub fn tz(&self) -> Result<Tz, DomainError> {
        parse_timezone(&self.timezone)
    }
}

/// How a service is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    Fixed,
    Hourly,
    Estimate,
}

impl PriceType {
    /// Returns the string representation used for persistence.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Hourly => "hourly",
            Self::Estimate => "estimate",
        }
    }
}

impl FromStr for PriceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "hourly" => Ok(Self::Hourly),
            "estimate" => Ok(Self::Estimate),
            _ => Err(DomainError::InvalidPriceType(s.to_string())),
        }
    }
}

/// A local wall-clock window within a day, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl ServiceWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidServiceWindow` if `end` is not after
    /// `start`. Windows never cross midnight.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::InvalidServiceWindow {
                reason: format!("end {end} must be after start {start}"),
            });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether `[from, to)` lies inside this window.
    #[must_use]
    pub fn covers(&self, from: NaiveTime, to: NaiveTime) -> bool {
        from >= self.start && to <= self.end && from < to
    }
}

/// Converts an ISO weekday number (Monday = 1) to a `chrono::Weekday`.
///
/// # Errors
///
/// Returns `DomainError::InvalidWeekday` outside 1-7.
pub fn weekday_from_iso(day: u8) -> Result<Weekday, DomainError> {
    match day {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        _ => Err(DomainError::InvalidWeekday(day)),
    }
}

/// Returns the ISO weekday number (Monday = 1) of a `chrono::Weekday`.
#[must_use]
pub fn iso_weekday(day: Weekday) -> u8 {
    match day {
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
        Weekday::Sun => 7,
    }
}

/// A service customers can book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookableService {
    /// Database identifier. `None` until persisted.
    pub service_id: Option<i64>,
    pub business_id: i64,
    pub name: String,
    pub required_skills: BTreeSet<String>,
    pub estimated_duration_minutes: u32,
    pub min_duration_minutes: u32,
    pub max_duration_minutes: u32,
    pub price_type: PriceType,
    pub base_price_cents: Option<i64>,
    pub min_technicians: u32,
    pub max_technicians: u32,
    pub min_lead_time_hours: u32,
    pub max_advance_days: u32,
    /// ISO weekdays (Monday = 1) on which the service is offered.
    pub available_days: BTreeSet<u8>,
    pub available_times: ServiceWindow,
    pub is_active: bool,
}

impl BookableService {
    /// Validates the catalog invariants of this service.
    ///
    /// # Errors
    ///
    /// Returns an error if durations, technician counts or weekdays are
    /// inconsistent.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.estimated_duration_minutes == 0 {
            return Err(DomainError::InvalidDuration {
                reason: String::from("estimated duration must be positive"),
            });
        }
        if self.min_duration_minutes > self.estimated_duration_minutes
            || self.estimated_duration_minutes > self.max_duration_minutes
        {
            return Err(DomainError::InvalidDuration {
                reason: format!(
                    "expected min {} <= estimated {} <= max {}",
                    self.min_duration_minutes,
                    self.estimated_duration_minutes,
                    self.max_duration_minutes
                ),
            });
        }
        if self.min_technicians == 0 || self.min_technicians > self.max_technicians {
            return Err(DomainError::InvalidTechnicianCount {
                min: self.min_technicians,
                max: self.max_technicians,
            });
        }
        if let Some(day) = self.available_days.iter().find(|d| !(1..=7).contains(*d)) {
            return Err(DomainError::InvalidWeekday(*day));
        }
        Ok(())
    }

    /// Whether the service is offered on the given weekday.
    #[must_use]
    pub fn offered_on(&self, day: Weekday) -> bool {
        self.available_days.contains(&iso_weekday(day))
    }

    /// Price of one slot of `duration_minutes`, if the service has one.
    ///
    /// Fixed pricing returns the base price, hourly pricing prorates the
    /// base price by the duration, estimates carry no price. An hourly price
    /// too large to prorate has no price.
    #[must_use]
    pub fn slot_price_cents(&self, duration_minutes: u32) -> Option<i64> {
        match self.price_type {
            PriceType::Fixed => self.base_price_cents,
            PriceType::Hourly => self
                .base_price_cents
                .and_then(|hourly| hourly.checked_mul(i64::from(duration_minutes)))
                .map(|total| total / 60),
            PriceType::Estimate => None,
        }
    }
}
