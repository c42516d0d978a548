// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Row types and their conversions to domain values.
//!
//! Timestamps are stored as UTC RFC 3339 text with second precision, which
//! keeps lexicographic order equal to chronological order.

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use diesel::prelude::*;
use fieldbook_audit::{Action, Actor, BookingEvent, Cause};
use fieldbook_domain::{
    BookableService, Booking, BookingStatus, Business, Cancellation, Coordinates, CountryCode,
    CustomerContact, IdempotencyKey, Interval, PostalCode, ServiceAddress, ServiceArea,
    ServiceWindow, Technician,
};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::diesel_schema::{
    booking_events, bookings, businesses, service_areas, services, technicians,
};
use crate::error::PersistenceError;

/// Formats a timestamp for storage.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Formats a local time of day for storage.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns `PersistenceError::CorruptRecord` if the text is not RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt("timestamp", format!("'{value}': {e}")))
}

fn parse_optional_timestamp(
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, PersistenceError> {
    value.map(parse_timestamp).transpose()
}

fn parse_interval(start: &str, end: &str) -> Result<Interval, PersistenceError> {
    Interval::new(parse_timestamp(start)?, parse_timestamp(end)?)
        .map_err(|e| corrupt("interval", e.to_string()))
}

fn parse_time(value: &str) -> Result<NaiveTime, PersistenceError> {
    value
        .parse::<NaiveTime>()
        .map_err(|e| corrupt("time of day", format!("'{value}': {e}")))
}

fn to_u32(value: i32, column: &'static str) -> Result<u32, PersistenceError> {
    value
        .to_u32()
        .ok_or_else(|| corrupt(column, format!("negative value {value}")))
}

/// Converts a count or duration for storage.
pub fn to_i32(value: u32, column: &'static str) -> Result<i32, PersistenceError> {
    value
        .to_i32()
        .ok_or_else(|| PersistenceError::QueryFailed(format!("{column} value {value} too large")))
}

fn corrupt(what: &str, reason: String) -> PersistenceError {
    PersistenceError::CorruptRecord {
        what: what.to_string(),
        reason,
    }
}

/// A stored working window, validated on load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowData {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl From<&ServiceWindow> for WindowData {
    fn from(window: &ServiceWindow) -> Self {
        Self {
            start: window.start(),
            end: window.end(),
        }
    }
}

/// Serializes a technician's working hours for storage.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn working_hours_json(
    hours: &BTreeMap<u8, ServiceWindow>,
) -> Result<String, PersistenceError> {
    let data: BTreeMap<u8, WindowData> =
        hours.iter().map(|(day, w)| (*day, WindowData::from(w))).collect();
    Ok(serde_json::to_string(&data)?)
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = businesses)]
pub struct BusinessRow {
    pub business_id: i64,
    pub name: String,
    pub timezone: String,
    pub is_active: i32,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Self {
            business_id: row.business_id,
            name: row.name,
            timezone: row.timezone,
            is_active: row.is_active != 0,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = service_areas)]
pub struct ServiceAreaRow {
    pub service_area_id: i64,
    pub business_id: i64,
    pub country_code: String,
    pub postal_code: String,
    pub city: String,
    pub region: String,
    pub timezone: String,
    pub dispatch_fee_cents: i64,
    pub min_response_time_hours: i32,
    pub max_response_time_hours: i32,
    pub emergency_available: i32,
    pub regular_available: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TryFrom<ServiceAreaRow> for ServiceArea {
    type Error = PersistenceError;

    fn try_from(row: ServiceAreaRow) -> Result<Self, Self::Error> {
        let country: CountryCode = row
            .country_code
            .parse()
            .map_err(|e: fieldbook_domain::DomainError| corrupt("service area", e.to_string()))?;
        let postal_code: PostalCode = PostalCode::parse(country, &row.postal_code)
            .map_err(|e| corrupt("service area", e.to_string()))?;
        let coordinates: Option<Coordinates> = match (row.latitude, row.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        Ok(Self {
            service_area_id: Some(row.service_area_id),
            business_id: row.business_id,
            postal_code,
            city: row.city,
            region: row.region,
            timezone: row.timezone,
            dispatch_fee_cents: row.dispatch_fee_cents,
            min_response_time_hours: to_u32(row.min_response_time_hours, "min_response_time_hours")?,
            max_response_time_hours: to_u32(row.max_response_time_hours, "max_response_time_hours")?,
            emergency_available: row.emergency_available != 0,
            regular_available: row.regular_available != 0,
            coordinates,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = services)]
pub struct ServiceRow {
    pub service_id: i64,
    pub business_id: i64,
    pub name: String,
    pub required_skills_json: String,
    pub estimated_duration_minutes: i32,
    pub min_duration_minutes: i32,
    pub max_duration_minutes: i32,
    pub price_type: String,
    pub base_price_cents: Option<i64>,
    pub min_technicians: i32,
    pub max_technicians: i32,
    pub min_lead_time_hours: i32,
    pub max_advance_days: i32,
    pub available_days_json: String,
    pub available_start: String,
    pub available_end: String,
    pub is_active: i32,
}

impl TryFrom<ServiceRow> for BookableService {
    type Error = PersistenceError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        let required_skills: BTreeSet<String> = serde_json::from_str(&row.required_skills_json)?;
        let available_days: BTreeSet<u8> = serde_json::from_str(&row.available_days_json)?;
        let available_times: ServiceWindow = ServiceWindow::new(
            parse_time(&row.available_start)?,
            parse_time(&row.available_end)?,
        )
        .map_err(|e| corrupt("service", e.to_string()))?;

        Ok(Self {
            service_id: Some(row.service_id),
            business_id: row.business_id,
            name: row.name,
            required_skills,
            estimated_duration_minutes: to_u32(
                row.estimated_duration_minutes,
                "estimated_duration_minutes",
            )?,
            min_duration_minutes: to_u32(row.min_duration_minutes, "min_duration_minutes")?,
            max_duration_minutes: to_u32(row.max_duration_minutes, "max_duration_minutes")?,
            price_type: row
                .price_type
                .parse()
                .map_err(|e: fieldbook_domain::DomainError| corrupt("service", e.to_string()))?,
            base_price_cents: row.base_price_cents,
            min_technicians: to_u32(row.min_technicians, "min_technicians")?,
            max_technicians: to_u32(row.max_technicians, "max_technicians")?,
            min_lead_time_hours: to_u32(row.min_lead_time_hours, "min_lead_time_hours")?,
            max_advance_days: to_u32(row.max_advance_days, "max_advance_days")?,
            available_days,
            available_times,
            is_active: row.is_active != 0,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = technicians)]
pub struct TechnicianRow {
    pub technician_id: i64,
    pub business_id: i64,
    pub name: String,
    pub skills_json: String,
    pub working_hours_json: String,
    pub is_active: i32,
}

impl TechnicianRow {
    /// Converts the row, attaching commitments loaded separately.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON columns are malformed.
    pub fn into_technician(self, commitments: Vec<Interval>) -> Result<Technician, PersistenceError> {
        let skills: BTreeSet<String> = serde_json::from_str(&self.skills_json)?;
        let raw_hours: BTreeMap<u8, WindowData> = serde_json::from_str(&self.working_hours_json)?;
        let working_hours: BTreeMap<u8, ServiceWindow> = raw_hours
            .into_iter()
            .map(|(day, w)| {
                ServiceWindow::new(w.start, w.end)
                    .map(|window| (day, window))
                    .map_err(|e| corrupt("technician", e.to_string()))
            })
            .collect::<Result<_, _>>()?;

        Ok(Technician {
            technician_id: Some(self.technician_id),
            business_id: self.business_id,
            name: self.name,
            skills,
            working_hours,
            commitments,
            is_active: self.is_active != 0,
        })
    }
}

/// Parses a stored half-open interval.
///
/// # Errors
///
/// Returns `PersistenceError::CorruptRecord` if either bound is malformed
/// or the interval is empty.
pub fn stored_interval(start_at: &str, end_at: &str) -> Result<Interval, PersistenceError> {
    parse_interval(start_at, end_at)
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = bookings)]
pub struct BookingRow {
    pub booking_id: i64,
    pub business_id: i64,
    pub service_id: i64,
    pub confirmation_code: String,
    pub status: String,
    pub requested_at: String,
    pub scheduled_start: String,
    pub scheduled_end: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub preferred_contact_method: String,
    pub sms_consent: i32,
    pub email_consent: i32,
    pub street: String,
    pub unit: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country_code: String,
    pub problem_description: Option<String>,
    pub source: String,
    pub idempotency_key: String,
    pub confirmed_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingRow {
    /// Converts the row, attaching technician identifiers in seat order.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::CorruptRecord` if any stored value fails
    /// domain parsing.
    pub fn into_booking(self, technician_ids: Vec<i64>) -> Result<Booking, PersistenceError> {
        let bad = |e: fieldbook_domain::DomainError| corrupt("booking", e.to_string());

        let country: CountryCode = self.country_code.parse().map_err(bad)?;
        let cancellation: Option<Cancellation> =
            match (self.cancellation_reason, self.cancelled_by, self.cancelled_at) {
                (Some(reason), Some(cancelled_by), Some(at)) => Some(Cancellation {
                    reason,
                    cancelled_by,
                    cancelled_at: parse_timestamp(&at)?,
                }),
                _ => None,
            };

        Ok(Booking {
            booking_id: self.booking_id,
            business_id: self.business_id,
            service_id: self.service_id,
            confirmation_code: self.confirmation_code,
            status: self.status.parse::<BookingStatus>().map_err(bad)?,
            requested_at: parse_timestamp(&self.requested_at)?,
            scheduled: parse_interval(&self.scheduled_start, &self.scheduled_end)?,
            technician_ids,
            customer: CustomerContact {
                name: self.customer_name,
                phone: self.customer_phone,
                email: self.customer_email,
                preferred_contact_method: self.preferred_contact_method.parse().map_err(bad)?,
                sms_consent: self.sms_consent != 0,
                email_consent: self.email_consent != 0,
            },
            address: ServiceAddress {
                street: self.street,
                unit: self.unit,
                city: self.city,
                region: self.region,
                postal_code: PostalCode::parse(country, &self.postal_code).map_err(bad)?,
            },
            problem_description: self.problem_description,
            source: self.source.parse().map_err(bad)?,
            idempotency_key: IdempotencyKey::parse(&self.idempotency_key).map_err(bad)?,
            confirmed_at: parse_optional_timestamp(self.confirmed_at.as_deref())?,
            started_at: parse_optional_timestamp(self.started_at.as_deref())?,
            completed_at: parse_optional_timestamp(self.completed_at.as_deref())?,
            cancellation,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = booking_events)]
pub struct BookingEventRow {
    pub event_id: i64,
    pub booking_id: i64,
    pub actor_json: String,
    pub cause_json: String,
    pub action_json: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub occurred_at: String,
}

impl TryFrom<BookingEventRow> for BookingEvent {
    type Error = PersistenceError;

    fn try_from(row: BookingEventRow) -> Result<Self, Self::Error> {
        let bad = |e: fieldbook_domain::DomainError| corrupt("booking event", e.to_string());
        let actor: Actor = serde_json::from_str(&row.actor_json)?;
        let cause: Cause = serde_json::from_str(&row.cause_json)?;
        let action: Action = serde_json::from_str(&row.action_json)?;

        Ok(Self {
            event_id: Some(row.event_id),
            booking_id: row.booking_id,
            actor,
            cause,
            action,
            from_status: row
                .from_status
                .map(|s| s.parse::<BookingStatus>())
                .transpose()
                .map_err(bad)?,
            to_status: row.to_status.parse().map_err(bad)?,
            occurred_at: parse_timestamp(&row.occurred_at)?,
        })
    }
}
