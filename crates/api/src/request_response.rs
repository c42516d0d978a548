// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API request and response data transfer objects.
//!
//! Enumerated request fields (country, contact method, source, status) are
//! carried as strings and parsed by the handlers, so a bad value is reported
//! as `InvalidFormat` against the field that carried it.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use fieldbook_audit::BookingEvent;
use fieldbook_domain::{Booking, ServiceArea, TimeOfDay, TimeSlot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Service Area
// ============================================================================

/// API request to check whether a business serves a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAreaCheckRequest {
    pub business_id: i64,
    pub postal_code: String,
    pub country_code: String,
}

/// A service area as exposed by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAreaInfo {
    pub postal_code: String,
    pub country_code: String,
    pub city: String,
    pub region: String,
    pub timezone: String,
    pub dispatch_fee_cents: i64,
    pub min_response_time_hours: u32,
    pub max_response_time_hours: u32,
    pub emergency_available: bool,
    pub regular_available: bool,
}

impl From<&ServiceArea> for ServiceAreaInfo {
    fn from(area: &ServiceArea) -> Self {
        Self {
            postal_code: area.postal_code.value().to_string(),
            country_code: area.country_code().as_str().to_string(),
            city: area.city.clone(),
            region: area.region.clone(),
            timezone: area.timezone.clone(),
            dispatch_fee_cents: area.dispatch_fee_cents,
            min_response_time_hours: area.min_response_time_hours,
            max_response_time_hours: area.max_response_time_hours,
            emergency_available: area.emergency_available,
            regular_available: area.regular_available,
        }
    }
}

/// A nearby covered area suggested for an uncovered postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionInfo {
    #[serde(flatten)]
    pub area: ServiceAreaInfo,
    /// Great-circle distance, when both sides have coordinates.
    pub distance_km: Option<f64>,
}

/// API response for a coverage check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAreaCheckResponse {
    pub supported: bool,
    /// The normalized postal code that was looked up.
    pub postal_code: String,
    /// The matching area, when supported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<ServiceAreaInfo>,
    /// Nearest covered areas, when not supported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<SuggestionInfo>>,
}

// ============================================================================
// Availability
// ============================================================================

/// A customer address as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub street: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country_code: String,
}

/// API request for open slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub business_id: i64,
    pub service_id: i64,
    /// First local date, inclusive.
    pub start_date: NaiveDate,
    /// Last local date, inclusive.
    pub end_date: NaiveDate,
    #[serde(default)]
    pub preferred_times: Vec<TimeOfDay>,
    /// When present, slots are computed in the address's service area.
    #[serde(default)]
    pub customer_address: Option<AddressInput>,
    #[serde(default)]
    pub preferred_technician_id: Option<i64>,
    #[serde(default)]
    pub exclude_technician_ids: Vec<i64>,
}

/// A slot as exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotInfo {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub capacity: u32,
    pub booked_count: u32,
    pub technician_ids: Vec<i64>,
    pub price_cents: Option<i64>,
}

impl From<TimeSlot> for TimeSlotInfo {
    fn from(slot: TimeSlot) -> Self {
        Self {
            start: slot.start,
            end: slot.end,
            capacity: slot.capacity,
            booked_count: slot.booked_count,
            technician_ids: slot.technician_ids,
            price_cents: slot.price_cents,
        }
    }
}

/// API response listing open slots by local date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available_dates: BTreeMap<NaiveDate, Vec<TimeSlotInfo>>,
    pub total_slots: usize,
    pub earliest_available: Option<DateTime<FixedOffset>>,
    pub latest_available: Option<DateTime<FixedOffset>>,
    pub estimated_duration_minutes: u32,
    pub base_price: Option<i64>,
}

// ============================================================================
// Bookings
// ============================================================================

/// API request to book a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub business_id: i64,
    pub service_id: i64,
    /// Requested start; the end follows from the service duration.
    pub requested_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub preferred_technician_id: Option<i64>,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub service_address: AddressInput,
    #[serde(default)]
    pub problem_description: Option<String>,
    pub preferred_contact_method: String,
    #[serde(default)]
    pub sms_consent: bool,
    #[serde(default)]
    pub email_consent: bool,
    pub source: String,
    pub idempotency_key: String,
}

/// A booking as exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingInfo {
    pub booking_id: i64,
    pub business_id: i64,
    pub service_id: i64,
    pub confirmation_code: String,
    pub status: String,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub technician_ids: Vec<i64>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub preferred_contact_method: String,
    pub sms_consent: bool,
    pub email_consent: bool,
    pub street: String,
    pub unit: Option<String>,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country_code: String,
    pub problem_description: Option<String>,
    pub source: String,
    pub idempotency_key: String,
    pub requested_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Booking> for BookingInfo {
    fn from(booking: &Booking) -> Self {
        let cancellation = booking.cancellation.as_ref();
        Self {
            booking_id: booking.booking_id,
            business_id: booking.business_id,
            service_id: booking.service_id,
            confirmation_code: booking.confirmation_code.clone(),
            status: booking.status.as_str().to_string(),
            scheduled_start: booking.scheduled.start(),
            scheduled_end: booking.scheduled.end(),
            technician_ids: booking.technician_ids.clone(),
            customer_name: booking.customer.name.clone(),
            customer_phone: booking.customer.phone.clone(),
            customer_email: booking.customer.email.clone(),
            preferred_contact_method: booking
                .customer
                .preferred_contact_method
                .as_str()
                .to_string(),
            sms_consent: booking.customer.sms_consent,
            email_consent: booking.customer.email_consent,
            street: booking.address.street.clone(),
            unit: booking.address.unit.clone(),
            city: booking.address.city.clone(),
            region: booking.address.region.clone(),
            postal_code: booking.address.postal_code.value().to_string(),
            country_code: booking.address.postal_code.country().as_str().to_string(),
            problem_description: booking.problem_description.clone(),
            source: booking.source.as_str().to_string(),
            idempotency_key: booking.idempotency_key.to_string(),
            requested_at: booking.requested_at,
            confirmed_at: booking.confirmed_at,
            started_at: booking.started_at,
            completed_at: booking.completed_at,
            cancelled_at: cancellation.map(|c| c.cancelled_at),
            cancelled_by: cancellation.map(|c| c.cancelled_by.clone()),
            cancellation_reason: cancellation.map(|c| c.reason.clone()),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

/// A technician assigned to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicianInfo {
    pub technician_id: i64,
    pub name: String,
}

/// API response for a booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBookingResponse {
    pub booking: BookingInfo,
    pub message: String,
    pub next_steps: Vec<String>,
    /// Local start of the appointment in the service area's timezone.
    pub estimated_arrival_time: Option<DateTime<FixedOffset>>,
    pub technician_info: Option<Vec<TechnicianInfo>>,
    /// True when the idempotency key had already been used.
    pub replayed: bool,
}

/// Who is making a staff-side change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInput {
    pub id: String,
    #[serde(default = "default_actor_type")]
    pub actor_type: String,
}

fn default_actor_type() -> String {
    String::from("staff")
}

/// API request to cancel a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: String,
    pub actor: ActorInput,
}

/// API request to move a booking along its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status: `confirmed`, `in_progress`, `completed` or `no_show`.
    pub status: String,
    pub actor: ActorInput,
}

/// A booking history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEventInfo {
    pub event_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub actor_id: String,
    pub actor_type: String,
    pub cause_id: String,
    pub cause_description: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<&BookingEvent> for BookingEventInfo {
    fn from(event: &BookingEvent) -> Self {
        Self {
            event_id: event.event_id,
            action: event.action.name.clone(),
            details: event.action.details.clone(),
            actor_id: event.actor.id.clone(),
            actor_type: event.actor.actor_type.clone(),
            cause_id: event.cause.id.clone(),
            cause_description: event.cause.description.clone(),
            from_status: event.from_status.map(|s| s.as_str().to_string()),
            to_status: event.to_status.as_str().to_string(),
            occurred_at: event.occurred_at,
        }
    }
}

/// API response listing a booking's history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEventsResponse {
    pub booking_id: i64,
    pub events: Vec<BookingEventInfo>,
}
