// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API handler functions for coverage checks, availability and booking reads.
//!
//! Handlers are synchronous and take the persistence adapter directly; the
//! server serializes access to it. Coverage and availability are split into
//! a `load_*` step that reads the store and a pure step, so the server holds
//! the store only while reading. Booking writes go through
//! [`crate::BookingCoordinator`] instead.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use fieldbook::{
    Availability, AvailabilityQuery, AvailabilitySnapshot, BookingRequest, Resolution,
    ResolverConfig, SlotFilters, compute_availability, effective_window, resolve_service_area,
};
use fieldbook_audit::BookingEvent;
use fieldbook_domain::{
    BookableService, BookingSource, Business, ContactMethod, Coordinates, CountryCode,
    CustomerContact, DomainError, IdempotencyKey, Interval, PostalCode, ServiceAddress,
    ServiceArea,
};
use fieldbook_persistence::SqlitePersistence;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::error::{
    ApiError, translate_core_error, translate_domain_error, translate_persistence_error,
};
use crate::request_response::{
    AddressInput, AvailabilityRequest, AvailabilityResponse, BookingEventInfo,
    BookingEventsResponse, BookingInfo, CreateBookingRequest, ServiceAreaCheckRequest,
    ServiceAreaCheckResponse, ServiceAreaInfo, SuggestionInfo, TimeSlotInfo,
};

// ============================================================================
// Input parsing
// ============================================================================

/// Parses a country code.
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` for unsupported countries.
pub fn parse_country(raw: &str) -> Result<CountryCode, ApiError> {
    CountryCode::from_str(raw).map_err(translate_domain_error)
}

/// Normalizes a postal code for its country.
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` if the code does not match the country's
/// format.
pub fn parse_postal_code(country: CountryCode, raw: &str) -> Result<PostalCode, ApiError> {
    PostalCode::parse(country, raw).map_err(translate_domain_error)
}

/// Converts a submitted address, normalizing its postal code.
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` for an unsupported country or a
/// malformed postal code. Blank lines are caught by booking validation.
pub fn parse_address(input: &AddressInput) -> Result<ServiceAddress, ApiError> {
    let country: CountryCode = parse_country(&input.country_code)?;
    let postal_code: PostalCode = parse_postal_code(country, &input.postal_code)?;

    Ok(ServiceAddress {
        street: input.street.trim().to_string(),
        unit: non_blank(input.unit.as_deref()),
        city: input.city.trim().to_string(),
        region: input.region.trim().to_string(),
        postal_code,
    })
}

/// Builds and validates a booking request from the API DTO.
///
/// Runs every check that needs no stored state, so a malformed request is
/// rejected before any lock is taken.
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` naming the first invalid field.
pub fn parse_booking_request(request: &CreateBookingRequest) -> Result<BookingRequest, ApiError> {
    let idempotency_key: IdempotencyKey =
        IdempotencyKey::parse(&request.idempotency_key).map_err(translate_domain_error)?;
    let preferred_contact_method: ContactMethod =
        ContactMethod::from_str(&request.preferred_contact_method)
            .map_err(translate_domain_error)?;
    let source: BookingSource =
        BookingSource::from_str(&request.source).map_err(translate_domain_error)?;
    let address: ServiceAddress = parse_address(&request.service_address)?;

    let booking_request = BookingRequest {
        business_id: request.business_id,
        service_id: request.service_id,
        requested_start: request.requested_at.with_timezone(&Utc),
        preferred_technician_id: request.preferred_technician_id,
        customer: CustomerContact {
            name: request.customer_name.trim().to_string(),
            phone: request.customer_phone.trim().to_string(),
            email: non_blank(request.customer_email.as_deref()),
            preferred_contact_method,
            sms_consent: request.sms_consent,
            email_consent: request.email_consent,
        },
        address,
        problem_description: non_blank(request.problem_description.as_deref()),
        source,
        idempotency_key,
    };

    booking_request.validate().map_err(translate_core_error)?;
    Ok(booking_request)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Scheduling context
// ============================================================================

/// Where a service is scheduled: the timezone and response-time floor.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingZone {
    pub tz: Tz,
    pub min_response_time_hours: u32,
    /// The service area, when a customer address was resolved.
    pub area: Option<ServiceArea>,
}

/// Loads an active service of an active business.
///
/// # Errors
///
/// Returns `ApiError::ServiceNotFound` if either is missing or inactive.
pub fn load_service(
    persistence: &mut SqlitePersistence,
    business_id: i64,
    service_id: i64,
) -> Result<(Business, BookableService), ApiError> {
    let business: Business = persistence
        .get_business(business_id)
        .map_err(translate_persistence_error)?
        .filter(|b| b.is_active)
        .ok_or(ApiError::ServiceNotFound { service_id })?;

    let service: BookableService = persistence
        .get_service(business_id, service_id)
        .map_err(translate_persistence_error)?
        .filter(|s| s.is_active)
        .ok_or(ApiError::ServiceNotFound { service_id })?;

    Ok((business, service))
}

/// Resolves the scheduling zone for a business and optional address.
///
/// With an address, the address's service area decides the timezone and
/// response floor; an area that does not take regular bookings counts as
/// not serviced. Without one, the business default timezone applies.
///
/// # Errors
///
/// Returns `ApiError::AreaNotServiced` for an uncovered address, or
/// `ApiError::Internal` if a stored timezone is unknown.
pub fn scheduling_zone(
    persistence: &mut SqlitePersistence,
    business: &Business,
    postal_code: Option<&PostalCode>,
) -> Result<SchedulingZone, ApiError> {
    let Some(postal_code) = postal_code else {
        return Ok(SchedulingZone {
            tz: business.tz().map_err(|e| stored_timezone_error(&e))?,
            min_response_time_hours: 0,
            area: None,
        });
    };

    let area: ServiceArea = persistence
        .find_service_area(business.business_id, postal_code)
        .map_err(translate_persistence_error)?
        .filter(|a| a.regular_available)
        .ok_or_else(|| ApiError::AreaNotServiced {
            postal_code: postal_code.value().to_string(),
            country: postal_code.country().as_str().to_string(),
        })?;

    Ok(SchedulingZone {
        tz: area.tz().map_err(|e| stored_timezone_error(&e))?,
        min_response_time_hours: area.min_response_time_hours,
        area: Some(area),
    })
}

fn stored_timezone_error(err: &DomainError) -> ApiError {
    ApiError::Internal {
        message: format!("Stored reference data is invalid: {err}"),
    }
}

// ============================================================================
// Service Area
// ============================================================================

/// Store reads a coverage check needs, taken before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaCheckInputs {
    pub business_id: i64,
    pub postal_code: PostalCode,
    pub origin: Option<Coordinates>,
    pub areas: Vec<ServiceArea>,
}

/// Normalizes the request and reads the business's areas in its country.
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` for a bad country or postal code, or
/// `ApiError::ServiceUnavailable` if the store cannot be read.
pub fn load_area_check(
    persistence: &mut SqlitePersistence,
    request: &ServiceAreaCheckRequest,
) -> Result<AreaCheckInputs, ApiError> {
    let country: CountryCode = parse_country(&request.country_code)?;
    let postal_code: PostalCode = parse_postal_code(country, &request.postal_code)?;

    let areas: Vec<ServiceArea> = persistence
        .list_service_areas(request.business_id, Some(country))
        .map_err(translate_persistence_error)?;
    let origin: Option<Coordinates> = persistence
        .postal_centroid(&postal_code)
        .map_err(translate_persistence_error)?;

    Ok(AreaCheckInputs {
        business_id: request.business_id,
        postal_code,
        origin,
        areas,
    })
}

/// Decides coverage from loaded inputs. Touches no store.
#[must_use]
pub fn resolve_area_check(
    inputs: &AreaCheckInputs,
    config: &ResolverConfig,
) -> ServiceAreaCheckResponse {
    let response = match resolve_service_area(
        &inputs.postal_code,
        inputs.origin,
        &inputs.areas,
        config,
    ) {
        Resolution::Supported(area) => ServiceAreaCheckResponse {
            supported: true,
            postal_code: inputs.postal_code.value().to_string(),
            normalized: Some(ServiceAreaInfo::from(&area)),
            suggestions: None,
        },
        Resolution::Unsupported { query, suggestions } => ServiceAreaCheckResponse {
            supported: false,
            postal_code: query.value().to_string(),
            normalized: None,
            suggestions: Some(
                suggestions
                    .iter()
                    .map(|s| SuggestionInfo {
                        area: ServiceAreaInfo::from(&s.area),
                        distance_km: s.distance.kilometres(),
                    })
                    .collect(),
            ),
        },
    };

    debug!(
        business_id = inputs.business_id,
        postal_code = %inputs.postal_code,
        supported = response.supported,
        "Checked service area"
    );
    response
}

/// Checks whether a business serves a postal code.
///
/// This function:
/// - Normalizes the postal code for its country (no lookup on bad input)
/// - Looks for an exact match among the business's areas in that country
/// - Otherwise ranks nearby covered areas as suggestions
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` for a bad country or postal code, or
/// `ApiError::ServiceUnavailable` if the store cannot be read.
pub fn check_service_area(
    persistence: &mut SqlitePersistence,
    config: &ResolverConfig,
    request: &ServiceAreaCheckRequest,
) -> Result<ServiceAreaCheckResponse, ApiError> {
    let inputs: AreaCheckInputs = load_area_check(persistence, request)?;
    Ok(resolve_area_check(&inputs, config))
}

// ============================================================================
// Availability
// ============================================================================

/// Store reads an availability query needs.
///
/// `snapshot` is `None` when the requested range lies outside the booking
/// horizon, so there is nothing to compute.
#[derive(Debug, Clone)]
pub struct AvailabilityInputs {
    pub service: BookableService,
    pub snapshot: Option<AvailabilitySnapshot>,
}

/// Loads the service, scheduling zone and roster snapshot for a request.
///
/// # Errors
///
/// Returns an error if:
/// - The business or service is unknown or inactive (`ServiceNotFound`)
/// - The customer address is malformed (`InvalidFormat`) or not covered
///   (`AreaNotServiced`)
/// - The store cannot be read (`ServiceUnavailable`)
pub fn load_availability(
    persistence: &mut SqlitePersistence,
    request: &AvailabilityRequest,
    now: DateTime<Utc>,
) -> Result<AvailabilityInputs, ApiError> {
    let postal_code: Option<PostalCode> = match &request.customer_address {
        Some(address) => Some(parse_address(address)?.postal_code),
        None => None,
    };

    let (business, service) = load_service(persistence, request.business_id, request.service_id)?;
    let zone: SchedulingZone = scheduling_zone(persistence, &business, postal_code.as_ref())?;

    let window: Option<Interval> = effective_window(
        &service,
        zone.min_response_time_hours,
        request.start_date,
        request.end_date,
        zone.tz,
        now,
    )
    .map_err(translate_domain_error)?;

    let Some(window) = window else {
        debug!(
            service_id = request.service_id,
            "Requested range is outside the booking horizon"
        );
        return Ok(AvailabilityInputs {
            service,
            snapshot: None,
        });
    };

    let snapshot: AvailabilitySnapshot = persistence
        .load_snapshot(
            request.business_id,
            request.service_id,
            zone.tz,
            zone.min_response_time_hours,
            &window,
        )
        .map_err(translate_persistence_error)?
        .ok_or(ApiError::ServiceNotFound {
            service_id: request.service_id,
        })?;

    Ok(AvailabilityInputs {
        service,
        snapshot: Some(snapshot),
    })
}

/// Computes open slots from loaded inputs. Touches no store.
///
/// # Errors
///
/// Returns an error if local slot times cannot be resolved.
pub fn compute_availability_response(
    inputs: &AvailabilityInputs,
    request: &AvailabilityRequest,
    now: DateTime<Utc>,
) -> Result<AvailabilityResponse, ApiError> {
    let Some(snapshot) = &inputs.snapshot else {
        return Ok(empty_availability(&inputs.service));
    };

    let query = AvailabilityQuery {
        start_date: request.start_date,
        end_date: request.end_date,
        filters: SlotFilters {
            preferred_technician_id: request.preferred_technician_id,
            excluded_technician_ids: request.exclude_technician_ids.iter().copied().collect(),
            preferred_times: request.preferred_times.clone(),
        },
    };
    let availability: Availability =
        compute_availability(snapshot, &query, now).map_err(translate_core_error)?;

    debug!(
        service_id = request.service_id,
        total_slots = availability.total_slots,
        "Computed availability"
    );

    Ok(AvailabilityResponse {
        available_dates: availability
            .slots_by_date
            .into_iter()
            .map(|(date, slots)| (date, slots.into_iter().map(TimeSlotInfo::from).collect()))
            .collect(),
        total_slots: availability.total_slots,
        earliest_available: availability.earliest,
        latest_available: availability.latest,
        estimated_duration_minutes: inputs.service.estimated_duration_minutes,
        base_price: inputs.service.base_price_cents,
    })
}

/// Computes open slots for a service over a local date range.
///
/// Reads an explicit snapshot of the roster and booked assignments and
/// never writes. Two callers may be offered the same slot; only the booking
/// commit decides who gets it.
///
/// # Errors
///
/// See [`load_availability`] and [`compute_availability_response`].
pub fn get_availability(
    persistence: &mut SqlitePersistence,
    request: &AvailabilityRequest,
    now: DateTime<Utc>,
) -> Result<AvailabilityResponse, ApiError> {
    let inputs: AvailabilityInputs = load_availability(persistence, request, now)?;
    compute_availability_response(&inputs, request, now)
}

const fn empty_availability(service: &BookableService) -> AvailabilityResponse {
    AvailabilityResponse {
        available_dates: BTreeMap::new(),
        total_slots: 0,
        earliest_available: None,
        latest_available: None,
        estimated_duration_minutes: service.estimated_duration_minutes,
        base_price: service.base_price_cents,
    }
}

// ============================================================================
// Booking reads
// ============================================================================

/// Retrieves a booking.
///
/// # Errors
///
/// Returns `ApiError::BookingNotFound` if it does not exist.
pub fn get_booking(
    persistence: &mut SqlitePersistence,
    booking_id: i64,
) -> Result<BookingInfo, ApiError> {
    persistence
        .get_booking(booking_id)
        .map(|booking| BookingInfo::from(&booking))
        .map_err(translate_persistence_error)
}

/// Retrieves a booking's status history, oldest first.
///
/// # Errors
///
/// Returns `ApiError::BookingNotFound` if the booking does not exist.
pub fn get_booking_events(
    persistence: &mut SqlitePersistence,
    booking_id: i64,
) -> Result<BookingEventsResponse, ApiError> {
    let events: Vec<BookingEvent> = persistence
        .booking_events(booking_id)
        .map_err(translate_persistence_error)?;

    Ok(BookingEventsResponse {
        booking_id,
        events: events.iter().map(BookingEventInfo::from).collect(),
    })
}
