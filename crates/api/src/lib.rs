// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! API boundary for the Fieldbook booking engine.
//!
//! Translates request DTOs into engine calls and engine results into
//! response DTOs, and owns the [`BookingCoordinator`], the only writer of
//! booking state. Transport concerns live in the server crate.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod coordinator;
mod csv_import;
mod error;
mod handlers;
mod request_response;
mod reservation_locks;

#[cfg(test)]
mod tests;

pub use coordinator::{BookingCoordinator, CoordinatorConfig, DEFAULT_LOCK_TIMEOUT};
pub use csv_import::{
    CsvImportResult, CsvPreviewResult, CsvRowResult, CsvRowStatus, import_service_areas,
    preview_service_areas,
};
pub use error::{
    ApiError, translate_core_error, translate_domain_error, translate_persistence_error,
};
pub use handlers::{
    AreaCheckInputs, AvailabilityInputs, SchedulingZone, check_service_area,
    compute_availability_response, get_availability, get_booking, get_booking_events,
    load_area_check, load_availability, load_service, parse_address, parse_booking_request,
    parse_country, parse_postal_code, resolve_area_check, scheduling_zone,
};
pub use request_response::{
    ActorInput, AddressInput, AvailabilityRequest, AvailabilityResponse, BookingEventInfo,
    BookingEventsResponse, BookingInfo, CancelBookingRequest, CreateBookingRequest,
    CreateBookingResponse, ServiceAreaCheckRequest, ServiceAreaCheckResponse, ServiceAreaInfo,
    SuggestionInfo, TechnicianInfo, TimeSlotInfo, UpdateStatusRequest,
};
pub use reservation_locks::{LockError, ReservationGuard, ReservationKey, ReservationLocks};
