// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

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

mod booking;
mod booking_status;
mod catalog;
mod error;
mod postal;
mod schedule;
mod service_area;
mod validation;

#[cfg(test)]
mod tests;

pub use booking::{
    Booking, BookingSource, Cancellation, ContactMethod, CustomerContact, IdempotencyKey,
    MAX_IDEMPOTENCY_KEY_LEN, NewBooking, ServiceAddress,
};
pub use booking_status::BookingStatus;
pub use catalog::{
    BookableService, Business, PriceType, ServiceWindow, iso_weekday, weekday_from_iso,
};
pub use error::DomainError;
pub use postal::{CountryCode, PostalCode, postal_proximity};
pub use schedule::{BookingAssignment, Interval, Technician, TimeOfDay, TimeSlot};
pub use service_area::{Coordinates, ServiceArea, parse_timezone};
pub use validation::{
    validate_customer_contact, validate_email, validate_phone, validate_service_address,
};
