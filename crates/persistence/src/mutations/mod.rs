// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! State-changing operations.
//!
//! - `reference`: Seeding and import of reference data
//! - `bookings`: Booking rows, technician seats and booking events

pub mod bookings;
pub mod reference;

pub use bookings::{insert_booking, insert_booking_event, update_booking_status};
pub use reference::{
    add_technician_commitment, insert_business, insert_service, insert_technician,
    upsert_postal_centroid, upsert_service_areas,
};
