// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries.
//!
//! - `reference`: Businesses, service areas, centroids, services, technicians
//! - `bookings`: Bookings, active assignments and booking events

pub mod bookings;
pub mod reference;

pub use bookings::{
    active_assignments, find_booking_by_idempotency_key, get_booking, list_booking_events,
};
pub use reference::{
    find_service_area, get_business, get_service, list_service_areas, list_technicians,
    postal_centroid,
};
