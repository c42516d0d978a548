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

mod apply;
mod availability;
mod booking;
mod command;
mod error;
mod resolver;
mod state;

#[cfg(test)]
mod tests;

// Re-export public types and functions
pub use apply::apply;
pub use availability::{
    Availability, AvailabilityQuery, SlotFilters, booking_horizon, candidate_technicians,
    compute_availability, effective_window, lead_time_hours, local_to_utc,
    qualifying_technicians,
};
pub use booking::{
    BookingRequest, check_booking_horizon, check_service_window, plan_booking,
    requested_interval, select_technicians,
};
pub use command::Command;
pub use error::CoreError;
pub use resolver::{
    AreaSuggestion, DEFAULT_MAX_SUGGESTIONS, Distance, Resolution, ResolverConfig,
    resolve_service_area,
};
pub use state::{AvailabilitySnapshot, BookingPlan, TransitionResult};
