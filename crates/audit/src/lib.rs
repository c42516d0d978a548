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
    clippy::all
)]

use chrono::{DateTime, Utc};
use fieldbook_domain::BookingStatus;
use serde::{Deserialize, Serialize};

/// Represents the entity performing an action.
///
/// An actor is whoever initiates a booking state change: the customer, a
/// dispatcher, or an automated process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The unique identifier for this actor.
    pub id: String,
    /// The type of actor (e.g., "customer", "dispatcher", "system").
    pub actor_type: String,
}

impl Actor {
    /// Creates a new Actor.
    ///
    /// # Arguments
    ///
    /// * `id` - The unique identifier for this actor
    /// * `actor_type` - The type of actor
    #[must_use]
    pub const fn new(id: String, actor_type: String) -> Self {
        Self { id, actor_type }
    }

    /// The actor recorded for changes the engine makes on its own.
    #[must_use]
    pub fn system() -> Self {
        Self::new(String::from("fieldbook"), String::from("system"))
    }
}

/// Represents the reason or trigger for an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    /// A unique identifier for this cause (e.g., idempotency key, request ID).
    pub id: String,
    /// A description of the cause.
    pub description: String,
}

impl Cause {
    /// Creates a new Cause.
    #[must_use]
    pub const fn new(id: String, description: String) -> Self {
        Self { id, description }
    }
}

/// Represents the specific action performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// The name of the action (e.g., "`CreateBooking`", "`CancelBooking`").
    pub name: String,
    /// Optional additional details about the action.
    pub details: Option<String>,
}

impl Action {
    /// Creates a new Action.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the action
    /// * `details` - Optional additional details
    #[must_use]
    pub const fn new(name: String, details: Option<String>) -> Self {
        Self { name, details }
    }
}

/// An immutable record of one booking lifecycle change.
///
/// Every successful change, creation included, produces exactly one event.
/// Events capture:
/// - Who performed the change (actor)
/// - Why it was performed (cause)
/// - What was done (action)
/// - The status before (`None` on creation) and after
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
    /// Database identifier. `None` until persisted.
    pub event_id: Option<i64>,
    /// The booking this event belongs to. Zero until the booking is stored.
    pub booking_id: i64,
    pub actor: Actor,
    pub cause: Cause,
    pub action: Action,
    pub from_status: Option<BookingStatus>,
    pub to_status: BookingStatus,
    pub occurred_at: DateTime<Utc>,
}

impl BookingEvent {
    /// Creates a new, unpersisted `BookingEvent`.
    ///
    /// Once created, an event is immutable.
    #[must_use]
    pub const fn new(
        booking_id: i64,
        actor: Actor,
        cause: Cause,
        action: Action,
        from_status: Option<BookingStatus>,
        to_status: BookingStatus,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: None,
            booking_id,
            actor,
            cause,
            action,
            from_status,
            to_status,
            occurred_at,
        }
    }

    /// Whether this event records the creation of the booking.
    #[must_use]
    pub const fn is_creation(&self) -> bool {
        self.from_status.is_none()
    }

    /// Returns a copy bound to a stored booking.
    #[must_use]
    pub fn for_booking(mut self, booking_id: i64) -> Self {
        self.booking_id = booking_id;
        self
    }
}
