// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking and booking event writes.
//!
//! Called only from inside the commit and transition transactions in
//! `Persistence`.

use diesel::SqliteConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use fieldbook_audit::BookingEvent;
use fieldbook_domain::{Booking, BookingStatus, NewBooking};
use num_traits::ToPrimitive;
use tracing::debug;

use crate::backend::PersistenceBackend;
use crate::data_models::format_timestamp;
use crate::diesel_schema::{booking_events, booking_technicians, bookings};
use crate::error::PersistenceError;

/// Inserts a new `pending` booking with its technician seats.
///
/// Returns the booking ID.
///
/// # Errors
///
/// Returns `PersistenceError::DuplicateIdempotencyKey` if the business
/// already stored a booking under the same key, or another error if a write
/// fails.
pub fn insert_booking(
    conn: &mut SqliteConnection,
    booking: &NewBooking,
) -> Result<i64, PersistenceError> {
    let created_at: String = format_timestamp(booking.created_at);

    let inserted = diesel::insert_into(bookings::table)
        .values((
            bookings::business_id.eq(booking.business_id),
            bookings::service_id.eq(booking.service_id),
            bookings::confirmation_code.eq(&booking.confirmation_code),
            bookings::status.eq(BookingStatus::Pending.as_str()),
            bookings::requested_at.eq(format_timestamp(booking.requested_at)),
            bookings::scheduled_start.eq(format_timestamp(booking.scheduled.start())),
            bookings::scheduled_end.eq(format_timestamp(booking.scheduled.end())),
            bookings::customer_name.eq(&booking.customer.name),
            bookings::customer_phone.eq(&booking.customer.phone),
            bookings::customer_email.eq(booking.customer.email.as_deref()),
            bookings::preferred_contact_method
                .eq(booking.customer.preferred_contact_method.as_str()),
            bookings::sms_consent.eq(i32::from(booking.customer.sms_consent)),
            bookings::email_consent.eq(i32::from(booking.customer.email_consent)),
            bookings::street.eq(&booking.address.street),
            bookings::unit.eq(booking.address.unit.as_deref()),
            bookings::city.eq(&booking.address.city),
            bookings::region.eq(&booking.address.region),
            bookings::postal_code.eq(booking.address.postal_code.value()),
            bookings::country_code.eq(booking.address.postal_code.country().as_str()),
            bookings::problem_description.eq(booking.problem_description.as_deref()),
            bookings::source.eq(booking.source.as_str()),
            bookings::idempotency_key.eq(booking.idempotency_key.as_str()),
            bookings::created_at.eq(&created_at),
            bookings::updated_at.eq(&created_at),
        ))
        .execute(conn);

    match inserted {
        Ok(_) => {}
        Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
            if info.message().contains("idempotency_key") =>
        {
            return Err(PersistenceError::DuplicateIdempotencyKey(
                booking.idempotency_key.to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    let booking_id: i64 = conn.get_last_insert_rowid()?;

    for (seat, technician_id) in booking.technician_ids.iter().enumerate() {
        let seat: i32 = seat.to_i32().ok_or_else(|| {
            PersistenceError::QueryFailed(format!("seat {seat} out of range"))
        })?;
        diesel::insert_into(booking_technicians::table)
            .values((
                booking_technicians::booking_id.eq(booking_id),
                booking_technicians::technician_id.eq(technician_id),
                booking_technicians::seat.eq(seat),
            ))
            .execute(conn)?;
    }

    debug!(
        booking_id,
        technicians = booking.technician_ids.len(),
        "Inserted booking"
    );
    Ok(booking_id)
}

/// Stores a booking's status, lifecycle timestamps and cancellation.
///
/// Scheduling fields and assignments are never rewritten.
///
/// # Errors
///
/// Returns `PersistenceError::BookingNotFound` if the row vanished.
pub fn update_booking_status(
    conn: &mut SqliteConnection,
    booking: &Booking,
) -> Result<(), PersistenceError> {
    let cancellation = booking.cancellation.as_ref();

    let updated: usize = diesel::update(bookings::table)
        .filter(bookings::booking_id.eq(booking.booking_id))
        .set((
            bookings::status.eq(booking.status.as_str()),
            bookings::confirmed_at.eq(booking.confirmed_at.map(format_timestamp)),
            bookings::started_at.eq(booking.started_at.map(format_timestamp)),
            bookings::completed_at.eq(booking.completed_at.map(format_timestamp)),
            bookings::cancellation_reason.eq(cancellation.map(|c| c.reason.as_str())),
            bookings::cancelled_by.eq(cancellation.map(|c| c.cancelled_by.as_str())),
            bookings::cancelled_at.eq(cancellation.map(|c| format_timestamp(c.cancelled_at))),
            bookings::updated_at.eq(format_timestamp(booking.updated_at)),
        ))
        .execute(conn)?;

    if updated == 0 {
        return Err(PersistenceError::BookingNotFound(booking.booking_id));
    }
    Ok(())
}

/// Appends a booking event and returns its ID.
///
/// The event's `booking_id` is overridden by `booking_id`, since creation
/// events are planned before the booking row exists.
///
/// # Errors
///
/// Returns an error if serialization or the insert fails.
pub fn insert_booking_event(
    conn: &mut SqliteConnection,
    booking_id: i64,
    event: &BookingEvent,
) -> Result<i64, PersistenceError> {
    let actor_json: String = serde_json::to_string(&event.actor)?;
    let cause_json: String = serde_json::to_string(&event.cause)?;
    let action_json: String = serde_json::to_string(&event.action)?;

    diesel::insert_into(booking_events::table)
        .values((
            booking_events::booking_id.eq(booking_id),
            booking_events::actor_json.eq(actor_json),
            booking_events::cause_json.eq(cause_json),
            booking_events::action_json.eq(action_json),
            booking_events::from_status.eq(event.from_status.map(|s| s.as_str())),
            booking_events::to_status.eq(event.to_status.as_str()),
            booking_events::occurred_at.eq(format_timestamp(event.occurred_at)),
        ))
        .execute(conn)?;

    let event_id: i64 = conn.get_last_insert_rowid()?;
    debug!(event_id, booking_id, action = %event.action.name, "Recorded booking event");
    Ok(event_id)
}
