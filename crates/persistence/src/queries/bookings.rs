// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking, assignment and event reads.

use diesel::prelude::*;
use diesel::SqliteConnection;
use fieldbook_audit::BookingEvent;
use fieldbook_domain::{Booking, BookingAssignment, BookingStatus, IdempotencyKey, Interval};
use std::collections::BTreeMap;

use crate::data_models::{BookingEventRow, BookingRow, format_timestamp, stored_interval};
use crate::diesel_schema::{booking_events, booking_technicians, bookings};
use crate::error::PersistenceError;

/// Technician IDs assigned to a booking, in seat order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn booking_technician_ids(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Vec<i64>, PersistenceError> {
    Ok(booking_technicians::table
        .filter(booking_technicians::booking_id.eq(booking_id))
        .order(booking_technicians::seat.asc())
        .select(booking_technicians::technician_id)
        .load(conn)?)
}

fn load_booking(conn: &mut SqliteConnection, row: BookingRow) -> Result<Booking, PersistenceError> {
    let technician_ids: Vec<i64> = booking_technician_ids(conn, row.booking_id)?;
    row.into_booking(technician_ids)
}

/// Retrieves a booking by ID.
///
/// # Errors
///
/// Returns `PersistenceError::BookingNotFound` if no such booking exists.
pub fn get_booking(conn: &mut SqliteConnection, booking_id: i64) -> Result<Booking, PersistenceError> {
    let row: Option<BookingRow> = bookings::table
        .filter(bookings::booking_id.eq(booking_id))
        .select(BookingRow::as_select())
        .first(conn)
        .optional()?;

    match row {
        Some(row) => load_booking(conn, row),
        None => Err(PersistenceError::BookingNotFound(booking_id)),
    }
}

/// Finds the booking a business stored under an idempotency key.
///
/// # Errors
///
/// Returns an error if the query fails or the row is malformed.
pub fn find_booking_by_idempotency_key(
    conn: &mut SqliteConnection,
    business_id: i64,
    key: &IdempotencyKey,
) -> Result<Option<Booking>, PersistenceError> {
    let row: Option<BookingRow> = bookings::table
        .filter(bookings::business_id.eq(business_id))
        .filter(bookings::idempotency_key.eq(key.as_str()))
        .select(BookingRow::as_select())
        .first(conn)
        .optional()?;

    row.map(|row| load_booking(conn, row)).transpose()
}

/// Non-cancelled booking assignments of a business overlapping `window`.
///
/// Covers every service: a technician is busy whatever they are booked for.
///
/// # Errors
///
/// Returns an error if a query fails or a row is malformed.
pub fn active_assignments(
    conn: &mut SqliteConnection,
    business_id: i64,
    window: &Interval,
) -> Result<Vec<BookingAssignment>, PersistenceError> {
    let window_start: String = format_timestamp(window.start());
    let window_end: String = format_timestamp(window.end());

    let rows: Vec<(i64, i64, String, String)> = bookings::table
        .filter(bookings::business_id.eq(business_id))
        .filter(bookings::status.ne(BookingStatus::Cancelled.as_str()))
        .filter(bookings::scheduled_start.lt(&window_end))
        .filter(bookings::scheduled_end.gt(&window_start))
        .order(bookings::booking_id.asc())
        .select((
            bookings::booking_id,
            bookings::service_id,
            bookings::scheduled_start,
            bookings::scheduled_end,
        ))
        .load(conn)?;

    let booking_ids: Vec<i64> = rows.iter().map(|(id, ..)| *id).collect();
    let seats: Vec<(i64, i64)> = booking_technicians::table
        .filter(booking_technicians::booking_id.eq_any(&booking_ids))
        .order((
            booking_technicians::booking_id.asc(),
            booking_technicians::seat.asc(),
        ))
        .select((
            booking_technicians::booking_id,
            booking_technicians::technician_id,
        ))
        .load(conn)?;

    let mut technicians_by_booking: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for (booking_id, technician_id) in seats {
        technicians_by_booking
            .entry(booking_id)
            .or_default()
            .push(technician_id);
    }

    rows.into_iter()
        .map(|(booking_id, service_id, start, end)| {
            Ok(BookingAssignment {
                booking_id,
                service_id,
                technician_ids: technicians_by_booking
                    .remove(&booking_id)
                    .unwrap_or_default(),
                interval: stored_interval(&start, &end)?,
            })
        })
        .collect()
}

/// A booking's event history, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails or an event cannot be deserialized.
pub fn list_booking_events(
    conn: &mut SqliteConnection,
    booking_id: i64,
) -> Result<Vec<BookingEvent>, PersistenceError> {
    let rows: Vec<BookingEventRow> = booking_events::table
        .filter(booking_events::booking_id.eq(booking_id))
        .order(booking_events::event_id.asc())
        .select(BookingEventRow::as_select())
        .load(conn)?;

    rows.into_iter().map(BookingEvent::try_from).collect()
}
