// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Persistence layer for the Fieldbook booking engine.
//!
//! Stores reference data (businesses, service areas, postal centroids,
//! services, technicians and their commitments) and the booking state owned
//! by the coordinator (bookings, technician seats, booking events).
//!
//! ## Backend
//!
//! `SQLite` through Diesel, with embedded migrations. In-memory databases use
//! a unique shared-cache name per instance so tests stay isolated; file
//! databases run in WAL mode. Foreign key enforcement is verified at startup.
//!
//! ## Commit Boundary
//!
//! [`Persistence::commit_booking`] and [`Persistence::transition_booking`]
//! are the only writers of booking state. Each runs its read, decision and
//! writes inside one `BEGIN IMMEDIATE` transaction, so the availability
//! re-check always sees the state it writes against.

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

mod backend;
mod data_models;
mod diesel_schema;
mod error;
mod mutations;
mod queries;

#[cfg(test)]
mod tests;

use chrono_tz::Tz;
use diesel::SqliteConnection;
use fieldbook::{AvailabilitySnapshot, BookingPlan, CoreError, TransitionResult};
use fieldbook_audit::BookingEvent;
use fieldbook_domain::{
    BookableService, Booking, Business, Coordinates, CountryCode, IdempotencyKey, Interval,
    PostalCode, ServiceArea, Technician,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

pub use error::PersistenceError;

use backend::PersistenceBackend;

/// Atomic counter for generating unique in-memory database names.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Type alias kept for callers that name the backend explicitly.
pub type SqlitePersistence = Persistence;

/// What a commit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new booking was stored.
    Created(Booking),
    /// The idempotency key was already used; the stored booking is returned
    /// unchanged.
    Replayed(Booking),
}

impl CommitOutcome {
    #[must_use]
    pub const fn booking(&self) -> &Booking {
        match self {
            Self::Created(booking) | Self::Replayed(booking) => booking,
        }
    }

    #[must_use]
    pub fn into_booking(self) -> Booking {
        match self {
            Self::Created(booking) | Self::Replayed(booking) => booking,
        }
    }

    #[must_use]
    pub const fn is_replay(&self) -> bool {
        matches!(self, Self::Replayed(_))
    }
}

/// Where a commit reads its availability snapshot from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitScope {
    pub business_id: i64,
    pub service_id: i64,
    pub idempotency_key: IdempotencyKey,
    /// Timezone local service windows are evaluated in.
    pub tz: Tz,
    /// Response-time floor of the customer's service area.
    pub min_response_time_hours: u32,
    /// Interval whose technician commitments and assignments are loaded.
    pub window: Interval,
}

/// Persistence adapter for reference data and booking state.
pub struct Persistence {
    conn: SqliteConnection,
}

impl Persistence {
    /// Creates a persistence adapter backed by a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, PersistenceError> {
        let db_id = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url = format!("file:fieldbook_mem_{db_id}?mode=memory&cache=shared");

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(&shared_memory_url)?;
        conn.verify_foreign_key_enforcement()?;

        Ok(Self { conn })
    }

    /// Creates a persistence adapter backed by a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path_str = path.as_ref().to_str().ok_or_else(|| {
            PersistenceError::InitializationError("Invalid database path".to_string())
        })?;

        let mut conn: SqliteConnection = backend::sqlite::initialize_database(path_str)?;
        backend::sqlite::enable_wal_mode(&mut conn)?;
        conn.verify_foreign_key_enforcement()?;

        Ok(Self { conn })
    }

    /// Verifies that foreign key enforcement is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if foreign key enforcement is not enabled.
    pub fn verify_foreign_key_enforcement(&mut self) -> Result<(), PersistenceError> {
        self.conn.verify_foreign_key_enforcement()
    }

    // ========================================================================
    // Reference Data
    // ========================================================================

    /// Creates a business and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_business(&mut self, name: &str, timezone: &str) -> Result<i64, PersistenceError> {
        mutations::insert_business(&mut self.conn, name, timezone)
    }

    /// Writes a batch of service areas atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any row fails; nothing is written in that case.
    pub fn upsert_service_areas(&mut self, areas: &[ServiceArea]) -> Result<usize, PersistenceError> {
        self.conn
            .immediate_transaction(|conn| mutations::upsert_service_areas(conn, areas))
    }

    /// Records a postal code centroid.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn upsert_postal_centroid(
        &mut self,
        postal_code: &PostalCode,
        centroid: Coordinates,
    ) -> Result<(), PersistenceError> {
        mutations::upsert_postal_centroid(&mut self.conn, postal_code, centroid)
    }

    /// Creates a bookable service and returns its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_service(&mut self, service: &BookableService) -> Result<i64, PersistenceError> {
        mutations::insert_service(&mut self.conn, service)
    }

    /// Creates a technician with their commitments and returns the ID.
    ///
    /// # Errors
    ///
    /// Returns an error if an insert fails; nothing is written in that case.
    pub fn insert_technician(&mut self, technician: &Technician) -> Result<i64, PersistenceError> {
        self.conn
            .immediate_transaction(|conn| mutations::insert_technician(conn, technician))
    }

    /// Records an external calendar commitment.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn add_technician_commitment(
        &mut self,
        technician_id: i64,
        interval: &Interval,
    ) -> Result<i64, PersistenceError> {
        mutations::add_technician_commitment(&mut self.conn, technician_id, interval)
    }

    /// Retrieves a business.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_business(&mut self, business_id: i64) -> Result<Option<Business>, PersistenceError> {
        queries::get_business(&mut self.conn, business_id)
    }

    /// Lists a business's service areas, optionally for one country.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_service_areas(
        &mut self,
        business_id: i64,
        country: Option<CountryCode>,
    ) -> Result<Vec<ServiceArea>, PersistenceError> {
        queries::list_service_areas(&mut self.conn, business_id, country)
    }

    /// Finds the area configured for a normalized postal code.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_service_area(
        &mut self,
        business_id: i64,
        postal_code: &PostalCode,
    ) -> Result<Option<ServiceArea>, PersistenceError> {
        queries::find_service_area(&mut self.conn, business_id, postal_code)
    }

    /// Looks up a postal code centroid.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn postal_centroid(
        &mut self,
        postal_code: &PostalCode,
    ) -> Result<Option<Coordinates>, PersistenceError> {
        queries::postal_centroid(&mut self.conn, postal_code)
    }

    /// Retrieves a business's service.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_service(
        &mut self,
        business_id: i64,
        service_id: i64,
    ) -> Result<Option<BookableService>, PersistenceError> {
        queries::get_service(&mut self.conn, business_id, service_id)
    }

    /// Loads the availability snapshot for a service over `window`.
    ///
    /// Returns `None` if the business has no such service.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn load_snapshot(
        &mut self,
        business_id: i64,
        service_id: i64,
        tz: Tz,
        min_response_time_hours: u32,
        window: &Interval,
    ) -> Result<Option<AvailabilitySnapshot>, PersistenceError> {
        load_snapshot(
            &mut self.conn,
            business_id,
            service_id,
            tz,
            min_response_time_hours,
            window,
        )
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    /// Retrieves a booking.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::BookingNotFound` if it does not exist.
    pub fn get_booking(&mut self, booking_id: i64) -> Result<Booking, PersistenceError> {
        queries::get_booking(&mut self.conn, booking_id)
    }

    /// Finds the booking stored under an idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_booking_by_idempotency_key(
        &mut self,
        business_id: i64,
        key: &IdempotencyKey,
    ) -> Result<Option<Booking>, PersistenceError> {
        queries::find_booking_by_idempotency_key(&mut self.conn, business_id, key)
    }

    /// Retrieves a booking's event history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::BookingNotFound` if the booking does not
    /// exist.
    pub fn booking_events(&mut self, booking_id: i64) -> Result<Vec<BookingEvent>, PersistenceError> {
        queries::get_booking(&mut self.conn, booking_id)?;
        queries::list_booking_events(&mut self.conn, booking_id)
    }

    /// Commits a booking exactly once per idempotency key.
    ///
    /// Inside one immediate transaction: returns the stored booking if the key
    /// was already used, otherwise loads a fresh snapshot, lets `plan` decide
    /// against it, and stores the booking, its technician seats and the
    /// creation event.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::CommitRejected` when `plan` rejects the
    /// request (including a service that no longer exists), or another error
    /// if storage fails. Nothing is written on error.
    pub fn commit_booking<F>(
        &mut self,
        scope: &CommitScope,
        plan: F,
    ) -> Result<CommitOutcome, PersistenceError>
    where
        F: FnOnce(&AvailabilitySnapshot) -> Result<BookingPlan, CoreError>,
    {
        let result: Result<CommitOutcome, PersistenceError> =
            self.conn.immediate_transaction(|conn| {
                if let Some(existing) = queries::find_booking_by_idempotency_key(
                    conn,
                    scope.business_id,
                    &scope.idempotency_key,
                )? {
                    return Ok(CommitOutcome::Replayed(existing));
                }

                let snapshot: AvailabilitySnapshot = load_snapshot(
                    conn,
                    scope.business_id,
                    scope.service_id,
                    scope.tz,
                    scope.min_response_time_hours,
                    &scope.window,
                )?
                .ok_or(CoreError::ServiceNotFound {
                    service_id: scope.service_id,
                })?;

                let BookingPlan { booking, event } = plan(&snapshot)?;
                let booking_id: i64 = mutations::insert_booking(conn, &booking)?;
                mutations::insert_booking_event(conn, booking_id, &event)?;

                Ok(CommitOutcome::Created(queries::get_booking(conn, booking_id)?))
            });

        match result {
            Ok(CommitOutcome::Created(booking)) => {
                info!(
                    booking_id = booking.booking_id,
                    business_id = booking.business_id,
                    confirmation_code = %booking.confirmation_code,
                    "Booking committed"
                );
                Ok(CommitOutcome::Created(booking))
            }
            Ok(replayed) => {
                debug!(
                    booking_id = replayed.booking().booking_id,
                    "Idempotency key replayed"
                );
                Ok(replayed)
            }
            Err(PersistenceError::DuplicateIdempotencyKey(key)) => {
                warn!(key = %key, "Lost idempotency race; returning stored booking");
                queries::find_booking_by_idempotency_key(
                    &mut self.conn,
                    scope.business_id,
                    &scope.idempotency_key,
                )?
                .map(CommitOutcome::Replayed)
                .ok_or(PersistenceError::DuplicateIdempotencyKey(key))
            }
            Err(e) => Err(e),
        }
    }

    /// Applies a status change to a stored booking.
    ///
    /// `transition` receives the current booking inside an immediate
    /// transaction; the updated booking and its event are stored together.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::BookingNotFound` if the booking does not
    /// exist, `PersistenceError::CommitRejected` if `transition` rejects the
    /// change, or another error if storage fails.
    pub fn transition_booking<F>(
        &mut self,
        booking_id: i64,
        transition: F,
    ) -> Result<Booking, PersistenceError>
    where
        F: FnOnce(&Booking) -> Result<TransitionResult, CoreError>,
    {
        let booking: Booking = self.conn.immediate_transaction(|conn| {
            let current: Booking = queries::get_booking(conn, booking_id)?;
            let TransitionResult { booking, event } = transition(&current)?;
            mutations::update_booking_status(conn, &booking)?;
            mutations::insert_booking_event(conn, booking_id, &event)?;
            Ok::<_, PersistenceError>(booking)
        })?;

        info!(
            booking_id,
            status = booking.status.as_str(),
            "Booking status changed"
        );
        Ok(booking)
    }
}

fn load_snapshot(
    conn: &mut SqliteConnection,
    business_id: i64,
    service_id: i64,
    tz: Tz,
    min_response_time_hours: u32,
    window: &Interval,
) -> Result<Option<AvailabilitySnapshot>, PersistenceError> {
    let Some(service) = queries::get_service(conn, business_id, service_id)? else {
        return Ok(None);
    };
    let technicians: Vec<Technician> = queries::list_technicians(conn, business_id, window)?;
    let assignments = queries::active_assignments(conn, business_id, window)?;

    Ok(Some(AvailabilitySnapshot {
        service,
        tz,
        min_response_time_hours,
        technicians,
        assignments,
    }))
}
