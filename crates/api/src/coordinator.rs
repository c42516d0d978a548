// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Booking coordinator: the only path that writes booking state.
//!
//! ## Commit sequence
//!
//! 1. Validate the request (no locks held)
//! 2. Under the store lock: replay check, service and area resolution, and
//!    the candidate technicians that decide which reservation keys to take
//! 3. Release the store, then take the reservation locks in sorted order
//!    within the configured wait budget
//! 4. Under the store lock again: one immediate transaction repeats the
//!    replay check and the qualification check, then writes
//!
//! The store lock is never held while waiting for a reservation lock.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use fieldbook::{
    AvailabilitySnapshot, Command, ResolverConfig, apply, candidate_technicians,
    check_booking_horizon, check_service_window, plan_booking, requested_interval,
};
use fieldbook_audit::{Actor, Cause};
use fieldbook_domain::{Booking, BookingStatus, Interval, Technician};
use fieldbook_persistence::{CommitOutcome, CommitScope, SqlitePersistence};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{
    ApiError, translate_core_error, translate_domain_error, translate_persistence_error,
};
use crate::handlers::{SchedulingZone, load_service, parse_booking_request, scheduling_zone};
use crate::request_response::{
    ActorInput, BookingInfo, CancelBookingRequest, CreateBookingRequest, CreateBookingResponse,
    TechnicianInfo, UpdateStatusRequest,
};
use crate::reservation_locks::{ReservationGuard, ReservationKey, ReservationLocks};

/// Default total wait for reservation locks.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Alphabet for confirmation codes; omits I, L, O and U.
const CODE_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const CODE_LENGTH: usize = 8;

/// Coordinator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Total wait for every reservation lock of one request.
    pub lock_timeout: Duration,
    /// Settings for coverage checks.
    pub resolver: ResolverConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            resolver: ResolverConfig::default(),
        }
    }
}

/// What phase 2 of a commit decides before locks are taken.
struct PreparedCommit {
    zone: SchedulingZone,
    interval: Interval,
    keys: Vec<ReservationKey>,
}

/// Serializes booking writes per technician and commits them exactly once
/// per idempotency key.
#[derive(Clone)]
pub struct BookingCoordinator {
    persistence: Arc<Mutex<SqlitePersistence>>,
    locks: Arc<ReservationLocks>,
    config: CoordinatorConfig,
}

impl BookingCoordinator {
    #[must_use]
    pub fn new(persistence: Arc<Mutex<SqlitePersistence>>, config: CoordinatorConfig) -> Self {
        Self {
            persistence,
            locks: Arc::new(ReservationLocks::new()),
            config,
        }
    }

    /// The shared store, for read-only handlers.
    #[must_use]
    pub const fn persistence(&self) -> &Arc<Mutex<SqlitePersistence>> {
        &self.persistence
    }

    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    #[must_use]
    pub const fn locks(&self) -> &Arc<ReservationLocks> {
        &self.locks
    }

    /// Creates a booking, or returns the one already stored under the
    /// request's idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A field is malformed or the time is outside the service window
    ///   (`InvalidFormat`)
    /// - The service is unknown or inactive (`ServiceNotFound`)
    /// - The address is not covered (`AreaNotServiced`)
    /// - Too few technicians are still free, the lead time has passed, or
    ///   the reservation locks were not acquired in time
    ///   (`SlotNoLongerAvailable`)
    /// - The store is unreachable (`ServiceUnavailable`)
    pub async fn create_booking(
        &self,
        request: &CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<CreateBookingResponse, ApiError> {
        let booking_request = parse_booking_request(request)?;

        let prepared: PreparedCommit = {
            let mut persistence = self.persistence.lock().await;

            if let Some(existing) = persistence
                .find_booking_by_idempotency_key(
                    booking_request.business_id,
                    &booking_request.idempotency_key,
                )
                .map_err(translate_persistence_error)?
            {
                debug!(
                    booking_id = existing.booking_id,
                    "Idempotency key already used; replaying"
                );
                return replay_response(&mut persistence, &existing);
            }

            let (business, service) = load_service(
                &mut persistence,
                booking_request.business_id,
                booking_request.service_id,
            )?;
            let zone: SchedulingZone = scheduling_zone(
                &mut persistence,
                &business,
                Some(&booking_request.address.postal_code),
            )?;

            let interval: Interval = requested_interval(&service, booking_request.requested_start)
                .map_err(translate_core_error)?;
            check_service_window(&service, &interval, zone.tz).map_err(translate_core_error)?;
            check_booking_horizon(&service, zone.min_response_time_hours, &interval, now)
                .map_err(translate_core_error)?;

            let snapshot: AvailabilitySnapshot = persistence
                .load_snapshot(
                    booking_request.business_id,
                    booking_request.service_id,
                    zone.tz,
                    zone.min_response_time_hours,
                    &interval,
                )
                .map_err(translate_persistence_error)?
                .ok_or(ApiError::ServiceNotFound {
                    service_id: booking_request.service_id,
                })?;

            let candidates: Vec<i64> =
                candidate_technicians(&snapshot.technicians, &snapshot.service);
            let keys: Vec<ReservationKey> =
                ReservationKey::for_interval(booking_request.business_id, &candidates, &interval);

            PreparedCommit {
                zone,
                interval,
                keys,
            }
        };

        let _guard: ReservationGuard = self
            .locks
            .acquire(&prepared.keys, self.config.lock_timeout)
            .await
            .map_err(|e| ApiError::SlotNoLongerAvailable {
                message: e.to_string(),
            })?;

        let scope = CommitScope {
            business_id: booking_request.business_id,
            service_id: booking_request.service_id,
            idempotency_key: booking_request.idempotency_key.clone(),
            tz: prepared.zone.tz,
            min_response_time_hours: prepared.zone.min_response_time_hours,
            window: prepared.interval,
        };
        let confirmation_code: String = generate_confirmation_code();
        let mut assigned: Vec<TechnicianInfo> = Vec::new();

        let mut persistence = self.persistence.lock().await;
        let outcome: CommitOutcome = persistence
            .commit_booking(&scope, |snapshot| {
                let plan = plan_booking(snapshot, &booking_request, confirmation_code, now)?;
                assigned = technician_info(&snapshot.technicians, &plan.booking.technician_ids);
                Ok(plan)
            })
            .map_err(translate_persistence_error)?;

        match outcome {
            CommitOutcome::Created(booking) => {
                info!(
                    booking_id = booking.booking_id,
                    confirmation_code = %booking.confirmation_code,
                    technicians = ?booking.technician_ids,
                    "Booking created"
                );
                Ok(created_response(&booking, prepared.zone.tz, assigned))
            }
            CommitOutcome::Replayed(booking) => replay_response(&mut persistence, &booking),
        }
    }

    /// Cancels a `pending` or `confirmed` booking, releasing its technicians.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for a blank reason or actor,
    /// `BookingNotFound` for an unknown booking, or `InvalidTransition` if
    /// the booking can no longer be cancelled.
    pub async fn cancel_booking(
        &self,
        booking_id: i64,
        request: &CancelBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<BookingInfo, ApiError> {
        if request.reason.trim().is_empty() {
            return Err(ApiError::InvalidFormat {
                field: String::from("reason"),
                message: String::from("cancellation reason must not be empty"),
            });
        }
        let actor: Actor = parse_actor(&request.actor)?;

        let command = Command::Cancel {
            reason: request.reason.trim().to_string(),
        };
        let booking: Booking = self.transition(booking_id, command, actor, now).await?;

        info!(booking_id, "Booking cancelled");
        Ok(BookingInfo::from(&booking))
    }

    /// Moves a booking to `confirmed`, `in_progress`, `completed` or
    /// `no_show`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for an unknown status or blank actor,
    /// `BookingNotFound` for an unknown booking, or `InvalidTransition` if
    /// the lifecycle does not permit the change.
    pub async fn update_status(
        &self,
        booking_id: i64,
        request: &UpdateStatusRequest,
        now: DateTime<Utc>,
    ) -> Result<BookingInfo, ApiError> {
        let target: BookingStatus =
            BookingStatus::from_str(request.status.trim()).map_err(translate_domain_error)?;
        let command: Command = Command::for_target(target).map_err(translate_core_error)?;
        let actor: Actor = parse_actor(&request.actor)?;

        let booking: Booking = self.transition(booking_id, command, actor, now).await?;
        Ok(BookingInfo::from(&booking))
    }

    /// Applies a lifecycle command while holding the booking's own
    /// technician locks.
    async fn transition(
        &self,
        booking_id: i64,
        command: Command,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Booking, ApiError> {
        let keys: Vec<ReservationKey> = {
            let mut persistence = self.persistence.lock().await;
            let booking: Booking = persistence
                .get_booking(booking_id)
                .map_err(translate_persistence_error)?;
            ReservationKey::for_interval(
                booking.business_id,
                &booking.technician_ids,
                &booking.scheduled,
            )
        };

        let _guard: ReservationGuard = self
            .locks
            .acquire(&keys, self.config.lock_timeout)
            .await
            .map_err(|e| ApiError::ServiceUnavailable {
                message: e.to_string(),
            })?;

        let cause = Cause::new(
            format!("booking-{booking_id}"),
            format!("{} requested by {}", command.action_name(), actor.id),
        );

        let mut persistence = self.persistence.lock().await;
        persistence
            .transition_booking(booking_id, |current| {
                apply(current, command, actor, cause, now)
            })
            .map_err(translate_persistence_error)
    }
}

fn parse_actor(input: &ActorInput) -> Result<Actor, ApiError> {
    let id: &str = input.id.trim();
    if id.is_empty() {
        return Err(ApiError::InvalidFormat {
            field: String::from("actor.id"),
            message: String::from("must not be empty"),
        });
    }
    let actor_type: &str = input.actor_type.trim();
    Ok(Actor::new(
        id.to_string(),
        if actor_type.is_empty() {
            String::from("staff")
        } else {
            actor_type.to_string()
        },
    ))
}

/// Generates a human-friendly confirmation code such as `FB-7Q2M9KXA`.
fn generate_confirmation_code() -> String {
    let mut bits: u64 = rand::random::<u64>();
    let mut code: String = String::with_capacity(3 + CODE_LENGTH);
    code.push_str("FB-");
    for _ in 0..CODE_LENGTH {
        let index: usize = usize::try_from(bits & 0x1f).unwrap_or_default();
        code.push(char::from(CODE_ALPHABET[index]));
        bits >>= 5;
    }
    code
}

fn technician_info(technicians: &[Technician], ids: &[i64]) -> Vec<TechnicianInfo> {
    ids.iter()
        .filter_map(|id| {
            technicians
                .iter()
                .find(|t| t.technician_id == Some(*id))
                .map(|t| TechnicianInfo {
                    technician_id: *id,
                    name: t.name.clone(),
                })
        })
        .collect()
}

fn created_response(
    booking: &Booking,
    tz: Tz,
    technicians: Vec<TechnicianInfo>,
) -> CreateBookingResponse {
    CreateBookingResponse {
        booking: BookingInfo::from(booking),
        message: format!(
            "Booking received. Your confirmation code is {}.",
            booking.confirmation_code
        ),
        next_steps: next_steps(booking),
        estimated_arrival_time: Some(booking.scheduled.start().with_timezone(&tz).fixed_offset()),
        technician_info: (!technicians.is_empty()).then_some(technicians),
        replayed: false,
    }
}

/// Rebuilds the response for a booking stored under a reused key.
fn replay_response(
    persistence: &mut SqlitePersistence,
    booking: &Booking,
) -> Result<CreateBookingResponse, ApiError> {
    let tz: Tz = display_timezone(persistence, booking)?;
    let technicians: Vec<TechnicianInfo> = persistence
        .load_snapshot(
            booking.business_id,
            booking.service_id,
            tz,
            0,
            &booking.scheduled,
        )
        .map_err(translate_persistence_error)?
        .map(|snapshot| technician_info(&snapshot.technicians, &booking.technician_ids))
        .unwrap_or_default();

    let mut response: CreateBookingResponse = created_response(booking, tz, technicians);
    response.message = format!(
        "Booking already received. Your confirmation code is {}.",
        booking.confirmation_code
    );
    response.replayed = true;
    Ok(response)
}

/// The timezone a stored booking is shown in: its area's, else the
/// business default, else UTC.
fn display_timezone(
    persistence: &mut SqlitePersistence,
    booking: &Booking,
) -> Result<Tz, ApiError> {
    if let Some(area) = persistence
        .find_service_area(booking.business_id, &booking.address.postal_code)
        .map_err(translate_persistence_error)?
    {
        if let Ok(tz) = area.tz() {
            return Ok(tz);
        }
    }
    Ok(persistence
        .get_business(booking.business_id)
        .map_err(translate_persistence_error)?
        .and_then(|business| business.tz().ok())
        .unwrap_or(Tz::UTC))
}

fn next_steps(booking: &Booking) -> Vec<String> {
    vec![
        String::from("We will confirm your technician assignment shortly."),
        format!(
            "We will reach you by {} before the visit.",
            booking.customer.preferred_contact_method.as_str()
        ),
        format!(
            "Quote confirmation code {} if you need to change the booking.",
            booking.confirmation_code
        ),
    ]
}
