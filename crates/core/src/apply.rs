// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::command::Command;
use crate::error::CoreError;
use crate::state::TransitionResult;
use chrono::{DateTime, Utc};
use fieldbook_audit::{Action, Actor, BookingEvent, Cause};
use fieldbook_domain::{Booking, BookingStatus, Cancellation, DomainError};

/// Applies a lifecycle command to a booking, producing the updated booking
/// and the event recording the change.
///
/// # Arguments
///
/// * `booking` - The current booking (immutable)
/// * `command` - The command to apply
/// * `actor` - Who performs the change
/// * `cause` - Why the change happens
/// * `now` - When the change happens
///
/// # Errors
///
/// Returns an error if:
/// - The transition is not permitted from the booking's status
/// - A cancellation carries a blank reason
pub fn apply(
    booking: &Booking,
    command: Command,
    actor: Actor,
    cause: Cause,
    now: DateTime<Utc>,
) -> Result<TransitionResult, CoreError> {
    let from: BookingStatus = booking.status;
    let to: BookingStatus = command.target();
    from.validate_transition(to)?;

    let mut updated: Booking = booking.clone();
    updated.status = to;
    updated.updated_at = now;

    let details: Option<String> = match &command {
        Command::Confirm => {
            updated.confirmed_at = Some(now);
            None
        }
        Command::Start => {
            updated.started_at = Some(now);
            None
        }
        Command::Complete => {
            updated.completed_at = Some(now);
            None
        }
        Command::MarkNoShow => None,
        Command::Cancel { reason } => {
            let reason: &str = reason.trim();
            if reason.is_empty() {
                return Err(CoreError::DomainViolation(
                    DomainError::InvalidCustomerField {
                        field: "reason",
                        reason: String::from("cancellation reason must not be empty"),
                    },
                ));
            }
            updated.cancellation = Some(Cancellation {
                reason: reason.to_string(),
                cancelled_by: actor.id.clone(),
                cancelled_at: now,
            });
            Some(reason.to_string())
        }
    };

    let event: BookingEvent = BookingEvent::new(
        booking.booking_id,
        actor,
        cause,
        Action::new(command.action_name().to_string(), details),
        Some(from),
        to,
        now,
    );

    Ok(TransitionResult {
        booking: updated,
        event,
    })
}
