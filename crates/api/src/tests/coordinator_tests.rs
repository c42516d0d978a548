// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    Fixture, create_availability_request, create_booking_request, create_test_actor, fixture,
    monday_at, now,
};
use crate::{
    ApiError, AvailabilityResponse, BookingInfo, CancelBookingRequest, CreateBookingResponse,
    UpdateStatusRequest, get_availability, get_booking, get_booking_events,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

async fn capacity_at(fixture: &Fixture, hour: u32) -> Option<u32> {
    let request = create_availability_request(fixture.business_id, fixture.service_id);
    let mut persistence = fixture.coordinator.persistence().lock().await;
    let response: AvailabilityResponse = get_availability(&mut persistence, &request, now()).unwrap();
    response
        .available_dates
        .values()
        .flatten()
        .find(|slot| slot.start == monday_at(hour))
        .map(|slot| slot.capacity)
}

fn later(minutes: i64) -> DateTime<Utc> {
    now() + Duration::minutes(minutes)
}

#[tokio::test]
async fn test_create_booking_returns_pending_booking() {
    let fixture: Fixture = fixture(2);
    let request = create_booking_request(&fixture, "checkout-0001", 9);

    let response: CreateBookingResponse = fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap();

    assert!(!response.replayed);
    let booking: BookingInfo = response.booking;
    assert_eq!(booking.status, "pending");
    assert!(booking.confirmation_code.starts_with("FB-"));
    assert_eq!(booking.confirmation_code.len(), 11);
    assert_eq!(booking.technician_ids, vec![fixture.technician_ids[0]]);
    assert_eq!(booking.scheduled_start, monday_at(9));
    assert_eq!(booking.scheduled_end, monday_at(10));
    assert_eq!(booking.postal_code, "78701");
    assert_eq!(booking.unit.as_deref(), Some("Suite 200"));
    assert_eq!(response.estimated_arrival_time, Some(monday_at(9)));
    assert_eq!(response.next_steps.len(), 3);
    assert!(response.message.contains(&booking.confirmation_code));

    let technicians = response.technician_info.unwrap();
    assert_eq!(technicians.len(), 1);
    assert_eq!(technicians[0].name, "Tech 1");
}

#[tokio::test]
async fn test_preferred_technician_gets_first_seat() {
    let fixture: Fixture = fixture(3);
    let mut request = create_booking_request(&fixture, "checkout-0001", 9);
    request.preferred_technician_id = Some(fixture.technician_ids[1]);

    let response = fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap();

    assert_eq!(response.booking.technician_ids, vec![fixture.technician_ids[1]]);
}

#[tokio::test]
async fn test_same_key_replays_stored_booking() {
    let fixture: Fixture = fixture(2);
    let request = create_booking_request(&fixture, "checkout-0001", 9);

    let first = fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap();
    let second = fixture
        .coordinator
        .create_booking(&request, later(5))
        .await
        .unwrap();

    assert!(second.replayed);
    assert_eq!(second.booking.booking_id, first.booking.booking_id);
    assert_eq!(second.booking.confirmation_code, first.booking.confirmation_code);
    assert_eq!(second.estimated_arrival_time, Some(monday_at(9)));
    assert_eq!(second.technician_info, first.technician_info);
    assert_eq!(capacity_at(&fixture, 9).await, Some(1));
}

#[tokio::test]
async fn test_fourth_booking_of_three_technicians_is_rejected() {
    let fixture: Fixture = fixture(3);
    assert_eq!(capacity_at(&fixture, 9).await, Some(3));

    let mut assigned: HashSet<i64> = HashSet::new();
    for n in 1..=3 {
        let request = create_booking_request(&fixture, &format!("checkout-000{n}"), 9);
        let response = fixture
            .coordinator
            .create_booking(&request, now())
            .await
            .unwrap();
        assert!(assigned.insert(response.booking.technician_ids[0]));
    }
    assert_eq!(capacity_at(&fixture, 9).await, None);

    let request = create_booking_request(&fixture, "checkout-0004", 9);
    let result = fixture.coordinator.create_booking(&request, now()).await;
    match result {
        Err(err @ ApiError::SlotNoLongerAvailable { .. }) => assert!(err.retryable()),
        other => panic!("expected SlotNoLongerAvailable, got {other:?}"),
    }

    // Other hours are untouched
    assert_eq!(capacity_at(&fixture, 10).await, Some(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commits_for_last_slot() {
    let fixture: Fixture = fixture(1);
    let first = create_booking_request(&fixture, "checkout-aaaa", 9);
    let second = create_booking_request(&fixture, "checkout-bbbb", 9);

    let a = fixture.coordinator.clone();
    let b = fixture.coordinator.clone();
    let (left, right) = tokio::join!(
        tokio::spawn(async move { a.create_booking(&first, now()).await }),
        tokio::spawn(async move { b.create_booking(&second, now()).await }),
    );
    let results = [left.unwrap(), right.unwrap()];

    let created = results.iter().filter(|r| r.is_ok()).count();
    let lost = results
        .iter()
        .filter(|r| matches!(r, Err(ApiError::SlotNoLongerAvailable { .. })))
        .count();
    assert_eq!((created, lost), (1, 1));
    assert!(fixture.coordinator.locks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_replays_create_one_booking() {
    let fixture: Fixture = fixture(2);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = fixture.coordinator.clone();
            let request = create_booking_request(&fixture, "checkout-same", 9);
            tokio::spawn(async move { coordinator.create_booking(&request, now()).await })
        })
        .collect();

    let mut ids: HashSet<i64> = HashSet::new();
    let mut replays: usize = 0;
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        ids.insert(response.booking.booking_id);
        if response.replayed {
            replays += 1;
        }
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(replays, 3);
    assert_eq!(capacity_at(&fixture, 9).await, Some(1));
}

#[tokio::test]
async fn test_outside_service_window_is_invalid_format() {
    let fixture: Fixture = fixture(1);
    let request = create_booking_request(&fixture, "checkout-0001", 17);

    let result = fixture.coordinator.create_booking(&request, now()).await;
    assert!(matches!(
        result,
        Err(ApiError::InvalidFormat { ref field, .. }) if field == "requested_at"
    ));
}

#[tokio::test]
async fn test_inside_lead_time_is_slot_no_longer_available() {
    let fixture: Fixture = fixture(1);
    let request = create_booking_request(&fixture, "checkout-0001", 9);
    let just_before = monday_at(8).with_timezone(&Utc);

    let result = fixture.coordinator.create_booking(&request, just_before).await;
    assert!(matches!(result, Err(ApiError::SlotNoLongerAvailable { .. })));
}

#[tokio::test]
async fn test_invalid_customer_fields_rejected_before_booking() {
    let fixture: Fixture = fixture(1);

    let mut bad_phone = create_booking_request(&fixture, "checkout-0001", 9);
    bad_phone.customer_phone = String::from("555-01");
    let mut bad_email = create_booking_request(&fixture, "checkout-0002", 9);
    bad_email.customer_email = Some(String::from("sam@localhost"));
    let mut bad_source = create_booking_request(&fixture, "checkout-0003", 9);
    bad_source.source = String::from("fax");
    let bad_key = create_booking_request(&fixture, "", 9);

    for (request, expected_field) in [
        (bad_phone, "customer_phone"),
        (bad_email, "customer_email"),
        (bad_source, "source"),
        (bad_key, "idempotency_key"),
    ] {
        let result = fixture.coordinator.create_booking(&request, now()).await;
        assert!(
            matches!(
                result,
                Err(ApiError::InvalidFormat { ref field, .. }) if field == expected_field
            ),
            "expected {expected_field} error, got {result:?}"
        );
    }
    assert_eq!(capacity_at(&fixture, 9).await, Some(1));
}

#[tokio::test]
async fn test_uncovered_address_is_rejected() {
    let fixture: Fixture = fixture(1);
    let mut request = create_booking_request(&fixture, "checkout-0001", 9);
    request.service_address.postal_code = String::from("73301");

    let result = fixture.coordinator.create_booking(&request, now()).await;
    assert!(matches!(result, Err(ApiError::AreaNotServiced { .. })));
}

#[tokio::test]
async fn test_unknown_service_is_rejected() {
    let fixture: Fixture = fixture(1);
    let mut request = create_booking_request(&fixture, "checkout-0001", 9);
    request.service_id = 31_337;

    let result = fixture.coordinator.create_booking(&request, now()).await;
    assert_eq!(result, Err(ApiError::ServiceNotFound { service_id: 31_337 }));
}

#[tokio::test]
async fn test_cancellation_restores_capacity() {
    let fixture: Fixture = fixture(1);
    let request = create_booking_request(&fixture, "checkout-0001", 9);
    let booking = fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap()
        .booking;
    assert_eq!(capacity_at(&fixture, 9).await, None);

    let cancelled: BookingInfo = fixture
        .coordinator
        .cancel_booking(
            booking.booking_id,
            &CancelBookingRequest {
                reason: String::from("Fixed it myself"),
                actor: create_test_actor(),
            },
            later(30),
        )
        .await
        .unwrap();

    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Fixed it myself"));
    assert_eq!(cancelled.cancelled_by.as_deref(), Some("disp-12"));
    assert_eq!(cancelled.cancelled_at, Some(later(30)));
    assert_eq!(capacity_at(&fixture, 9).await, Some(1));

    let rebook = create_booking_request(&fixture, "checkout-0002", 9);
    fixture
        .coordinator
        .create_booking(&rebook, later(40))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancelled_booking_cannot_be_cancelled_again() {
    let fixture: Fixture = fixture(1);
    let request = create_booking_request(&fixture, "checkout-0001", 9);
    let booking_id = fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap()
        .booking
        .booking_id;
    let cancel = CancelBookingRequest {
        reason: String::from("Duplicate request"),
        actor: create_test_actor(),
    };

    fixture
        .coordinator
        .cancel_booking(booking_id, &cancel, later(1))
        .await
        .unwrap();
    let result = fixture
        .coordinator
        .cancel_booking(booking_id, &cancel, later(2))
        .await;

    assert!(matches!(result, Err(ApiError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_blank_cancellation_reason_is_invalid_format() {
    let fixture: Fixture = fixture(1);

    let result = fixture
        .coordinator
        .cancel_booking(
            1,
            &CancelBookingRequest {
                reason: String::from("   "),
                actor: create_test_actor(),
            },
            now(),
        )
        .await;
    assert!(matches!(
        result,
        Err(ApiError::InvalidFormat { ref field, .. }) if field == "reason"
    ));
}

#[tokio::test]
async fn test_missing_booking_is_not_found() {
    let fixture: Fixture = fixture(1);
    let cancel = CancelBookingRequest {
        reason: String::from("No longer needed"),
        actor: create_test_actor(),
    };

    let result = fixture.coordinator.cancel_booking(404, &cancel, now()).await;
    assert_eq!(result, Err(ApiError::BookingNotFound { booking_id: 404 }));

    let mut persistence = fixture.coordinator.persistence().lock().await;
    assert_eq!(
        get_booking(&mut persistence, 404),
        Err(ApiError::BookingNotFound { booking_id: 404 })
    );
}

#[tokio::test]
async fn test_status_lifecycle_records_history() {
    let fixture: Fixture = fixture(1);
    let request = create_booking_request(&fixture, "checkout-0001", 9);
    let booking_id = fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap()
        .booking
        .booking_id;

    for (status, minutes) in [("confirmed", 10), ("in_progress", 1_260), ("completed", 1_320)] {
        let updated = fixture
            .coordinator
            .update_status(
                booking_id,
                &UpdateStatusRequest {
                    status: status.to_string(),
                    actor: create_test_actor(),
                },
                later(minutes),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }

    let mut persistence = fixture.coordinator.persistence().lock().await;
    let booking: BookingInfo = get_booking(&mut persistence, booking_id).unwrap();
    assert_eq!(booking.confirmed_at, Some(later(10)));
    assert_eq!(booking.started_at, Some(later(1_260)));
    assert_eq!(booking.completed_at, Some(later(1_320)));

    let history = get_booking_events(&mut persistence, booking_id).unwrap();
    let actions: Vec<&str> = history.events.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec!["CreateBooking", "ConfirmBooking", "StartBooking", "CompleteBooking"]
    );
    assert_eq!(history.events[0].actor_type, "customer");
    assert_eq!(history.events[1].actor_id, "disp-12");
    assert_eq!(history.events[3].from_status.as_deref(), Some("in_progress"));
}

#[tokio::test]
async fn test_status_update_rejections() {
    let fixture: Fixture = fixture(1);
    let request = create_booking_request(&fixture, "checkout-0001", 9);
    let booking_id = fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap()
        .booking
        .booking_id;

    let update = |status: &str| UpdateStatusRequest {
        status: status.to_string(),
        actor: create_test_actor(),
    };

    // Skipping confirmation is not a valid transition
    let result = fixture
        .coordinator
        .update_status(booking_id, &update("completed"), later(1))
        .await;
    assert!(matches!(result, Err(ApiError::InvalidTransition { .. })));

    // Cancellation has its own operation
    let result = fixture
        .coordinator
        .update_status(booking_id, &update("cancelled"), later(1))
        .await;
    assert!(matches!(result, Err(ApiError::InvalidTransition { .. })));

    let result = fixture
        .coordinator
        .update_status(booking_id, &update("archived"), later(1))
        .await;
    assert!(matches!(
        result,
        Err(ApiError::InvalidFormat { ref field, .. }) if field == "status"
    ));

    let mut persistence = fixture.coordinator.persistence().lock().await;
    assert_eq!(get_booking(&mut persistence, booking_id).unwrap().status, "pending");
    assert_eq!(
        get_booking_events(&mut persistence, booking_id).unwrap().events.len(),
        1
    );
}

#[tokio::test]
async fn test_lock_table_is_empty_between_requests() {
    let fixture: Fixture = fixture(2);
    let request = create_booking_request(&fixture, "checkout-0001", 9);

    fixture
        .coordinator
        .create_booking(&request, now())
        .await
        .unwrap();

    assert!(fixture.coordinator.locks().is_empty());
}
