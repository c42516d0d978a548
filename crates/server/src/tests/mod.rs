// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Router tests against a seeded in-memory store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode as HttpStatusCode},
};
use chrono::{NaiveTime, TimeZone};
use fieldbook_domain::{
    BookableService, CountryCode, PostalCode, PriceType, ServiceArea, ServiceWindow, Technician,
};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use tower::ServiceExt;

/// Sunday 2026-03-01 12:00 UTC.
fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn window(start: u32, end: u32) -> ServiceWindow {
    ServiceWindow::new(
        NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
    )
    .unwrap()
}

struct TestApp {
    router: Router,
    business_id: i64,
    service_id: i64,
}

/// One Austin business with a drain service, `technicians` plumbers and
/// ZIP 78701 covered.
fn create_test_app(technicians: usize) -> TestApp {
    let mut persistence: SqlitePersistence =
        SqlitePersistence::new_in_memory().expect("Failed to create in-memory persistence");
    let business_id: i64 = persistence
        .insert_business("Hill Country Plumbing", "America/Chicago")
        .unwrap();
    let service_id: i64 = persistence
        .insert_service(&BookableService {
            service_id: None,
            business_id,
            name: String::from("Drain cleaning"),
            required_skills: BTreeSet::from([String::from("plumbing")]),
            estimated_duration_minutes: 60,
            min_duration_minutes: 45,
            max_duration_minutes: 90,
            price_type: PriceType::Fixed,
            base_price_cents: Some(12_500),
            min_technicians: 1,
            max_technicians: 1,
            min_lead_time_hours: 2,
            max_advance_days: 30,
            available_days: BTreeSet::from([1, 2, 3, 4, 5]),
            available_times: window(8, 17),
            is_active: true,
        })
        .unwrap();
    for n in 1..=technicians {
        persistence
            .insert_technician(&Technician {
                technician_id: None,
                business_id,
                name: format!("Tech {n}"),
                skills: BTreeSet::from([String::from("plumbing")]),
                working_hours: (1..=5).map(|day| (day, window(8, 17))).collect(),
                commitments: Vec::new(),
                is_active: true,
            })
            .unwrap();
    }
    persistence
        .upsert_service_areas(&[ServiceArea {
            service_area_id: None,
            business_id,
            postal_code: PostalCode::parse(CountryCode::Us, "78701").unwrap(),
            city: String::from("Austin"),
            region: String::from("TX"),
            timezone: String::from("America/Chicago"),
            dispatch_fee_cents: 4_900,
            min_response_time_hours: 2,
            max_response_time_hours: 4,
            emergency_available: true,
            regular_available: true,
            coordinates: None,
        }])
        .unwrap();

    let mut app_state: AppState = AppState::new(persistence, CoordinatorConfig::default());
    app_state.clock = fixed_now;

    TestApp {
        router: build_router(app_state),
        business_id,
        service_id,
    }
}

fn booking_body(app: &TestApp, key: &str, postal_code: &str) -> Value {
    json!({
        "business_id": app.business_id,
        "service_id": app.service_id,
        "requested_at": "2026-03-02T09:00:00-06:00",
        "customer_name": "Sam Okafor",
        "customer_phone": "512-555-0199",
        "customer_email": "sam@example.com",
        "service_address": {
            "street": "600 Congress Ave",
            "city": "Austin",
            "region": "TX",
            "postal_code": postal_code,
            "country_code": "US"
        },
        "preferred_contact_method": "sms",
        "sms_consent": true,
        "source": "web",
        "idempotency_key": key
    })
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<String>) -> (HttpStatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, Body::from))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };
    (status, value)
}

async fn post_json(router: &Router, uri: &str, body: &Value) -> (HttpStatusCode, Value) {
    send(router, "POST", uri, Some(body.to_string())).await
}

fn error_body(value: Value) -> ErrorResponse {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_health_reports_ok() {
    let app: TestApp = create_test_app(1);

    let (status, body) = send(&app.router, "GET", "/health", None).await;

    assert_eq!(status, HttpStatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_service_area_check_supported_and_not() {
    let app: TestApp = create_test_app(1);

    let (status, body) = post_json(
        &app.router,
        "/api/service-area/check",
        &json!({"business_id": app.business_id, "postal_code": "78701-4410", "country_code": "US"}),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["supported"], true);
    assert_eq!(body["normalized"]["postal_code"], "78701");
    assert!(body.get("suggestions").is_none());

    let (status, body) = post_json(
        &app.router,
        "/api/service-area/check",
        &json!({"business_id": app.business_id, "postal_code": "78759", "country_code": "US"}),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["supported"], false);
    assert_eq!(body["suggestions"][0]["postal_code"], "78701");
}

#[tokio::test]
async fn test_availability_lists_slots_by_local_date() {
    let app: TestApp = create_test_app(2);

    let (status, body) = post_json(
        &app.router,
        "/api/availability",
        &json!({
            "business_id": app.business_id,
            "service_id": app.service_id,
            "start_date": "2026-03-02",
            "end_date": "2026-03-02",
            "preferred_times": ["morning"]
        }),
    )
    .await;

    assert_eq!(status, HttpStatusCode::OK);
    let response: AvailabilityResponse = serde_json::from_value(body).unwrap();
    let slots = &response.available_dates[&chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()];
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0].start.to_rfc3339(), "2026-03-02T08:00:00-06:00");
    assert_eq!(slots[0].capacity, 2);
    assert_eq!(response.base_price, Some(12_500));
}

#[tokio::test]
async fn test_create_booking_then_replay() {
    let app: TestApp = create_test_app(1);
    let body = booking_body(&app, "web-7f3a", "78701");

    let (status, created) = post_json(&app.router, "/api/bookings", &body).await;
    assert_eq!(status, HttpStatusCode::CREATED);
    assert_eq!(created["booking"]["status"], "pending");
    assert_eq!(created["replayed"], false);
    assert_eq!(created["technician_info"][0]["name"], "Tech 1");
    assert_eq!(
        created["estimated_arrival_time"],
        "2026-03-02T09:00:00-06:00"
    );

    let (status, replayed) = post_json(&app.router, "/api/bookings", &body).await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(replayed["replayed"], true);
    assert_eq!(
        replayed["booking"]["booking_id"],
        created["booking"]["booking_id"]
    );

    let booking_id = created["booking"]["booking_id"].as_i64().unwrap();
    let (status, fetched) = send(&app.router, "GET", &format!("/api/bookings/{booking_id}"), None).await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(
        fetched["confirmation_code"],
        created["booking"]["confirmation_code"]
    );
}

#[tokio::test]
async fn test_taken_slot_is_conflict_and_retryable() {
    let app: TestApp = create_test_app(1);

    let (status, _) = post_json(&app.router, "/api/bookings", &booking_body(&app, "first", "78701")).await;
    assert_eq!(status, HttpStatusCode::CREATED);

    let (status, body) = post_json(&app.router, "/api/bookings", &booking_body(&app, "second", "78701")).await;
    assert_eq!(status, HttpStatusCode::CONFLICT);
    let error: ErrorResponse = error_body(body);
    assert!(error.error);
    assert_eq!(error.code, "SLOT_NO_LONGER_AVAILABLE");
    assert!(error.retryable);
}

#[tokio::test]
async fn test_uncovered_address_is_unprocessable() {
    let app: TestApp = create_test_app(1);

    let (status, body) = post_json(&app.router, "/api/bookings", &booking_body(&app, "k1", "78759")).await;

    assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = error_body(body);
    assert_eq!(error.code, "AREA_NOT_SERVICED");
    assert!(!error.retryable);
}

#[tokio::test]
async fn test_malformed_body_is_invalid_format() {
    let app: TestApp = create_test_app(1);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/bookings",
        Some(String::from("{\"business_id\": \"one\"")),
    )
    .await;

    assert_eq!(status, HttpStatusCode::BAD_REQUEST);
    assert_eq!(error_body(body).code, "INVALID_FORMAT");
}

#[tokio::test]
async fn test_non_numeric_booking_id_is_invalid_format() {
    let app: TestApp = create_test_app(1);

    let (status, body) = send(&app.router, "GET", "/api/bookings/latest", None).await;

    assert_eq!(status, HttpStatusCode::BAD_REQUEST);
    assert_eq!(error_body(body).code, "INVALID_FORMAT");
}

#[tokio::test]
async fn test_unknown_booking_is_not_found() {
    let app: TestApp = create_test_app(1);

    let (status, body) = send(&app.router, "GET", "/api/bookings/9001", None).await;

    assert_eq!(status, HttpStatusCode::NOT_FOUND);
    let error: ErrorResponse = error_body(body);
    assert_eq!(error.code, "BOOKING_NOT_FOUND");
    assert!(!error.retryable);
}

#[tokio::test]
async fn test_cancel_then_confirm_is_invalid_transition() {
    let app: TestApp = create_test_app(1);
    let (_, created) = post_json(&app.router, "/api/bookings", &booking_body(&app, "k1", "78701")).await;
    let booking_id = created["booking"]["booking_id"].as_i64().unwrap();

    let (status, cancelled) = post_json(
        &app.router,
        &format!("/api/bookings/{booking_id}/cancel"),
        &json!({"reason": "Customer rescheduled", "actor": {"id": "disp-4"}}),
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancelled_by"], "disp-4");

    let (status, body) = post_json(
        &app.router,
        &format!("/api/bookings/{booking_id}/status"),
        &json!({"status": "confirmed", "actor": {"id": "disp-4"}}),
    )
    .await;
    assert_eq!(status, HttpStatusCode::CONFLICT);
    assert_eq!(error_body(body).code, "INVALID_TRANSITION");

    let (status, events) = send(
        &app.router,
        "GET",
        &format!("/api/bookings/{booking_id}/events"),
        None,
    )
    .await;
    assert_eq!(status, HttpStatusCode::OK);
    let history: BookingEventsResponse = serde_json::from_value(events).unwrap();
    assert_eq!(history.events.len(), 2);
    assert_eq!(history.events[1].action, "CancelBooking");
    assert_eq!(history.events[1].actor_type, "staff");
}

#[tokio::test]
async fn test_status_update_confirms_booking() {
    let app: TestApp = create_test_app(1);
    let (_, created) = post_json(&app.router, "/api/bookings", &booking_body(&app, "k1", "78701")).await;
    let booking_id = created["booking"]["booking_id"].as_i64().unwrap();

    let (status, body) = post_json(
        &app.router,
        &format!("/api/bookings/{booking_id}/status"),
        &json!({"status": "confirmed", "actor": {"id": "disp-4", "actor_type": "dispatcher"}}),
    )
    .await;

    assert_eq!(status, HttpStatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["confirmed_at"], "2026-03-01T12:00:00Z");
}

#[test]
fn test_args_defaults() {
    let args: Args = Args::parse_from(["fieldbook-server"]);

    assert_eq!(args.port, 3000);
    assert_eq!(args.bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
    let config: CoordinatorConfig = args.coordinator_config();
    assert_eq!(config.lock_timeout, Duration::from_secs(2));
    assert_eq!(config.resolver.max_suggestions, 5);
}

#[test]
fn test_csv_import_requires_business() {
    let result = Args::try_parse_from(["fieldbook-server", "--service-areas-csv", "areas.csv"]);
    assert!(result.is_err());
}
