// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Test helper functions and fixtures.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use fieldbook_domain::{
    BookableService, Coordinates, CountryCode, PostalCode, PriceType, ServiceArea, ServiceWindow,
    Technician,
};
use fieldbook_persistence::SqlitePersistence;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    ActorInput, AddressInput, AvailabilityRequest, BookingCoordinator, CoordinatorConfig,
    CreateBookingRequest,
};

/// A seeded store: one Austin business, one service, some technicians and
/// two covered ZIP codes.
pub struct Seeded {
    pub persistence: SqlitePersistence,
    pub business_id: i64,
    pub service_id: i64,
    pub technician_ids: Vec<i64>,
}

/// A coordinator over a seeded store.
pub struct Fixture {
    pub coordinator: BookingCoordinator,
    pub business_id: i64,
    pub service_id: i64,
    pub technician_ids: Vec<i64>,
}

/// Sunday 2026-03-01 12:00 UTC, the day before the appointments.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

/// Monday at `hour`:00 Austin time (CST, UTC-6).
pub fn monday_at(hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::west_opt(6 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 3, 2, hour, 0, 0)
        .unwrap()
}

pub fn window(start: u32, end: u32) -> ServiceWindow {
    ServiceWindow::new(
        NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
    )
    .unwrap()
}

pub fn create_test_service(business_id: i64) -> BookableService {
    BookableService {
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
        max_technicians: 2,
        min_lead_time_hours: 2,
        max_advance_days: 30,
        available_days: BTreeSet::from([1, 2, 3, 4, 5]),
        available_times: window(8, 17),
        is_active: true,
    }
}

pub fn create_test_technician(business_id: i64, name: &str) -> Technician {
    Technician {
        technician_id: None,
        business_id,
        name: name.to_string(),
        skills: BTreeSet::from([String::from("plumbing")]),
        working_hours: (1..=5).map(|day| (day, window(8, 17))).collect(),
        commitments: Vec::new(),
        is_active: true,
    }
}

pub fn create_test_area(
    business_id: i64,
    postal_code: &str,
    max_response_time_hours: u32,
    coordinates: Option<Coordinates>,
) -> ServiceArea {
    ServiceArea {
        service_area_id: None,
        business_id,
        postal_code: PostalCode::parse(CountryCode::Us, postal_code).unwrap(),
        city: String::from("Austin"),
        region: String::from("TX"),
        timezone: String::from("America/Chicago"),
        dispatch_fee_cents: 4_900,
        min_response_time_hours: 2,
        max_response_time_hours,
        emergency_available: true,
        regular_available: true,
        coordinates,
    }
}

pub fn seed(technicians: usize) -> Seeded {
    let mut persistence: SqlitePersistence = SqlitePersistence::new_in_memory().unwrap();
    let business_id: i64 = persistence
        .insert_business("Hill Country Plumbing", "America/Chicago")
        .unwrap();
    let service_id: i64 = persistence
        .insert_service(&create_test_service(business_id))
        .unwrap();
    let technician_ids: Vec<i64> = (1..=technicians)
        .map(|n| {
            persistence
                .insert_technician(&create_test_technician(business_id, &format!("Tech {n}")))
                .unwrap()
        })
        .collect();
    persistence
        .upsert_service_areas(&[
            create_test_area(business_id, "78701", 4, None),
            create_test_area(business_id, "78759", 6, None),
        ])
        .unwrap();

    Seeded {
        persistence,
        business_id,
        service_id,
        technician_ids,
    }
}

pub fn fixture(technicians: usize) -> Fixture {
    let seeded: Seeded = seed(technicians);
    Fixture {
        coordinator: BookingCoordinator::new(
            Arc::new(Mutex::new(seeded.persistence)),
            CoordinatorConfig::default(),
        ),
        business_id: seeded.business_id,
        service_id: seeded.service_id,
        technician_ids: seeded.technician_ids,
    }
}

pub fn create_test_address() -> AddressInput {
    AddressInput {
        street: String::from("600 Congress Ave"),
        unit: Some(String::from("Suite 200")),
        city: String::from("Austin"),
        region: String::from("TX"),
        postal_code: String::from("78701-3210"),
        country_code: String::from("us"),
    }
}

pub fn create_availability_request(business_id: i64, service_id: i64) -> AvailabilityRequest {
    AvailabilityRequest {
        business_id,
        service_id,
        start_date: monday(),
        end_date: monday(),
        preferred_times: Vec::new(),
        customer_address: Some(create_test_address()),
        preferred_technician_id: None,
        exclude_technician_ids: Vec::new(),
    }
}

pub fn create_booking_request(fixture: &Fixture, key: &str, hour: u32) -> CreateBookingRequest {
    CreateBookingRequest {
        business_id: fixture.business_id,
        service_id: fixture.service_id,
        requested_at: monday_at(hour),
        preferred_technician_id: None,
        customer_name: String::from("Sam Okafor"),
        customer_phone: String::from("(512) 555-0199"),
        customer_email: Some(String::from("sam@example.com")),
        service_address: create_test_address(),
        problem_description: Some(String::from("Shower drain backing up")),
        preferred_contact_method: String::from("phone"),
        sms_consent: false,
        email_consent: true,
        source: String::from("web"),
        idempotency_key: key.to_string(),
    }
}

pub fn create_test_actor() -> ActorInput {
    ActorInput {
        id: String::from("disp-12"),
        actor_type: String::from("dispatcher"),
    }
}
