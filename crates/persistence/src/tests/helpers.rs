// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{CommitScope, Persistence};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use fieldbook::BookingRequest;
use fieldbook_audit::{Actor, Cause};
use fieldbook_domain::{
    BookableService, BookingSource, ContactMethod, CountryCode, CustomerContact, IdempotencyKey,
    Interval, PostalCode, PriceType, ServiceAddress, ServiceArea, ServiceWindow, Technician,
};
use std::collections::BTreeSet;

/// A seeded database: one Chicago business, one service, some technicians.
pub struct Seeded {
    pub persistence: Persistence,
    pub business_id: i64,
    pub service_id: i64,
    pub technician_ids: Vec<i64>,
}

pub fn chicago() -> Tz {
    "America/Chicago".parse().unwrap()
}

pub fn utc(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, minute, 0).unwrap()
}

/// Sunday noon UTC before Monday 2026-03-02.
pub fn sunday_noon() -> DateTime<Utc> {
    utc(3, 1, 12, 0)
}

pub fn window(start: u32, end: u32) -> ServiceWindow {
    ServiceWindow::new(
        NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
    )
    .unwrap()
}

/// Monday 09:00 to 10:00 Chicago time.
pub fn monday_nine() -> Interval {
    Interval::new(utc(3, 2, 15, 0), utc(3, 2, 16, 0)).unwrap()
}

pub fn create_test_service(business_id: i64) -> BookableService {
    BookableService {
        service_id: None,
        business_id,
        name: String::from("Leak repair"),
        required_skills: BTreeSet::from([String::from("plumbing")]),
        estimated_duration_minutes: 60,
        min_duration_minutes: 30,
        max_duration_minutes: 120,
        price_type: PriceType::Fixed,
        base_price_cents: Some(14_900),
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

pub fn create_test_area(business_id: i64, postal_code: &str, city: &str) -> ServiceArea {
    ServiceArea {
        service_area_id: None,
        business_id,
        postal_code: PostalCode::parse(CountryCode::Us, postal_code).unwrap(),
        city: city.to_string(),
        region: String::from("TX"),
        timezone: String::from("America/Chicago"),
        dispatch_fee_cents: 4_900,
        min_response_time_hours: 2,
        max_response_time_hours: 4,
        emergency_available: false,
        regular_available: true,
        coordinates: None,
    }
}

pub fn seed(technicians: usize) -> Seeded {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let business_id: i64 = persistence
        .insert_business("Lone Star Plumbing", "America/Chicago")
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

    Seeded {
        persistence,
        business_id,
        service_id,
        technician_ids,
    }
}

pub fn create_test_request(seeded: &Seeded, key: &str) -> BookingRequest {
    BookingRequest {
        business_id: seeded.business_id,
        service_id: seeded.service_id,
        requested_start: monday_nine().start(),
        preferred_technician_id: None,
        customer: CustomerContact {
            name: String::from("Jordan Reyes"),
            phone: String::from("512-555-0142"),
            email: Some(String::from("jordan@example.com")),
            preferred_contact_method: ContactMethod::Sms,
            sms_consent: true,
            email_consent: false,
        },
        address: ServiceAddress {
            street: String::from("1100 Congress Ave"),
            unit: None,
            city: String::from("Austin"),
            region: String::from("TX"),
            postal_code: PostalCode::parse(CountryCode::Us, "78701-1234").unwrap(),
        },
        problem_description: Some(String::from("Kitchen sink leaking")),
        source: BookingSource::Web,
        idempotency_key: IdempotencyKey::parse(key).unwrap(),
    }
}

pub fn create_test_scope(seeded: &Seeded, key: &str) -> CommitScope {
    CommitScope {
        business_id: seeded.business_id,
        service_id: seeded.service_id,
        idempotency_key: IdempotencyKey::parse(key).unwrap(),
        tz: chicago(),
        min_response_time_hours: 0,
        window: monday_nine(),
    }
}

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("disp-7"), String::from("dispatcher"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-456"), String::from("Dispatcher request"))
}
