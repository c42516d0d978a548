// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::{AvailabilitySnapshot, BookingRequest};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use fieldbook_audit::{Actor, Cause};
use fieldbook_domain::{
    BookableService, Booking, BookingAssignment, BookingSource, BookingStatus, ContactMethod,
    CountryCode, CustomerContact, IdempotencyKey, Interval, PostalCode, PriceType,
    ServiceAddress, ServiceWindow, Technician,
};
use std::collections::{BTreeMap, BTreeSet};

pub const SERVICE_ID: i64 = 10;

pub fn chicago() -> Tz {
    "America/Chicago".parse().unwrap()
}

pub fn utc(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, hour, minute, 0).unwrap()
}

/// Monday 2026-03-02. Chicago is UTC-6 that week.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

/// Sunday noon UTC before `monday()`.
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

/// One-technician, hour-long plumbing visit, weekdays 08:00-17:00.
pub fn create_test_service() -> BookableService {
    BookableService {
        service_id: Some(SERVICE_ID),
        business_id: 1,
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

pub fn create_test_technician(id: i64) -> Technician {
    Technician {
        technician_id: Some(id),
        business_id: 1,
        name: format!("Tech {id}"),
        skills: BTreeSet::from([String::from("plumbing")]),
        working_hours: (1..=5).map(|day| (day, window(8, 17))).collect::<BTreeMap<_, _>>(),
        commitments: Vec::new(),
        is_active: true,
    }
}

pub fn create_test_snapshot(technicians: usize) -> AvailabilitySnapshot {
    AvailabilitySnapshot {
        service: create_test_service(),
        tz: chicago(),
        min_response_time_hours: 0,
        technicians: (1..=technicians)
            .map(|id| create_test_technician(i64::try_from(id).unwrap()))
            .collect(),
        assignments: Vec::new(),
    }
}

pub fn assignment(booking_id: i64, technician_ids: &[i64], interval: Interval) -> BookingAssignment {
    BookingAssignment {
        booking_id,
        service_id: SERVICE_ID,
        technician_ids: technician_ids.to_vec(),
        interval,
    }
}

pub fn create_test_customer() -> CustomerContact {
    CustomerContact {
        name: String::from("Jordan Reyes"),
        phone: String::from("512-555-0142"),
        email: Some(String::from("jordan@example.com")),
        preferred_contact_method: ContactMethod::Phone,
        sms_consent: false,
        email_consent: true,
    }
}

pub fn create_test_address() -> ServiceAddress {
    ServiceAddress {
        street: String::from("1100 Congress Ave"),
        unit: Some(String::from("4B")),
        city: String::from("Austin"),
        region: String::from("TX"),
        postal_code: PostalCode::parse(CountryCode::Us, "78701").unwrap(),
    }
}

/// Request for Monday 09:00 Chicago time.
pub fn create_test_request() -> BookingRequest {
    BookingRequest {
        business_id: 1,
        service_id: SERVICE_ID,
        requested_start: utc(3, 2, 15, 0),
        preferred_technician_id: None,
        customer: create_test_customer(),
        address: create_test_address(),
        problem_description: Some(String::from("Kitchen sink leaking")),
        source: BookingSource::Web,
        idempotency_key: IdempotencyKey::parse("wizard-0001").unwrap(),
    }
}

pub fn create_test_booking(status: BookingStatus) -> Booking {
    Booking {
        booking_id: 42,
        business_id: 1,
        service_id: SERVICE_ID,
        confirmation_code: String::from("FB-7K2M9Q4X"),
        status,
        requested_at: sunday_noon(),
        scheduled: Interval::new(utc(3, 2, 15, 0), utc(3, 2, 16, 0)).unwrap(),
        technician_ids: vec![1],
        customer: create_test_customer(),
        address: create_test_address(),
        problem_description: None,
        source: BookingSource::Phone,
        idempotency_key: IdempotencyKey::parse("wizard-0001").unwrap(),
        confirmed_at: None,
        started_at: None,
        completed_at: None,
        cancellation: None,
        created_at: sunday_noon(),
        updated_at: sunday_noon(),
    }
}

pub fn create_test_actor() -> Actor {
    Actor::new(String::from("disp-7"), String::from("dispatcher"))
}

pub fn create_test_cause() -> Cause {
    Cause::new(String::from("req-456"), String::from("Dispatcher request"))
}
