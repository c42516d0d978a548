// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{
    Seeded, chicago, create_test_area, create_test_service, create_test_technician, monday_nine,
    seed, utc,
};
use crate::Persistence;
use fieldbook::AvailabilitySnapshot;
use fieldbook_domain::{
    BookableService, Business, Coordinates, CountryCode, Interval, PostalCode, ServiceArea,
};

#[test]
fn test_business_round_trip() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let business_id: i64 = persistence
        .insert_business("Lone Star Plumbing", "America/Chicago")
        .unwrap();

    let business: Business = persistence.get_business(business_id).unwrap().unwrap();
    assert_eq!(business.name, "Lone Star Plumbing");
    assert_eq!(business.tz().unwrap(), chicago());
    assert!(business.is_active);
    assert!(persistence.get_business(business_id + 1).unwrap().is_none());
}

#[test]
fn test_service_round_trip() {
    let mut seeded: Seeded = seed(0);
    let stored: BookableService = seeded
        .persistence
        .get_service(seeded.business_id, seeded.service_id)
        .unwrap()
        .unwrap();

    let mut expected: BookableService = create_test_service(seeded.business_id);
    expected.service_id = Some(seeded.service_id);
    assert_eq!(stored, expected);
}

#[test]
fn test_service_is_scoped_to_business() {
    let mut seeded: Seeded = seed(0);
    let other: i64 = seeded
        .persistence
        .insert_business("Elsewhere", "UTC")
        .unwrap();

    assert!(
        seeded
            .persistence
            .get_service(other, seeded.service_id)
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_technician_commitments_are_filtered_by_window() {
    let mut seeded: Seeded = seed(0);
    let mut technician = create_test_technician(seeded.business_id, "Ana");
    technician.commitments = vec![
        Interval::new(utc(3, 2, 15, 30), utc(3, 2, 17, 0)).unwrap(),
        Interval::new(utc(3, 9, 15, 0), utc(3, 9, 16, 0)).unwrap(),
    ];
    let technician_id: i64 = seeded.persistence.insert_technician(&technician).unwrap();

    let snapshot: AvailabilitySnapshot = seeded
        .persistence
        .load_snapshot(seeded.business_id, seeded.service_id, chicago(), 0, &monday_nine())
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.technicians.len(), 1);
    let loaded = &snapshot.technicians[0];
    assert_eq!(loaded.technician_id, Some(technician_id));
    assert_eq!(loaded.working_hours, technician.working_hours);
    assert_eq!(loaded.skills, technician.skills);
    assert_eq!(loaded.commitments, vec![technician.commitments[0]]);
}

#[test]
fn test_load_snapshot_for_unknown_service_is_none() {
    let mut seeded: Seeded = seed(1);
    let snapshot = seeded
        .persistence
        .load_snapshot(seeded.business_id, 999, chicago(), 0, &monday_nine())
        .unwrap();
    assert!(snapshot.is_none());
}

#[test]
fn test_service_areas_upsert_replaces_on_postal_code() {
    let mut seeded: Seeded = seed(0);
    let business_id: i64 = seeded.business_id;

    let written: usize = seeded
        .persistence
        .upsert_service_areas(&[
            create_test_area(business_id, "78701", "Austin"),
            create_test_area(business_id, "78702", "Austin"),
        ])
        .unwrap();
    assert_eq!(written, 2);

    let mut renamed: ServiceArea = create_test_area(business_id, "78701", "Downtown Austin");
    renamed.coordinates = Some(Coordinates::new(30.2711, -97.7437));
    seeded.persistence.upsert_service_areas(&[renamed]).unwrap();

    let areas: Vec<ServiceArea> = seeded
        .persistence
        .list_service_areas(business_id, Some(CountryCode::Us))
        .unwrap();
    assert_eq!(areas.len(), 2);

    let found: ServiceArea = seeded
        .persistence
        .find_service_area(business_id, &PostalCode::parse(CountryCode::Us, "78701").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(found.city, "Downtown Austin");
    assert_eq!(found.coordinates, Some(Coordinates::new(30.2711, -97.7437)));
    assert_eq!(found.min_response_time_hours, 2);
    assert_eq!(found.max_response_time_hours, 4);
}

#[test]
fn test_service_areas_filter_by_country() {
    let mut seeded: Seeded = seed(0);
    let mut london: ServiceArea = create_test_area(seeded.business_id, "78701", "Unused");
    london.postal_code = PostalCode::parse(CountryCode::Gb, "sw1a1aa").unwrap();
    london.city = String::from("London");
    london.timezone = String::from("Europe/London");

    seeded
        .persistence
        .upsert_service_areas(&[create_test_area(seeded.business_id, "78701", "Austin"), london])
        .unwrap();

    let gb: Vec<ServiceArea> = seeded
        .persistence
        .list_service_areas(seeded.business_id, Some(CountryCode::Gb))
        .unwrap();
    assert_eq!(gb.len(), 1);
    assert_eq!(gb[0].postal_code.value(), "SW1A 1AA");

    let all: Vec<ServiceArea> = seeded
        .persistence
        .list_service_areas(seeded.business_id, None)
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_postal_centroid_lookup() {
    let mut persistence: Persistence = Persistence::new_in_memory().unwrap();
    let postal_code: PostalCode = PostalCode::parse(CountryCode::Us, "78705").unwrap();

    assert!(persistence.postal_centroid(&postal_code).unwrap().is_none());

    persistence
        .upsert_postal_centroid(&postal_code, Coordinates::new(30.2940, -97.7404))
        .unwrap();
    assert_eq!(
        persistence.postal_centroid(&postal_code).unwrap(),
        Some(Coordinates::new(30.2940, -97.7404))
    );
}
