// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use super::helpers::{Seeded, create_test_area, seed};
use crate::{
    ApiError, AreaCheckInputs, ServiceAreaCheckRequest, ServiceAreaCheckResponse,
    check_service_area, load_area_check, resolve_area_check,
};
use fieldbook::ResolverConfig;
use fieldbook_domain::{Coordinates, CountryCode, PostalCode, ServiceArea};

fn check(
    seeded: &mut Seeded,
    postal_code: &str,
    country_code: &str,
) -> Result<ServiceAreaCheckResponse, ApiError> {
    check_service_area(
        &mut seeded.persistence,
        &ResolverConfig::default(),
        &ServiceAreaCheckRequest {
            business_id: seeded.business_id,
            postal_code: postal_code.to_string(),
            country_code: country_code.to_string(),
        },
    )
}

#[test]
fn test_zip_plus_four_matches_covered_area() {
    let mut seeded: Seeded = seed(1);

    let response = check(&mut seeded, "78701-1234", "US").unwrap();

    assert!(response.supported);
    assert_eq!(response.postal_code, "78701");
    let area = response.normalized.unwrap();
    assert_eq!(area.postal_code, "78701");
    assert_eq!(area.min_response_time_hours, 2);
    assert_eq!(area.max_response_time_hours, 4);
    assert!(response.suggestions.is_none());
}

#[test]
fn test_uncovered_zip_suggests_nearest_area_first() {
    let mut seeded: Seeded = seed(1);

    let response = check(&mut seeded, "78705", "us").unwrap();

    assert!(!response.supported);
    assert!(response.normalized.is_none());
    let suggestions = response.suggestions.unwrap();
    let codes: Vec<&str> = suggestions.iter().map(|s| s.area.postal_code.as_str()).collect();
    assert_eq!(codes, vec!["78701", "78759"]);
    assert!(suggestions.iter().all(|s| s.distance_km.is_none()));
}

#[test]
fn test_loaded_areas_resolve_without_the_store() {
    let mut seeded: Seeded = seed(1);
    let request = ServiceAreaCheckRequest {
        business_id: seeded.business_id,
        postal_code: String::from("78705-1234"),
        country_code: String::from("US"),
    };
    let expected: ServiceAreaCheckResponse = check(&mut seeded, "78705-1234", "US").unwrap();

    let inputs: AreaCheckInputs = load_area_check(&mut seeded.persistence, &request).unwrap();
    drop(seeded);

    assert_eq!(inputs.postal_code.value(), "78705");
    let response = resolve_area_check(&inputs, &ResolverConfig::default());
    assert_eq!(response, expected);
    assert!(!response.supported);
}

#[test]
fn test_geographic_distance_reported_when_centroids_known() {
    let mut seeded: Seeded = seed(1);
    seeded
        .persistence
        .upsert_service_areas(&[
            create_test_area(
                seeded.business_id,
                "78701",
                4,
                Some(Coordinates::new(30.2711, -97.7437)),
            ),
            create_test_area(
                seeded.business_id,
                "78759",
                6,
                Some(Coordinates::new(30.4036, -97.7526)),
            ),
        ])
        .unwrap();
    seeded
        .persistence
        .upsert_postal_centroid(
            &PostalCode::parse(CountryCode::Us, "78757").unwrap(),
            Coordinates::new(30.3516, -97.7329),
        )
        .unwrap();

    let response = check(&mut seeded, "78757", "US").unwrap();

    let suggestions = response.suggestions.unwrap();
    assert_eq!(suggestions[0].area.postal_code, "78759");
    let distances: Vec<f64> = suggestions.iter().map(|s| s.distance_km.unwrap()).collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_suggestions_capped_by_config() {
    let mut seeded: Seeded = seed(1);
    let config = ResolverConfig { max_suggestions: 1 };

    let response = check_service_area(
        &mut seeded.persistence,
        &config,
        &ServiceAreaCheckRequest {
            business_id: seeded.business_id,
            postal_code: String::from("78705"),
            country_code: String::from("US"),
        },
    )
    .unwrap();

    assert_eq!(response.suggestions.unwrap().len(), 1);
}

#[test]
fn test_other_country_areas_never_suggested() {
    let mut seeded: Seeded = seed(1);
    let mut london: ServiceArea = create_test_area(seeded.business_id, "78701", 4, None);
    london.postal_code = PostalCode::parse(CountryCode::Gb, "sw1a1aa").unwrap();
    london.timezone = String::from("Europe/London");
    seeded.persistence.upsert_service_areas(&[london]).unwrap();

    let response = check(&mut seeded, "EC1A 1BB", "uk").unwrap();
    assert!(!response.supported);
    assert_eq!(response.postal_code, "EC1A 1BB");
    let suggestions = response.suggestions.unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].area.postal_code, "SW1A 1AA");
    assert_eq!(suggestions[0].area.country_code, "GB");

    let supported = check(&mut seeded, "sw1a 1aa", "GB").unwrap();
    assert!(supported.supported);
}

#[test]
fn test_unsupported_country_is_invalid_format() {
    let mut seeded: Seeded = seed(1);

    let result = check(&mut seeded, "10115", "DE");
    assert!(matches!(
        result,
        Err(ApiError::InvalidFormat { ref field, .. }) if field == "country_code"
    ));
}

#[test]
fn test_malformed_postal_code_is_invalid_format() {
    let mut seeded: Seeded = seed(1);

    for (postal_code, country) in [("7870", "US"), ("K1A-0B1", "CA"), ("12345", "GB")] {
        let result = check(&mut seeded, postal_code, country);
        assert!(
            matches!(
                result,
                Err(ApiError::InvalidFormat { ref field, .. }) if field == "postal_code"
            ),
            "{postal_code} ({country}) should be rejected, got {result:?}"
        );
    }
}

#[test]
fn test_unknown_business_has_no_coverage() {
    let mut seeded: Seeded = seed(1);
    seeded.business_id = 999;

    let response = check(&mut seeded, "78701", "US").unwrap();
    assert!(!response.supported);
    assert!(response.suggestions.unwrap().is_empty());
}
