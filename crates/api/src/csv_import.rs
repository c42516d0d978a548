// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! CSV preview and import of service areas.
//!
//! Preview validates every row without touching storage. Import persists
//! only when every row is valid, in one transaction.

use csv::StringRecord;
use fieldbook_domain::{Coordinates, CountryCode, PostalCode, ServiceArea};
use fieldbook_persistence::SqlitePersistence;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::info;

use crate::error::{ApiError, translate_persistence_error};

/// A single row result from CSV preview validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRowResult {
    /// The row number (1-based, excluding header).
    pub row_number: usize,
    /// The normalized postal code (if valid).
    pub postal_code: Option<String>,
    /// The country code (if valid).
    pub country_code: Option<String>,
    /// The city as given.
    pub city: Option<String>,
    /// The row status.
    pub status: CsvRowStatus,
    /// Zero or more validation errors.
    pub errors: Vec<String>,
}

/// Status of a CSV row validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvRowStatus {
    /// Row is valid and can be imported.
    Valid,
    /// Row has validation errors and cannot be imported.
    Invalid,
}

/// Result of CSV preview validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPreviewResult {
    /// Per-row validation results.
    pub rows: Vec<CsvRowResult>,
    /// Total number of rows.
    pub total_rows: usize,
    /// Number of valid rows.
    pub valid_count: usize,
    /// Number of invalid rows.
    pub invalid_count: usize,
}

/// Result of a CSV import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvImportResult {
    pub preview: CsvPreviewResult,
    /// Rows written. Zero whenever any row was invalid.
    pub imported: usize,
}

/// Required CSV column headers (case-insensitive, normalized).
const REQUIRED_HEADERS: &[&str] = &[
    "postal_code",
    "country_code",
    "city",
    "region",
    "timezone",
    "dispatch_fee_cents",
    "min_response_time_hours",
    "max_response_time_hours",
    "emergency_available",
    "regular_available",
];

/// Normalizes a CSV header string for case-insensitive, whitespace-tolerant matching.
fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Validates that all required headers are present in the CSV.
fn validate_headers(headers: &StringRecord) -> Result<HashMap<String, usize>, ApiError> {
    let mut header_map: HashMap<String, usize> = HashMap::new();

    for (idx, header) in headers.iter().enumerate() {
        header_map.insert(normalize_header(header), idx);
    }

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .copied()
        .filter(|required| !header_map.contains_key(*required))
        .collect();

    if !missing.is_empty() {
        return Err(ApiError::InvalidFormat {
            field: String::from("csv"),
            message: format!("Missing required headers: {}", missing.join(", ")),
        });
    }

    Ok(header_map)
}

/// Extracts a required field, recording an error when it is missing.
fn parse_required_field(
    get_field: &impl Fn(&str) -> Option<String>,
    field_name: &str,
    errors: &mut Vec<String>,
) -> String {
    get_field(field_name).unwrap_or_else(|| {
        errors.push(format!("{field_name}: required field is missing or empty"));
        String::new()
    })
}

fn parse_number<T: FromStr>(value: &str, field_name: &str, errors: &mut Vec<String>) -> Option<T> {
    value.parse::<T>().map_or_else(
        |_| {
            errors.push(format!("{field_name}: invalid number '{value}'"));
            None
        },
        Some,
    )
}

fn parse_bool(value: &str, field_name: &str, errors: &mut Vec<String>) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => {
            errors.push(format!(
                "{field_name}: invalid boolean '{value}' (use true/false)"
            ));
            None
        }
    }
}

/// Parses a CSV row into a `ServiceArea` if possible.
///
/// Returns `Ok(ServiceArea)` if all fields are valid, or `Err(Vec<String>)`
/// with every problem found.
fn parse_csv_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    business_id: i64,
) -> Result<ServiceArea, Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    let get_field = |name: &str| -> Option<String> {
        header_map
            .get(name)
            .and_then(|&idx| record.get(idx))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let postal_str: String = parse_required_field(&get_field, "postal_code", &mut errors);
    let country_str: String = parse_required_field(&get_field, "country_code", &mut errors);
    let city: String = parse_required_field(&get_field, "city", &mut errors);
    let region: String = parse_required_field(&get_field, "region", &mut errors);
    let timezone: String = parse_required_field(&get_field, "timezone", &mut errors);
    let fee_str: String = parse_required_field(&get_field, "dispatch_fee_cents", &mut errors);
    let min_str: String = parse_required_field(&get_field, "min_response_time_hours", &mut errors);
    let max_str: String = parse_required_field(&get_field, "max_response_time_hours", &mut errors);
    let emergency_str: String =
        parse_required_field(&get_field, "emergency_available", &mut errors);
    let regular_str: String = parse_required_field(&get_field, "regular_available", &mut errors);

    // If any required field is missing, return early
    if !errors.is_empty() {
        return Err(errors);
    }

    let postal_code: Option<PostalCode> = match CountryCode::from_str(&country_str) {
        Ok(country) => match PostalCode::parse(country, &postal_str) {
            Ok(postal_code) => Some(postal_code),
            Err(e) => {
                errors.push(format!("postal_code: {e}"));
                None
            }
        },
        Err(e) => {
            errors.push(format!("country_code: {e}"));
            None
        }
    };

    let dispatch_fee_cents: Option<i64> =
        parse_number(&fee_str, "dispatch_fee_cents", &mut errors);
    let min_response_time_hours: Option<u32> =
        parse_number(&min_str, "min_response_time_hours", &mut errors);
    let max_response_time_hours: Option<u32> =
        parse_number(&max_str, "max_response_time_hours", &mut errors);
    let emergency_available: Option<bool> =
        parse_bool(&emergency_str, "emergency_available", &mut errors);
    let regular_available: Option<bool> =
        parse_bool(&regular_str, "regular_available", &mut errors);

    // Coordinates are optional but come as a pair
    let coordinates: Option<Coordinates> = match (get_field("latitude"), get_field("longitude")) {
        (None, None) => None,
        (Some(lat), Some(lon)) => {
            let latitude: Option<f64> = parse_number(&lat, "latitude", &mut errors);
            let longitude: Option<f64> = parse_number(&lon, "longitude", &mut errors);
            match (latitude, longitude) {
                (Some(latitude), Some(longitude))
                    if (-90.0..=90.0).contains(&latitude)
                        && (-180.0..=180.0).contains(&longitude) =>
                {
                    Some(Coordinates::new(latitude, longitude))
                }
                (Some(_), Some(_)) => {
                    errors.push(String::from("latitude/longitude: out of range"));
                    None
                }
                _ => None,
            }
        }
        _ => {
            errors.push(String::from(
                "latitude/longitude: both or neither must be given",
            ));
            None
        }
    };

    let (
        Some(postal_code),
        Some(dispatch_fee_cents),
        Some(min_response_time_hours),
        Some(max_response_time_hours),
        Some(emergency_available),
        Some(regular_available),
    ) = (
        postal_code,
        dispatch_fee_cents,
        min_response_time_hours,
        max_response_time_hours,
        emergency_available,
        regular_available,
    )
    else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    let area: ServiceArea = ServiceArea {
        service_area_id: None,
        business_id,
        postal_code,
        city,
        region,
        timezone,
        dispatch_fee_cents,
        min_response_time_hours,
        max_response_time_hours,
        emergency_available,
        regular_available,
        coordinates,
    };

    // Timezone, fee sign and response window are domain rules
    area.validate().map_err(|e| vec![format!("validation: {e}")])?;
    Ok(area)
}

/// Validates every row, returning the results and the valid areas.
fn parse_csv(
    csv_content: &str,
    business_id: i64,
) -> Result<(CsvPreviewResult, Vec<ServiceArea>), ApiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(csv_content.as_bytes());

    let headers: StringRecord = reader
        .headers()
        .map_err(|e| ApiError::InvalidFormat {
            field: String::from("csv"),
            message: format!("Failed to read CSV headers: {e}"),
        })?
        .clone();

    let header_map: HashMap<String, usize> = validate_headers(&headers)?;

    let mut results: Vec<CsvRowResult> = Vec::new();
    let mut areas: Vec<ServiceArea> = Vec::new();
    let mut seen: HashSet<(CountryCode, String)> = HashSet::new();

    for (idx, result) in reader.records().enumerate() {
        let row_number: usize = idx + 1;

        let record: StringRecord = match result {
            Ok(rec) => rec,
            Err(e) => {
                results.push(CsvRowResult {
                    row_number,
                    postal_code: None,
                    country_code: None,
                    city: None,
                    status: CsvRowStatus::Invalid,
                    errors: vec![format!("CSV parse error: {e}")],
                });
                continue;
            }
        };

        match parse_csv_row(&record, &header_map, business_id) {
            Ok(area) => {
                let key = (area.country_code(), area.postal_code.value().to_string());
                let mut errors: Vec<String> = Vec::new();
                if !seen.insert(key) {
                    errors.push(format!(
                        "postal_code: duplicate within CSV - '{}' appears multiple times",
                        area.postal_code
                    ));
                }

                let status: CsvRowStatus = if errors.is_empty() {
                    CsvRowStatus::Valid
                } else {
                    CsvRowStatus::Invalid
                };

                results.push(CsvRowResult {
                    row_number,
                    postal_code: Some(area.postal_code.value().to_string()),
                    country_code: Some(area.country_code().as_str().to_string()),
                    city: Some(area.city.clone()),
                    status,
                    errors,
                });
                if status == CsvRowStatus::Valid {
                    areas.push(area);
                }
            }
            Err(parse_errors) => {
                // Parsing failed - extract what we can for display
                let raw = |name: &str| -> Option<String> {
                    header_map
                        .get(name)
                        .and_then(|&idx| record.get(idx))
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                };

                results.push(CsvRowResult {
                    row_number,
                    postal_code: raw("postal_code"),
                    country_code: raw("country_code").map(|c| c.to_uppercase()),
                    city: raw("city"),
                    status: CsvRowStatus::Invalid,
                    errors: parse_errors,
                });
            }
        }
    }

    let total_rows: usize = results.len();
    let valid_count: usize = results
        .iter()
        .filter(|r| r.status == CsvRowStatus::Valid)
        .count();

    Ok((
        CsvPreviewResult {
            rows: results,
            total_rows,
            valid_count,
            invalid_count: total_rows - valid_count,
        },
        areas,
    ))
}

/// Previews and validates service-area CSV data without persisting.
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` if the headers are missing or
/// unreadable. Row-level problems are reported in the result.
pub fn preview_service_areas(
    csv_content: &str,
    business_id: i64,
) -> Result<CsvPreviewResult, ApiError> {
    parse_csv(csv_content, business_id).map(|(preview, _)| preview)
}

/// Imports service-area CSV data when every row is valid.
///
/// Existing areas with the same postal code are replaced.
///
/// # Errors
///
/// Returns `ApiError::InvalidFormat` for unreadable headers, or
/// `ApiError::ServiceUnavailable` if the write fails. Invalid rows are not
/// an error: the result reports them and nothing is written.
pub fn import_service_areas(
    persistence: &mut SqlitePersistence,
    csv_content: &str,
    business_id: i64,
) -> Result<CsvImportResult, ApiError> {
    let (preview, areas) = parse_csv(csv_content, business_id)?;

    if preview.invalid_count > 0 || areas.is_empty() {
        info!(
            business_id,
            invalid = preview.invalid_count,
            "Service area import skipped"
        );
        return Ok(CsvImportResult {
            preview,
            imported: 0,
        });
    }

    let imported: usize = persistence
        .upsert_service_areas(&areas)
        .map_err(translate_persistence_error)?;

    info!(business_id, imported, "Imported service areas");
    Ok(CsvImportResult { preview, imported })
}
