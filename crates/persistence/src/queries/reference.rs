// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Reference data reads: businesses, service areas, services, technicians.

use diesel::prelude::*;
use diesel::SqliteConnection;
use fieldbook_domain::{
    BookableService, Business, Coordinates, CountryCode, Interval, PostalCode, ServiceArea,
    Technician,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::data_models::{
    BusinessRow, ServiceAreaRow, ServiceRow, TechnicianRow, format_timestamp, stored_interval,
};
use crate::diesel_schema::{
    businesses, postal_centroids, service_areas, services, technician_commitments, technicians,
};
use crate::error::PersistenceError;

/// Retrieves a business by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_business(
    conn: &mut SqliteConnection,
    business_id: i64,
) -> Result<Option<Business>, PersistenceError> {
    let row: Option<BusinessRow> = businesses::table
        .filter(businesses::business_id.eq(business_id))
        .select(BusinessRow::as_select())
        .first(conn)
        .optional()?;
    Ok(row.map(Business::from))
}

/// Lists a business's service areas, optionally limited to one country.
///
/// Ordered by country and postal code.
///
/// # Errors
///
/// Returns an error if the query fails or a row is malformed.
pub fn list_service_areas(
    conn: &mut SqliteConnection,
    business_id: i64,
    country: Option<CountryCode>,
) -> Result<Vec<ServiceArea>, PersistenceError> {
    let mut query = service_areas::table
        .filter(service_areas::business_id.eq(business_id))
        .into_boxed();
    if let Some(country) = country {
        query = query.filter(service_areas::country_code.eq(country.as_str()));
    }

    let rows: Vec<ServiceAreaRow> = query
        .order((service_areas::country_code.asc(), service_areas::postal_code.asc()))
        .select(ServiceAreaRow::as_select())
        .load(conn)?;

    debug!(business_id, count = rows.len(), "Loaded service areas");
    rows.into_iter().map(ServiceArea::try_from).collect()
}

/// Finds the service area configured for an exact normalized postal code.
///
/// # Errors
///
/// Returns an error if the query fails or the row is malformed.
pub fn find_service_area(
    conn: &mut SqliteConnection,
    business_id: i64,
    postal_code: &PostalCode,
) -> Result<Option<ServiceArea>, PersistenceError> {
    let row: Option<ServiceAreaRow> = service_areas::table
        .filter(service_areas::business_id.eq(business_id))
        .filter(service_areas::country_code.eq(postal_code.country().as_str()))
        .filter(service_areas::postal_code.eq(postal_code.value()))
        .select(ServiceAreaRow::as_select())
        .first(conn)
        .optional()?;
    row.map(ServiceArea::try_from).transpose()
}

/// Looks up the centroid of a postal code, if known.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn postal_centroid(
    conn: &mut SqliteConnection,
    postal_code: &PostalCode,
) -> Result<Option<Coordinates>, PersistenceError> {
    let row: Option<(f64, f64)> = postal_centroids::table
        .filter(postal_centroids::country_code.eq(postal_code.country().as_str()))
        .filter(postal_centroids::postal_code.eq(postal_code.value()))
        .select((postal_centroids::latitude, postal_centroids::longitude))
        .first(conn)
        .optional()?;
    Ok(row.map(|(lat, lon)| Coordinates::new(lat, lon)))
}

/// Retrieves a service owned by a business, active or not.
///
/// # Errors
///
/// Returns an error if the query fails or the row is malformed.
pub fn get_service(
    conn: &mut SqliteConnection,
    business_id: i64,
    service_id: i64,
) -> Result<Option<BookableService>, PersistenceError> {
    let row: Option<ServiceRow> = services::table
        .filter(services::business_id.eq(business_id))
        .filter(services::service_id.eq(service_id))
        .select(ServiceRow::as_select())
        .first(conn)
        .optional()?;
    row.map(BookableService::try_from).transpose()
}

/// Lists a business's technicians with the commitments that overlap `window`.
///
/// Ordered by technician ID.
///
/// # Errors
///
/// Returns an error if a query fails or a row is malformed.
pub fn list_technicians(
    conn: &mut SqliteConnection,
    business_id: i64,
    window: &Interval,
) -> Result<Vec<Technician>, PersistenceError> {
    let rows: Vec<TechnicianRow> = technicians::table
        .filter(technicians::business_id.eq(business_id))
        .order(technicians::technician_id.asc())
        .select(TechnicianRow::as_select())
        .load(conn)?;

    let ids: Vec<i64> = rows.iter().map(|r| r.technician_id).collect();
    let window_start: String = format_timestamp(window.start());
    let window_end: String = format_timestamp(window.end());

    let commitment_rows: Vec<(i64, String, String)> = technician_commitments::table
        .filter(technician_commitments::technician_id.eq_any(&ids))
        .filter(technician_commitments::start_at.lt(&window_end))
        .filter(technician_commitments::end_at.gt(&window_start))
        .order((
            technician_commitments::technician_id.asc(),
            technician_commitments::start_at.asc(),
        ))
        .select((
            technician_commitments::technician_id,
            technician_commitments::start_at,
            technician_commitments::end_at,
        ))
        .load(conn)?;

    let mut commitments: BTreeMap<i64, Vec<Interval>> = BTreeMap::new();
    for (technician_id, start_at, end_at) in commitment_rows {
        commitments
            .entry(technician_id)
            .or_default()
            .push(stored_interval(&start_at, &end_at)?);
    }

    debug!(
        business_id,
        technicians = rows.len(),
        commitments = commitments.values().map(Vec::len).sum::<usize>(),
        "Loaded technician roster"
    );

    rows.into_iter()
        .map(|row| {
            let busy: Vec<Interval> = commitments.remove(&row.technician_id).unwrap_or_default();
            row.into_technician(busy)
        })
        .collect()
}
