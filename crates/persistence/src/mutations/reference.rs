// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Reference data writes.
//!
//! Reference data is owned upstream; these mutations exist for seeding and
//! import tooling only. The booking path never calls them.

use diesel::prelude::*;
use diesel::SqliteConnection;
use fieldbook_domain::{
    BookableService, Coordinates, Interval, PostalCode, ServiceArea, Technician,
};
use tracing::{debug, info};

use crate::backend::PersistenceBackend;
use crate::data_models::{format_time, format_timestamp, to_i32, working_hours_json};
use crate::diesel_schema::{
    businesses, postal_centroids, service_areas, services, technician_commitments, technicians,
};
use crate::error::PersistenceError;

/// Inserts a business and returns its ID.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_business(
    conn: &mut SqliteConnection,
    name: &str,
    timezone: &str,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(businesses::table)
        .values((
            businesses::name.eq(name),
            businesses::timezone.eq(timezone),
            businesses::is_active.eq(1),
        ))
        .execute(conn)?;

    let business_id: i64 = conn.get_last_insert_rowid()?;
    info!(business_id, name, "Created business");
    Ok(business_id)
}

/// Inserts or replaces a business's service areas.
///
/// An existing area with the same `(business, country, postal code)` is
/// replaced. Returns the number of rows written.
///
/// # Errors
///
/// Returns an error if any write fails. Callers run this inside a
/// transaction so a partial import is never visible.
pub fn upsert_service_areas(
    conn: &mut SqliteConnection,
    areas: &[ServiceArea],
) -> Result<usize, PersistenceError> {
    let mut written: usize = 0;
    for area in areas {
        let (latitude, longitude): (Option<f64>, Option<f64>) = area
            .coordinates
            .map_or((None, None), |c| (Some(c.latitude), Some(c.longitude)));

        written += diesel::replace_into(service_areas::table)
            .values((
                service_areas::business_id.eq(area.business_id),
                service_areas::country_code.eq(area.country_code().as_str()),
                service_areas::postal_code.eq(area.postal_code.value()),
                service_areas::city.eq(&area.city),
                service_areas::region.eq(&area.region),
                service_areas::timezone.eq(&area.timezone),
                service_areas::dispatch_fee_cents.eq(area.dispatch_fee_cents),
                service_areas::min_response_time_hours.eq(to_i32(
                    area.min_response_time_hours,
                    "min_response_time_hours",
                )?),
                service_areas::max_response_time_hours.eq(to_i32(
                    area.max_response_time_hours,
                    "max_response_time_hours",
                )?),
                service_areas::emergency_available.eq(i32::from(area.emergency_available)),
                service_areas::regular_available.eq(i32::from(area.regular_available)),
                service_areas::latitude.eq(latitude),
                service_areas::longitude.eq(longitude),
            ))
            .execute(conn)?;
    }

    debug!(written, "Upserted service areas");
    Ok(written)
}

/// Records the centroid of a postal code.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn upsert_postal_centroid(
    conn: &mut SqliteConnection,
    postal_code: &PostalCode,
    centroid: Coordinates,
) -> Result<(), PersistenceError> {
    diesel::replace_into(postal_centroids::table)
        .values((
            postal_centroids::country_code.eq(postal_code.country().as_str()),
            postal_centroids::postal_code.eq(postal_code.value()),
            postal_centroids::latitude.eq(centroid.latitude),
            postal_centroids::longitude.eq(centroid.longitude),
        ))
        .execute(conn)?;
    Ok(())
}

/// Inserts a bookable service and returns its ID.
///
/// # Errors
///
/// Returns an error if serialization or the insert fails.
pub fn insert_service(
    conn: &mut SqliteConnection,
    service: &BookableService,
) -> Result<i64, PersistenceError> {
    let required_skills_json: String = serde_json::to_string(&service.required_skills)?;
    let available_days_json: String = serde_json::to_string(&service.available_days)?;

    diesel::insert_into(services::table)
        .values((
            services::business_id.eq(service.business_id),
            services::name.eq(&service.name),
            services::required_skills_json.eq(required_skills_json),
            services::estimated_duration_minutes.eq(to_i32(
                service.estimated_duration_minutes,
                "estimated_duration_minutes",
            )?),
            services::min_duration_minutes
                .eq(to_i32(service.min_duration_minutes, "min_duration_minutes")?),
            services::max_duration_minutes
                .eq(to_i32(service.max_duration_minutes, "max_duration_minutes")?),
            services::price_type.eq(service.price_type.as_str()),
            services::base_price_cents.eq(service.base_price_cents),
            services::min_technicians.eq(to_i32(service.min_technicians, "min_technicians")?),
            services::max_technicians.eq(to_i32(service.max_technicians, "max_technicians")?),
            services::min_lead_time_hours
                .eq(to_i32(service.min_lead_time_hours, "min_lead_time_hours")?),
            services::max_advance_days.eq(to_i32(service.max_advance_days, "max_advance_days")?),
            services::available_days_json.eq(available_days_json),
            services::available_start.eq(format_time(service.available_times.start())),
            services::available_end.eq(format_time(service.available_times.end())),
            services::is_active.eq(i32::from(service.is_active)),
        ))
        .execute(conn)?;

    let service_id: i64 = conn.get_last_insert_rowid()?;
    info!(service_id, name = %service.name, "Created service");
    Ok(service_id)
}

/// Inserts a technician with their commitments and returns the ID.
///
/// # Errors
///
/// Returns an error if serialization or an insert fails.
pub fn insert_technician(
    conn: &mut SqliteConnection,
    technician: &Technician,
) -> Result<i64, PersistenceError> {
    let skills_json: String = serde_json::to_string(&technician.skills)?;
    let hours_json: String = working_hours_json(&technician.working_hours)?;

    diesel::insert_into(technicians::table)
        .values((
            technicians::business_id.eq(technician.business_id),
            technicians::name.eq(&technician.name),
            technicians::skills_json.eq(skills_json),
            technicians::working_hours_json.eq(hours_json),
            technicians::is_active.eq(i32::from(technician.is_active)),
        ))
        .execute(conn)?;

    let technician_id: i64 = conn.get_last_insert_rowid()?;
    for commitment in &technician.commitments {
        add_technician_commitment(conn, technician_id, commitment)?;
    }

    info!(technician_id, name = %technician.name, "Created technician");
    Ok(technician_id)
}

/// Records an external calendar commitment for a technician.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn add_technician_commitment(
    conn: &mut SqliteConnection,
    technician_id: i64,
    interval: &Interval,
) -> Result<i64, PersistenceError> {
    diesel::insert_into(technician_commitments::table)
        .values((
            technician_commitments::technician_id.eq(technician_id),
            technician_commitments::start_at.eq(format_timestamp(interval.start())),
            technician_commitments::end_at.eq(format_timestamp(interval.end())),
        ))
        .execute(conn)?;
    conn.get_last_insert_rowid()
}
