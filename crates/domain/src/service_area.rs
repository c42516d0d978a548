// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::postal::{CountryCode, PostalCode};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to another point, in kilometres (haversine).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        let lat1: f64 = self.latitude.to_radians();
        let lat2: f64 = other.latitude.to_radians();
        let d_lat: f64 = (other.latitude - self.latitude).to_radians();
        let d_lon: f64 = (other.longitude - self.longitude).to_radians();

        let a: f64 = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A postal-code-keyed record describing whether and how a business serves a
/// location.
///
/// Service areas are reference data owned by the catalog. The engine only
/// reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    /// Database identifier. `None` until persisted.
    pub service_area_id: Option<i64>,
    pub business_id: i64,
    pub postal_code: PostalCode,
    pub city: String,
    pub region: String,
    /// IANA timezone name (e.g. `America/Chicago`).
    pub timezone: String,
    pub dispatch_fee_cents: i64,
    pub min_response_time_hours: u32,
    pub max_response_time_hours: u32,
    pub emergency_available: bool,
    pub regular_available: bool,
    /// Centroid used for distance ranking, when known.
    pub coordinates: Option<Coordinates>,
}

impl ServiceArea {
    /// Returns the country of this area's postal code.
    #[must_use]
    pub const fn country_code(&self) -> CountryCode {
        self.postal_code.country()
    }

    /// Parses the area's timezone.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTimezone` if the stored name is not a
    /// known IANA timezone.
    pub fn tz(&self) -> Result<Tz, DomainError> {
        parse_timezone(&self.timezone)
    }

    /// Validates the reference-data invariants of this record.
    ///
    /// # Errors
    ///
    /// Returns an error if the timezone is unknown, the dispatch fee is
    /// negative or the response window is inverted.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.tz()?;
        if self.dispatch_fee_cents < 0 {
            return Err(DomainError::InvalidCustomerField {
                field: "dispatch_fee_cents",
                reason: String::from("must not be negative"),
            });
        }
        if self.min_response_time_hours > self.max_response_time_hours {
            return Err(DomainError::InvalidResponseWindow {
                min: self.min_response_time_hours,
                max: self.max_response_time_hours,
            });
        }
        Ok(())
    }
}

/// Parses an IANA timezone name.
///
/// # Errors
///
/// Returns `DomainError::InvalidTimezone` for unknown names.
pub fn parse_timezone(name: &str) -> Result<Tz, DomainError> {
    name.parse::<Tz>()
        .map_err(|_| DomainError::InvalidTimezone(name.to_string()))
}
