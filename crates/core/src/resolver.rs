// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Service-area resolution.
//!
//! Resolution is a pure function over a business's configured areas. The
//! caller normalizes the postal code first, so malformed input never reaches
//! storage.

use fieldbook_domain::{Coordinates, PostalCode, ServiceArea, postal_proximity};
use std::cmp::Ordering;

/// Default number of nearby areas suggested for an uncovered postal code.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

/// Resolver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on suggestions returned for an uncovered postal code.
    pub max_suggestions: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

/// How far a suggested area is from the query.
///
/// Geographic distances always order before the postal fallback metric.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Distance {
    /// Great-circle distance between centroids.
    Kilometres(f64),
    /// Postal proximity, used when either side lacks coordinates.
    PostalProximity(u64),
}

impl Distance {
    /// Returns the geographic distance, if one was computed.
    #[must_use]
    pub const fn kilometres(&self) -> Option<f64> {
        match self {
            Self::Kilometres(km) => Some(*km),
            Self::PostalProximity(_) => None,
        }
    }
}

/// A covered area offered instead of an uncovered postal code.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaSuggestion {
    pub area: ServiceArea,
    pub distance: Distance,
}

/// Outcome of a coverage lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The postal code is configured for the business.
    Supported(ServiceArea),
    /// The postal code is not covered; nearest covered areas are suggested.
    Unsupported {
        query: PostalCode,
        suggestions: Vec<AreaSuggestion>,
    },
}

impl Resolution {
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }
}

/// Resolves a normalized postal code against a business's service areas.
///
/// `areas` may span countries; only areas in the query's country are
/// considered. `origin` is the query's centroid when known.
#[must_use]
pub fn resolve_service_area(
    query: &PostalCode,
    origin: Option<Coordinates>,
    areas: &[ServiceArea],
    config: &ResolverConfig,
) -> Resolution {
    let same_country = areas
        .iter()
        .filter(|area| area.country_code() == query.country());

    if let Some(area) = same_country
        .clone()
        .find(|area| area.postal_code == *query)
    {
        return Resolution::Supported(area.clone());
    }

    let mut suggestions: Vec<AreaSuggestion> = same_country
        .map(|area| AreaSuggestion {
            area: area.clone(),
            distance: distance_between(query, origin, area),
        })
        .collect();

    suggestions.sort_by(compare_suggestions);
    suggestions.truncate(config.max_suggestions);

    Resolution::Unsupported {
        query: query.clone(),
        suggestions,
    }
}

fn distance_between(query: &PostalCode, origin: Option<Coordinates>, area: &ServiceArea) -> Distance {
    match (origin, area.coordinates) {
        (Some(from), Some(to)) => Distance::Kilometres(from.distance_km(&to)),
        _ => Distance::PostalProximity(postal_proximity(query, &area.postal_code)),
    }
}

fn compare_suggestions(a: &AreaSuggestion, b: &AreaSuggestion) -> Ordering {
    a.distance
        .partial_cmp(&b.distance)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.area
                .max_response_time_hours
                .cmp(&b.area.max_response_time_hours)
        })
        .then_with(|| a.area.postal_code.cmp(&b.area.postal_code))
}
