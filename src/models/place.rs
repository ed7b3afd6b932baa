// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visited place records and the reverse-geocoding candidates they are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

use crate::models::{Coordinate, Fix};

/// Title used when the lookup gave neither a name nor a locality.
pub const DROPPED_PIN_TITLE: &str = "Dropped Pin";

/// One candidate description returned by a place lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDescription {
    /// Primary name (point of interest, street address, ...)
    pub name: Option<String>,
    /// City, town or village
    pub locality: Option<String>,
    /// State or region
    pub administrative_area: Option<String>,
    pub country: Option<String>,
}

/// A geocoded point the user passed through.
///
/// Equality ignores `horizontal_accuracy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VisitedPlace {
    pub id: Uuid,
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    /// Locality, region and country joined by ", "
    pub subtitle: String,
    /// Horizontal accuracy of the fix in meters, if known
    pub horizontal_accuracy: Option<f64>,
}

impl PartialEq for VisitedPlace {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.coordinate == other.coordinate
            && self.timestamp == other.timestamp
            && self.title == other.title
            && self.subtitle == other.subtitle
    }
}

impl VisitedPlace {
    /// Build a place from the best lookup candidate (if any) for a fix.
    pub fn from_lookup(candidate: Option<&PlaceDescription>, fix: &Fix) -> Self {
        let title = candidate
            .and_then(|c| non_blank(&c.name).or_else(|| non_blank(&c.locality)))
            .unwrap_or(DROPPED_PIN_TITLE)
            .to_string();

        let subtitle = candidate
            .map(|c| {
                [&c.locality, &c.administrative_area, &c.country]
                    .into_iter()
                    .filter_map(non_blank)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            coordinate: fix.coordinate,
            timestamp: fix.timestamp,
            title,
            subtitle,
            horizontal_accuracy: fix.horizontal_accuracy,
        }
    }
}

fn non_blank(part: &Option<String>) -> Option<&str> {
    part.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
