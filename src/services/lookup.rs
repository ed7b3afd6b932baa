// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Place lookup (reverse geocoding) seam.

use std::time::Duration;

use async_trait::async_trait;

use crate::models::{Coordinate, PlaceDescription};

/// Resolves a coordinate into human-readable place candidates.
///
/// Implementations may run their I/O anywhere; the session awaits the result
/// on its own task and never lets a failure escape as a panic.
#[async_trait]
pub trait PlaceLookupService: Send + Sync {
    /// Best-effort candidates for a coordinate, best first. An empty list is a
    /// valid answer ("nothing known here").
    async fn lookup(&self, coordinate: Coordinate) -> Result<Vec<PlaceDescription>, LookupError>;
}

/// Errors from place lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Place lookup request failed: {0}")]
    Request(String),

    #[error("Place lookup rate limited")]
    RateLimited,

    #[error("Place lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid place lookup response: {0}")]
    InvalidResponse(String),
}

/// Lookup used when no geocoder is configured; every place becomes a dropped pin.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLookup;

#[async_trait]
impl PlaceLookupService for OfflineLookup {
    async fn lookup(&self, coordinate: Coordinate) -> Result<Vec<PlaceDescription>, LookupError> {
        tracing::debug!(
            lat = coordinate.latitude,
            lon = coordinate.longitude,
            "Offline lookup, no place name"
        );
        Ok(Vec::new())
    }
}
