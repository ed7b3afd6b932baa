// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reverse geocoding against a Nominatim-compatible HTTP API.
//!
//! Handles:
//! - `GET {base}/reverse?format=jsonv2&lat=..&lon=..`
//! - "Unable to geocode" bodies (returned with HTTP 200) as an empty result
//! - Rate limit detection (429)

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Coordinate, PlaceDescription};
use crate::services::lookup::{LookupError, PlaceLookupService};

/// Nominatim reverse-geocoding client.
#[derive(Debug, Clone)]
pub struct NominatimLookup {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimLookup {
    /// Create a client for the given base URL (e.g. `https://nominatim.openstreetmap.org`).
    ///
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| LookupError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check response status and return the body if successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<String, LookupError> {
        let status = response.status();

        if status.as_u16() == 429 {
            tracing::warn!("Geocoder rate limit hit (429)");
            return Err(LookupError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(LookupError::Request(format!("HTTP {}: {}", status, body)));
        }

        Ok(body)
    }
}

#[async_trait]
impl PlaceLookupService for NominatimLookup {
    async fn lookup(&self, coordinate: Coordinate) -> Result<Vec<PlaceDescription>, LookupError> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;

        let body = self.check_response(response).await?;
        parse_reverse(&body)
    }
}

/// Reverse geocoding response (subset of fields we use).
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    name: Option<String>,
    address: Option<ReverseAddress>,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReverseAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    suburb: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

/// Parse a `format=jsonv2` reverse response into candidates.
fn parse_reverse(body: &str) -> Result<Vec<PlaceDescription>, LookupError> {
    let parsed: ReverseResponse =
        serde_json::from_str(body).map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

    if let Some(error) = parsed.error {
        tracing::debug!(%error, "Geocoder has no result for coordinate");
        return Ok(Vec::new());
    }

    let address = parsed.address.unwrap_or_default();
    let locality = address
        .city
        .or(address.town)
        .or(address.village)
        .or(address.hamlet)
        .or(address.suburb);

    Ok(vec![PlaceDescription {
        name: parsed.name.filter(|n| !n.trim().is_empty()),
        locality,
        administrative_area: address.state,
        country: address.country,
    }])
}
