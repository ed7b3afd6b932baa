// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Replay of a recorded track as a live position source.
//!
//! Tracks are loaded from GeoJSON (LineString, MultiPoint or Point features)
//! or from an encoded polyline (precision 5). Playback emits one fix per
//! interval while updates are started and resumes where it stopped.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use geojson::GeoJson;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::models::{AuthorizationStatus, Coordinate, Fix};
use crate::services::source::{PositionError, PositionFeed, PositionSource};

/// One point of a recorded track.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayPoint {
    pub coordinate: Coordinate,
    /// Recorded time; playback time is used when absent
    pub timestamp: Option<DateTime<Utc>>,
}

/// A [`PositionSource`] that plays back a recorded track.
///
/// Starts out `Undetermined`; requesting authorization grants it.
#[derive(Debug)]
pub struct ReplaySource {
    feed: Arc<PositionFeed>,
    track: Arc<Vec<ReplayPoint>>,
    interval: Duration,
    cursor: Arc<AtomicUsize>,
    playback: Mutex<Option<CancellationToken>>,
    finished: Arc<watch::Sender<bool>>,
}

impl ReplaySource {
    /// Load a track from a file. `.polyline` and `.txt` files are decoded as
    /// encoded polylines, anything else as GeoJSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P, interval: Duration) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| ReplayError::IoError(e.to_string()))?;

        let is_polyline = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("polyline") || ext.eq_ignore_ascii_case("txt"));

        if is_polyline {
            Self::from_polyline(&data, interval)
        } else {
            Self::from_geojson_str(&data, interval)
        }
    }

    /// Decode an encoded polyline (Google format, precision 5).
    pub fn from_polyline(encoded: &str, interval: Duration) -> Result<Self, ReplayError> {
        let line = polyline::decode_polyline(encoded.trim(), 5)
            .map_err(|e| ReplayError::PolylineError(e.to_string()))?;

        let points = line
            .0
            .into_iter()
            .map(|c| ReplayPoint {
                coordinate: Coordinate::from(c),
                timestamp: None,
            })
            .collect();

        Self::from_points(points, interval)
    }

    /// Parse a GeoJSON document.
    pub fn from_geojson_str(json_data: &str, interval: Duration) -> Result<Self, ReplayError> {
        let geojson: GeoJson = json_data
            .parse()
            .map_err(|e: geojson::Error| ReplayError::ParseError(e.to_string()))?;

        let mut points = Vec::new();
        match geojson {
            GeoJson::FeatureCollection(collection) => {
                for feature in collection.features {
                    points.extend(Self::feature_points(feature)?);
                }
            }
            GeoJson::Feature(feature) => points.extend(Self::feature_points(feature)?),
            GeoJson::Geometry(geometry) => {
                points.extend(Self::convert_geometry(geometry.value, Vec::new())?)
            }
        }

        Self::from_points(points, interval)
    }

    pub fn from_points(points: Vec<ReplayPoint>, interval: Duration) -> Result<Self, ReplayError> {
        if points.is_empty() {
            return Err(ReplayError::Empty);
        }
        if let Some(bad) = points.iter().find(|p| !p.coordinate.is_valid()) {
            return Err(ReplayError::InvalidCoordinate(bad.coordinate));
        }

        tracing::info!(count = points.len(), "Loaded replay track");
        let (finished, _) = watch::channel(false);

        Ok(Self {
            feed: Arc::new(PositionFeed::new(AuthorizationStatus::Undetermined)),
            track: Arc::new(points),
            interval,
            cursor: Arc::new(AtomicUsize::new(0)),
            playback: Mutex::new(None),
            finished: Arc::new(finished),
        })
    }

    fn feature_points(feature: geojson::Feature) -> Result<Vec<ReplayPoint>, ReplayError> {
        // Point features may carry a single `timestamp`; LineStrings converted
        // from GPX usually carry a parallel `coordTimes` array.
        let times: Vec<Option<DateTime<Utc>>> = if let Some(ts) = feature.property("timestamp") {
            vec![ts.as_str().and_then(parse_timestamp)]
        } else if let Some(times) = feature.property("coordTimes").and_then(|v| v.as_array()) {
            times
                .iter()
                .map(|t| t.as_str().and_then(parse_timestamp))
                .collect()
        } else {
            Vec::new()
        };

        match feature.geometry {
            Some(geometry) => Self::convert_geometry(geometry.value, times),
            None => Ok(Vec::new()),
        }
    }

    /// Convert GeoJSON geometry to track points.
    fn convert_geometry(
        value: geojson::Value,
        times: Vec<Option<DateTime<Utc>>>,
    ) -> Result<Vec<ReplayPoint>, ReplayError> {
        let parse_err = |e: geojson::Error| ReplayError::ParseError(e.to_string());

        let coordinates: Vec<Coordinate> = match value {
            v @ geojson::Value::Point(_) => {
                let point: geo::Point<f64> = v.try_into().map_err(parse_err)?;
                vec![Coordinate::from(point.0)]
            }
            v @ geojson::Value::MultiPoint(_) => {
                let multi: geo::MultiPoint<f64> = v.try_into().map_err(parse_err)?;
                multi.0.into_iter().map(|p| Coordinate::from(p.0)).collect()
            }
            v @ geojson::Value::LineString(_) => {
                let line: geo::LineString<f64> = v.try_into().map_err(parse_err)?;
                line.0.into_iter().map(Coordinate::from).collect()
            }
            _ => return Err(ReplayError::UnsupportedGeometry),
        };

        Ok(coordinates
            .into_iter()
            .enumerate()
            .map(|(i, coordinate)| ReplayPoint {
                coordinate,
                timestamp: times.get(i).copied().flatten(),
            })
            .collect())
    }

    /// Number of points in the track.
    pub fn len(&self) -> usize {
        self.track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }

    /// Points not yet played back.
    pub fn remaining(&self) -> usize {
        self.track.len() - self.cursor.load(Ordering::SeqCst).min(self.track.len())
    }

    /// The underlying feed, e.g. to inject errors.
    pub fn feed(&self) -> &PositionFeed {
        &self.feed
    }

    /// Resolves once every point has been played back.
    pub async fn finished(&self) {
        let mut rx = self.finished.subscribe();
        // The sender lives as long as `self`, so this only ends on completion.
        let _ = rx.wait_for(|done| *done).await;
    }

    fn spawn_playback(&self) {
        let mut playback = self.playback.lock().unwrap_or_else(PoisonError::into_inner);
        if playback.is_some() {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "Cannot start replay outside a Tokio runtime");
                return;
            }
        };

        let token = CancellationToken::new();
        *playback = Some(token.clone());

        let feed = self.feed.clone();
        let track = self.track.clone();
        let cursor = self.cursor.clone();
        let finished = self.finished.clone();
        let interval = self.interval;

        handle.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                let index = cursor.load(Ordering::SeqCst);
                let Some(point) = track.get(index) else {
                    finished.send_replace(true);
                    break;
                };

                let fix = Fix::new(point.coordinate, point.timestamp.unwrap_or_else(Utc::now));
                feed.publish_fix(fix);
                cursor.store(index + 1, Ordering::SeqCst);

                if index + 1 == track.len() {
                    tracing::info!(points = track.len(), "Replay finished");
                    finished.send_replace(true);
                    break;
                }
            }
        });
    }

    fn stop_playback(&self) {
        let mut playback = self.playback.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = playback.take() {
            token.cancel();
        }
    }
}

impl PositionSource for ReplaySource {
    fn authorization_status(&self) -> watch::Receiver<AuthorizationStatus> {
        self.feed.authorization_status()
    }

    fn fixes(&self) -> broadcast::Receiver<Fix> {
        self.feed.fixes()
    }

    fn errors(&self) -> broadcast::Receiver<PositionError> {
        self.feed.errors()
    }

    fn request_authorization(&self) {
        self.feed.request_authorization();
        if self.feed.current_authorization() == AuthorizationStatus::Undetermined {
            tracing::info!("Replay source granting authorization");
            self.feed.set_authorization(AuthorizationStatus::Authorized);
        }
    }

    fn start_updates(&self) {
        self.feed.start_updates();
        self.spawn_playback();
    }

    fn stop_updates(&self) {
        self.feed.stop_updates();
        self.stop_playback();
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop_playback();
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Errors from loading a replay track.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse GeoJSON: {0}")]
    ParseError(String),

    #[error("Unsupported geometry type (expected Point, MultiPoint or LineString)")]
    UnsupportedGeometry,

    #[error("Failed to decode polyline: {0}")]
    PolylineError(String),

    #[error("Coordinate out of range: {0:?}")]
    InvalidCoordinate(Coordinate),

    #[error("Track has no points")]
    Empty,
}
