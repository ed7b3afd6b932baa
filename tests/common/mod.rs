// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use visit_tracker::models::{AuthorizationStatus, Coordinate, Fix, PlaceDescription};
use visit_tracker::services::{LookupError, PlaceLookupService, PositionFeed, GEOCODE_INTERVAL};
use visit_tracker::TrackingSession;

/// Name returned once the script runs out.
#[allow(dead_code)]
pub const DEFAULT_PLACE_NAME: &str = "Somewhere";

struct ScriptedStep {
    delay: Duration,
    outcome: Result<Vec<PlaceDescription>, LookupError>,
}

/// Place lookup that replays a queue of canned responses.
#[derive(Default)]
pub struct ScriptedLookup {
    script: Mutex<VecDeque<ScriptedStep>>,
    calls: AtomicUsize,
    coordinates: Mutex<Vec<Coordinate>>,
}

#[allow(dead_code)]
impl ScriptedLookup {
    pub fn push_ok(&self, name: &str, delay: Duration) {
        self.push(delay, Ok(vec![place(name)]));
    }

    pub fn push_err(&self, error: LookupError, delay: Duration) {
        self.push(delay, Err(error));
    }

    fn push(&self, delay: Duration, outcome: Result<Vec<PlaceDescription>, LookupError>) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedStep { delay, outcome });
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.coordinates.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaceLookupService for ScriptedLookup {
    async fn lookup(&self, coordinate: Coordinate) -> Result<Vec<PlaceDescription>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.coordinates.lock().unwrap().push(coordinate);

        let step = self.script.lock().unwrap().pop_front();
        let step = step.unwrap_or(ScriptedStep {
            delay: Duration::ZERO,
            outcome: Ok(vec![place(DEFAULT_PLACE_NAME)]),
        });

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.outcome
    }
}

#[allow(dead_code)]
pub fn place(name: &str) -> PlaceDescription {
    PlaceDescription {
        name: Some(name.to_string()),
        locality: Some("Palo Alto".to_string()),
        administrative_area: Some("California".to_string()),
        country: Some("United States".to_string()),
    }
}

#[allow(dead_code)]
pub fn fix_at(lat: f64, lon: f64) -> Fix {
    Fix::new(Coordinate::new(lat, lon), Utc::now())
}

/// Let the session worker drain everything that is ready.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Advance past the next geocode tick.
#[allow(dead_code)]
pub async fn advance_tick() {
    tokio::time::sleep(GEOCODE_INTERVAL).await;
    settle().await;
}

#[allow(dead_code)]
pub struct Harness {
    pub feed: Arc<PositionFeed>,
    pub lookup: Arc<ScriptedLookup>,
    pub session: TrackingSession,
}

#[allow(dead_code)]
impl Harness {
    /// Publish a fix and let the session process it.
    pub async fn fix(&self, lat: f64, lon: f64) {
        assert!(self.feed.publish_fix(fix_at(lat, lon)), "fix was dropped");
        settle().await;
    }

    pub fn visited_titles(&self) -> Vec<String> {
        self.session
            .signals()
            .visited()
            .borrow()
            .iter()
            .map(|p| p.title.clone())
            .collect()
    }

    pub fn distance(&self) -> f64 {
        *self.session.signals().distance_meters().borrow()
    }

    pub fn alert_title(&self) -> Option<String> {
        self.session
            .signals()
            .alert()
            .borrow()
            .as_ref()
            .map(|a| a.title.clone())
    }
}

/// Session over a channel-backed feed and a scripted lookup.
#[allow(dead_code)]
pub fn harness(status: AuthorizationStatus) -> Harness {
    let feed = Arc::new(PositionFeed::new(status));
    let lookup = Arc::new(ScriptedLookup::default());
    let session = TrackingSession::new(feed.clone(), lookup.clone());
    Harness {
        feed,
        lookup,
        session,
    }
}
