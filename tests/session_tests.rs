// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end behavior of a tracking session over a scripted feed and lookup.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{advance_tick, harness, settle, Harness, ScriptedLookup, DEFAULT_PLACE_NAME};
use visit_tracker::models::{AuthorizationStatus, Coordinate, PermissionGate, DROPPED_PIN_TITLE};
use visit_tracker::services::{LookupError, PositionError, PositionFeed};
use visit_tracker::{TrackerError, TrackingSession};

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    h.session.start();
    settle().await;

    assert!(h.session.is_tracking());
    assert_eq!(h.feed.start_calls(), 1);
    assert!(h.feed.is_updating());
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_stopped_is_noop() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.stop().await;

    assert!(!h.session.is_tracking());
    assert_eq!(h.feed.stop_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fixes_before_start_are_dropped() {
    let h = harness(AuthorizationStatus::Authorized);
    assert!(!h.feed.publish_fix(common::fix_at(0.0, 0.0)));
    settle().await;
    assert_eq!(h.lookup.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_first_fix_is_geocoded_immediately() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;

    h.fix(37.4, -122.1).await;

    assert_eq!(h.lookup.calls(), 1);
    assert_eq!(h.visited_titles(), vec![DEFAULT_PLACE_NAME.to_string()]);
    assert_eq!(h.distance(), 0.0);

    let visited = h.session.signals().visited().borrow().clone();
    assert_eq!(visited[0].subtitle, "Palo Alto, California, United States");
    assert_eq!(visited[0].coordinate, Coordinate::new(37.4, -122.1));
}

#[tokio::test(start_paused = true)]
async fn test_movement_is_geocoded_on_next_tick() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.lookup.push_ok("Start", Duration::ZERO);
    h.lookup.push_ok("Corner", Duration::ZERO);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    // ~22 m east
    h.fix(0.0, 0.0002).await;
    assert_eq!(h.lookup.calls(), 1, "movement waits for the cadence");

    advance_tick().await;

    assert_eq!(h.lookup.calls(), 2);
    assert_eq!(h.visited_titles(), vec!["Start", "Corner"]);
    assert!((h.distance() - 22.24).abs() < 0.1, "distance {}", h.distance());
    assert_eq!(h.lookup.coordinates()[1], Coordinate::new(0.0, 0.0002));
}

#[tokio::test(start_paused = true)]
async fn test_jitter_below_threshold_is_not_geocoded() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    // ~11 m, below the movement threshold
    h.fix(0.0, 0.0001).await;
    advance_tick().await;
    advance_tick().await;

    assert_eq!(h.lookup.calls(), 1);
    assert_eq!(h.visited_titles().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_movement_per_tick_is_geocoded() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    h.fix(0.0, 0.0002).await;
    h.fix(0.0, 0.0004).await;
    h.fix(0.0, 0.0006).await;
    advance_tick().await;

    assert_eq!(h.lookup.calls(), 2);
    assert_eq!(h.lookup.coordinates()[1], Coordinate::new(0.0, 0.0006));
}

#[tokio::test(start_paused = true)]
async fn test_current_coordinate_follows_every_fix() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    h.fix(0.0, 0.00005).await;

    assert_eq!(
        *h.session.signals().current_coordinate().borrow(),
        Some(Coordinate::new(0.0, 0.00005))
    );
}

#[tokio::test(start_paused = true)]
async fn test_distance_is_displacement_from_start() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    h.fix(0.0, 0.0005).await;
    h.fix(0.0, 0.001).await;
    advance_tick().await;
    assert!((h.distance() - 111.19).abs() < 0.5, "distance {}", h.distance());

    // Walk back toward the start: distance shrinks.
    h.fix(0.0, 0.0004).await;
    advance_tick().await;
    assert!((h.distance() - 44.48).abs() < 0.5, "distance {}", h.distance());
}

#[tokio::test(start_paused = true)]
async fn test_lookup_failure_alerts_and_retries_next_tick() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.lookup.push_ok("Start", Duration::ZERO);
    h.lookup.push_err(LookupError::Request("HTTP 503".to_string()), Duration::ZERO);
    h.lookup.push_ok("Corner", Duration::ZERO);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    h.fix(0.0, 0.0002).await;
    advance_tick().await;

    assert_eq!(h.lookup.calls(), 2);
    assert_eq!(h.alert_title().as_deref(), Some("Error"));
    let message = h.session.signals().alert().borrow().clone().unwrap().message;
    assert_eq!(message, TrackerError::GEOCODING_FAILED_MESSAGE);
    assert_eq!(h.visited_titles(), vec!["Start"]);

    advance_tick().await;

    assert_eq!(h.lookup.calls(), 3);
    assert_eq!(h.visited_titles(), vec!["Start", "Corner"]);
}

#[tokio::test(start_paused = true)]
async fn test_first_fix_timeout_is_retried_on_cadence() {
    let feed = Arc::new(PositionFeed::new(AuthorizationStatus::Authorized));
    let lookup = Arc::new(ScriptedLookup::default());
    lookup.push_ok("Never", Duration::from_secs(60));
    let mut session = TrackingSession::new(feed.clone(), lookup.clone())
        .with_lookup_timeout(Duration::from_secs(2));
    session.start();
    settle().await;

    assert!(feed.publish_fix(common::fix_at(0.0, 0.0)));
    tokio::time::sleep(Duration::from_secs(3)).await;

    let alert = session.signals().alert().borrow().clone();
    assert_eq!(alert.map(|a| a.title), Some("Error".to_string()));
    assert!(session.signals().visited().borrow().is_empty());

    advance_tick().await;

    assert_eq!(lookup.calls(), 2);
    assert_eq!(session.signals().visited().borrow().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_first_fix_result_is_discarded_after_newer_commit() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.lookup.push_ok("Slow", Duration::from_secs(8));
    h.lookup.push_ok("Fast", Duration::ZERO);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    h.fix(0.0, 0.0002).await;
    advance_tick().await;
    assert_eq!(h.visited_titles(), vec!["Fast"]);

    tokio::time::sleep(Duration::from_secs(4)).await;
    settle().await;

    assert_eq!(h.visited_titles(), vec!["Fast"]);
    assert!(h.alert_title().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_late_result_after_stop_is_discarded() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.lookup.push_ok("Late", Duration::from_secs(3));
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    assert_eq!(h.lookup.calls(), 1);

    h.session.stop().await;
    assert!(!h.feed.is_updating());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.visited_titles().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_start_preserves_progress() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    h.fix(0.0, 0.001).await;
    advance_tick().await;
    assert_eq!(h.visited_titles().len(), 2);
    let distance = h.distance();

    h.session.stop().await;
    assert_eq!(h.session.snapshot().visited.len(), 2);
    assert!(!h.session.snapshot().tracking);

    h.session.start();
    settle().await;
    assert!(h.feed.is_updating());

    // Same spot as the last checkpoint: no new first fix, no movement.
    h.fix(0.0, 0.001).await;
    advance_tick().await;

    assert_eq!(h.lookup.calls(), 2);
    assert_eq!(h.visited_titles().len(), 2);
    assert_eq!(h.distance(), distance);
}

#[tokio::test(start_paused = true)]
async fn test_undetermined_requests_permission_once_per_session() {
    let mut h = harness(AuthorizationStatus::Undetermined);
    h.session.start();
    settle().await;

    assert_eq!(h.feed.authorization_requests(), 1);
    assert_eq!(
        *h.session.signals().permission_gate().borrow(),
        PermissionGate::NeedsRequest
    );
    assert!(!h.feed.is_updating());

    h.feed.set_authorization(AuthorizationStatus::Undetermined);
    settle().await;
    assert_eq!(h.feed.authorization_requests(), 1);

    h.feed.set_authorization(AuthorizationStatus::Authorized);
    settle().await;
    assert_eq!(
        *h.session.signals().permission_gate().borrow(),
        PermissionGate::Authorized
    );
    assert!(h.feed.is_updating());

    // A new session may prompt again.
    h.session.stop().await;
    h.feed.set_authorization(AuthorizationStatus::Undetermined);
    h.session.start();
    settle().await;
    assert_eq!(h.feed.authorization_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_request_does_not_consume_automatic_prompt() {
    let mut h = harness(AuthorizationStatus::Undetermined);
    h.session.request_permission();
    assert_eq!(h.feed.authorization_requests(), 1);

    h.session.start();
    settle().await;
    assert_eq!(h.feed.authorization_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_denied_stops_updates_and_alerts() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;
    assert!(h.feed.is_updating());

    h.feed.set_authorization(AuthorizationStatus::Denied);
    settle().await;

    assert!(!h.feed.is_updating());
    assert_eq!(h.alert_title().as_deref(), Some("Location Permission"));
    assert_eq!(
        *h.session.signals().permission_gate().borrow(),
        PermissionGate::NeedsSettings
    );
    assert_eq!(h.feed.authorization_requests(), 0);

    // Granted again from settings.
    h.feed.set_authorization(AuthorizationStatus::Authorized);
    settle().await;
    assert!(h.feed.is_updating());
}

#[tokio::test(start_paused = true)]
async fn test_restricted_at_start_alerts() {
    let mut h = harness(AuthorizationStatus::Restricted);
    h.session.start();
    settle().await;

    assert_eq!(h.alert_title().as_deref(), Some("Location Permission"));
    assert!(!h.feed.is_updating());
}

#[tokio::test(start_paused = true)]
async fn test_position_errors() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;

    h.feed.publish_error(PositionError::LocationUnknown);
    h.feed.publish_error(PositionError::Other("kCLErrorNetwork".to_string()));
    settle().await;
    assert!(h.alert_title().is_none());
    assert!(h.feed.is_updating());

    h.feed.publish_error(PositionError::Denied);
    settle().await;
    assert_eq!(h.alert_title().as_deref(), Some("Location Permission"));
    assert!(!h.feed.is_updating());
}

#[tokio::test(start_paused = true)]
async fn test_select_and_dismiss() {
    let mut h = harness(AuthorizationStatus::Denied);
    h.session.start();
    settle().await;
    assert!(h.alert_title().is_some());

    h.session.dismiss_alert();
    assert!(h.alert_title().is_none());

    let place = visit_tracker::models::VisitedPlace::from_lookup(None, &common::fix_at(1.0, 2.0));
    assert_eq!(place.title, DROPPED_PIN_TITLE);

    h.session.select(Some(place.clone()));
    assert_eq!(*h.session.signals().selected_place().borrow(), Some(place));

    h.session.select(None);
    assert!(h.session.signals().selected_place().borrow().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_reflects_session() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;
    h.fix(0.0, 0.0).await;

    let snapshot = h.session.snapshot();
    assert!(snapshot.tracking);
    assert_eq!(snapshot.visited.len(), 1);
    assert_eq!(snapshot.permission_gate, PermissionGate::Authorized);
    assert_eq!(snapshot.current_coordinate, Some(Coordinate::new(0.0, 0.0)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_older_lookup_is_not_retried_after_newer_one() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.lookup.push_ok("Start", Duration::ZERO);
    h.lookup.push_err(LookupError::Request("HTTP 502".to_string()), Duration::from_secs(8));
    h.lookup.push_ok("Farther", Duration::from_secs(4));
    h.session.start();
    settle().await;

    h.fix(0.0, 0.0).await;
    h.fix(0.0, 0.0002).await;
    // Tick at 5 s: the lookup for 0.0002 fails at 13 s.
    advance_tick().await;
    h.fix(0.0, 0.0005).await;
    // Tick at 10 s: the lookup for 0.0005 succeeds at 14 s.
    advance_tick().await;

    tokio::time::sleep(Duration::from_secs(15)).await;
    settle().await;

    assert_eq!(h.lookup.calls(), 3);
    assert_eq!(h.visited_titles(), vec!["Start", "Farther"]);
    assert!((h.distance() - 55.6).abs() < 0.2, "distance {}", h.distance());
    assert_eq!(h.alert_title().as_deref(), Some("Error"));
}

#[tokio::test(start_paused = true)]
async fn test_permission_gate_follows_status_while_stopped() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.feed.set_authorization(AuthorizationStatus::Undetermined);
    settle().await;
    assert_eq!(
        *h.session.signals().permission_gate().borrow(),
        PermissionGate::NeedsRequest
    );
    assert_eq!(h.feed.authorization_requests(), 0, "no prompt before start");

    h.feed.set_authorization(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;
    h.session.stop().await;

    h.feed.set_authorization(AuthorizationStatus::Denied);
    settle().await;

    assert_eq!(
        *h.session.signals().permission_gate().borrow(),
        PermissionGate::NeedsSettings
    );
    assert_eq!(h.session.snapshot().permission_gate, PermissionGate::NeedsSettings);
    assert!(h.alert_title().is_none(), "no alert while stopped");
}

#[tokio::test(start_paused = true)]
async fn test_dropping_tracking_session_stops_updates() {
    let mut h = harness(AuthorizationStatus::Authorized);
    h.session.start();
    settle().await;
    assert!(h.feed.is_updating());

    let Harness { feed, session, .. } = h;
    drop(session);
    settle().await;

    assert!(!feed.is_updating());
    assert!(!feed.publish_fix(common::fix_at(0.0, 0.0)));
}
