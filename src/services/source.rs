// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Position source seam.
//!
//! The platform facility that produces GPS fixes is external. It is modeled as
//! a [`PositionSource`]: a live authorization value, a live stream of fixes and
//! a live stream of errors, plus start/stop/request controls.
//!
//! [`PositionFeed`] is a channel-backed implementation that platform adapters
//! (and tests) push into.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{broadcast, watch};

use crate::models::{AuthorizationStatus, Fix};

/// Capacity of the fix and error broadcast channels.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors reported on a position source's error channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    /// No fix could be determined right now; a later fix is expected.
    #[error("Location currently unknown")]
    LocationUnknown,

    #[error("Location access denied")]
    Denied,

    #[error("Position source error: {0}")]
    Other(String),
}

impl PositionError {
    pub fn is_denial(&self) -> bool {
        matches!(self, PositionError::Denied)
    }
}

/// A live source of position fixes.
pub trait PositionSource: Send + Sync {
    /// Current authorization status; new receivers see the current value.
    fn authorization_status(&self) -> watch::Receiver<AuthorizationStatus>;

    /// Fixes delivered after subscribing.
    fn fixes(&self) -> broadcast::Receiver<Fix>;

    /// Errors delivered after subscribing.
    fn errors(&self) -> broadcast::Receiver<PositionError>;

    /// Ask the platform to show its permission prompt.
    fn request_authorization(&self);

    fn start_updates(&self);

    fn stop_updates(&self);
}

/// Channel-backed [`PositionSource`].
///
/// Fixes published while updates are stopped are dropped, matching how a
/// platform location manager behaves.
#[derive(Debug)]
pub struct PositionFeed {
    status: watch::Sender<AuthorizationStatus>,
    fixes: broadcast::Sender<Fix>,
    errors: broadcast::Sender<PositionError>,
    updating: AtomicBool,
    authorization_requests: AtomicUsize,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

impl Default for PositionFeed {
    fn default() -> Self {
        Self::new(AuthorizationStatus::Undetermined)
    }
}

impl PositionFeed {
    pub fn new(initial_status: AuthorizationStatus) -> Self {
        let (status, _) = watch::channel(initial_status);
        let (fixes, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (errors, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            status,
            fixes,
            errors,
            updating: AtomicBool::new(false),
            authorization_requests: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
        }
    }

    /// Replace the authorization status and notify subscribers.
    pub fn set_authorization(&self, status: AuthorizationStatus) {
        tracing::debug!(?status, "Authorization status changed");
        self.status.send_replace(status);
    }

    pub fn current_authorization(&self) -> AuthorizationStatus {
        *self.status.borrow()
    }

    /// Deliver a fix. Returns `false` if it was dropped (updates stopped or
    /// nobody subscribed).
    pub fn publish_fix(&self, fix: Fix) -> bool {
        if !self.is_updating() {
            tracing::debug!("Dropping fix while updates are stopped");
            return false;
        }
        self.fixes.send(fix).is_ok()
    }

    /// Deliver an error. Returns `false` if nobody subscribed.
    pub fn publish_error(&self, error: PositionError) -> bool {
        self.errors.send(error).is_ok()
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }

    /// Number of times the permission prompt was requested.
    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl PositionSource for PositionFeed {
    fn authorization_status(&self) -> watch::Receiver<AuthorizationStatus> {
        self.status.subscribe()
    }

    fn fixes(&self) -> broadcast::Receiver<Fix> {
        self.fixes.subscribe()
    }

    fn errors(&self) -> broadcast::Receiver<PositionError> {
        self.errors.subscribe()
    }

    fn request_authorization(&self) {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn start_updates(&self) {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.updating.store(true, Ordering::SeqCst);
    }

    fn stop_updates(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.updating.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use chrono::Utc;

    fn fix() -> Fix {
        Fix::new(Coordinate::new(1.0, 2.0), Utc::now())
    }

    #[test]
    fn test_fixes_dropped_until_started() {
        let feed = PositionFeed::default();
        let mut rx = feed.fixes();

        assert!(!feed.publish_fix(fix()));
        assert!(rx.try_recv().is_err());

        feed.start_updates();
        let sent = fix();
        assert!(feed.publish_fix(sent.clone()));
        assert_eq!(rx.try_recv().unwrap(), sent);
    }

    #[test]
    fn test_authorization_replays_current_value() {
        let feed = PositionFeed::new(AuthorizationStatus::Denied);
        let rx = feed.authorization_status();
        assert_eq!(*rx.borrow(), AuthorizationStatus::Denied);

        feed.set_authorization(AuthorizationStatus::Authorized);
        let rx = feed.authorization_status();
        assert_eq!(*rx.borrow(), AuthorizationStatus::Authorized);
    }

    #[test]
    fn test_control_counters() {
        let feed = PositionFeed::default();
        feed.request_authorization();
        feed.start_updates();
        feed.stop_updates();
        feed.stop_updates();
        assert_eq!(feed.authorization_requests(), 1);
        assert_eq!(feed.start_calls(), 1);
        assert_eq!(feed.stop_calls(), 2);
        assert!(!feed.is_updating());
    }
}
