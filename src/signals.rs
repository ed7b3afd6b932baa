// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live values exposed to the presentation layer.
//!
//! Each value is a `watch` channel: subscribers see the current value
//! immediately and are woken on every change.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use tokio::sync::watch;

use crate::models::{AlertState, Coordinate, PermissionGate, VisitedPlace};

/// Writable side of every presentation value.
#[derive(Debug)]
pub struct SessionSignals {
    distance_meters: watch::Sender<f64>,
    visited: watch::Sender<Vec<VisitedPlace>>,
    current_coordinate: watch::Sender<Option<Coordinate>>,
    alert: watch::Sender<Option<AlertState>>,
    permission_gate: watch::Sender<PermissionGate>,
    selected_place: watch::Sender<Option<VisitedPlace>>,
}

impl SessionSignals {
    pub fn new(initial_gate: PermissionGate) -> Self {
        Self {
            distance_meters: watch::channel(0.0).0,
            visited: watch::channel(Vec::new()).0,
            current_coordinate: watch::channel(None).0,
            alert: watch::channel(None).0,
            permission_gate: watch::channel(initial_gate).0,
            selected_place: watch::channel(None).0,
        }
    }

    pub fn distance_meters(&self) -> watch::Receiver<f64> {
        self.distance_meters.subscribe()
    }

    pub fn visited(&self) -> watch::Receiver<Vec<VisitedPlace>> {
        self.visited.subscribe()
    }

    pub fn current_coordinate(&self) -> watch::Receiver<Option<Coordinate>> {
        self.current_coordinate.subscribe()
    }

    pub fn alert(&self) -> watch::Receiver<Option<AlertState>> {
        self.alert.subscribe()
    }

    pub fn permission_gate(&self) -> watch::Receiver<PermissionGate> {
        self.permission_gate.subscribe()
    }

    pub fn selected_place(&self) -> watch::Receiver<Option<VisitedPlace>> {
        self.selected_place.subscribe()
    }

    pub(crate) fn set_distance(&self, meters: f64) {
        self.distance_meters.send_replace(meters);
    }

    pub(crate) fn append_visited(&self, place: VisitedPlace) {
        self.visited.send_modify(|visited| visited.push(place));
    }

    pub(crate) fn set_current_coordinate(&self, coordinate: Coordinate) {
        self.current_coordinate.send_replace(Some(coordinate));
    }

    pub(crate) fn raise_alert(&self, alert: AlertState) {
        self.alert.send_replace(Some(alert));
    }

    pub(crate) fn clear_alert(&self) {
        self.alert.send_replace(None);
    }

    pub(crate) fn set_permission_gate(&self, gate: PermissionGate) {
        self.permission_gate.send_if_modified(|current| {
            let changed = *current != gate;
            *current = gate;
            changed
        });
    }

    pub(crate) fn set_selected_place(&self, place: Option<VisitedPlace>) {
        self.selected_place.send_replace(place);
    }

    /// Point-in-time copy of every value.
    pub fn snapshot(&self, tracking: bool) -> SessionSnapshot {
        SessionSnapshot {
            tracking,
            distance_meters: *self.distance_meters.borrow(),
            visited: self.visited.borrow().clone(),
            current_coordinate: *self.current_coordinate.borrow(),
            alert: self.alert.borrow().clone(),
            permission_gate: *self.permission_gate.borrow(),
            selected_place: self.selected_place.borrow().clone(),
        }
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionSnapshot {
    pub tracking: bool,
    pub distance_meters: f64,
    pub visited: Vec<VisitedPlace>,
    pub current_coordinate: Option<Coordinate>,
    pub alert: Option<AlertState>,
    pub permission_gate: PermissionGate,
    pub selected_place: Option<VisitedPlace>,
}
