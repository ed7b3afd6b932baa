// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Movement detection.
//!
//! The gate turns a noisy stream of fixes into movement events: a fix only
//! becomes a new checkpoint once it is at least [`MOVEMENT_THRESHOLD_METERS`]
//! away from the previous checkpoint. This bounds geocoding volume while the
//! user stands still and GPS jitters around.

use crate::models::Fix;

/// Displacement from the last checkpoint that counts as movement.
pub const MOVEMENT_THRESHOLD_METERS: f64 = 20.0;

/// What a single fix meant to the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum MovementSignal {
    /// First fix of the session; now both start and checkpoint.
    FirstFix(Fix),
    /// Crossed the threshold; the fix is the new checkpoint.
    Moved { fix: Fix, step_meters: f64 },
    /// Below the threshold; checkpoint unchanged.
    Stationary { step_meters: f64 },
}

/// Threshold gate over raw fixes.
#[derive(Debug, Clone, Default)]
pub struct MovementGate {
    start: Option<Fix>,
    last_checkpoint: Option<Fix>,
}

impl MovementGate {
    pub fn observe(&mut self, fix: &Fix) -> MovementSignal {
        let Some(last) = &self.last_checkpoint else {
            self.start = Some(fix.clone());
            self.last_checkpoint = Some(fix.clone());
            return MovementSignal::FirstFix(fix.clone());
        };

        let step_meters = fix.distance_to(last);
        if step_meters >= MOVEMENT_THRESHOLD_METERS {
            self.last_checkpoint = Some(fix.clone());
            MovementSignal::Moved {
                fix: fix.clone(),
                step_meters,
            }
        } else {
            MovementSignal::Stationary { step_meters }
        }
    }

    /// First fix of the session, the origin for distance.
    pub fn start(&self) -> Option<&Fix> {
        self.start.as_ref()
    }

    pub fn last_checkpoint(&self) -> Option<&Fix> {
        self.last_checkpoint.as_ref()
    }

    /// Straight-line distance from the start to `fix`, or 0 before the first fix.
    pub fn displacement_from_start(&self, fix: &Fix) -> f64 {
        self.start.as_ref().map_or(0.0, |start| start.distance_to(fix))
    }
}

/// Single-slot, last-write-wins buffer for the latest unconsumed movement.
#[derive(Debug, Clone, Default)]
pub struct PendingMovement {
    slot: Option<Fix>,
}

impl PendingMovement {
    /// Store a movement, replacing any unconsumed one.
    pub fn publish(&mut self, fix: Fix) {
        if let Some(replaced) = self.slot.replace(fix) {
            tracing::debug!(
                lat = replaced.coordinate.latitude,
                lon = replaced.coordinate.longitude,
                "Coalesced unconsumed movement"
            );
        }
    }

    /// Take the pending movement, leaving the slot empty.
    pub fn take(&mut self) -> Option<Fix> {
        self.slot.take()
    }

    /// Put a fix back only if nothing newer was published meanwhile.
    pub fn rearm(&mut self, fix: Fix) -> bool {
        if self.slot.is_some() {
            return false;
        }
        self.slot = Some(fix);
        true
    }

    pub fn peek(&self) -> Option<&Fix> {
        self.slot.as_ref()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
