// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Permission coordination.
//!
//! Maps the raw authorization status into a [`PermissionGate`] and makes sure
//! the system prompt is requested at most once per tracking session.

use std::sync::Arc;

use futures_util::stream::{self, Stream};

use crate::models::{AuthorizationStatus, PermissionGate};
use crate::services::source::PositionSource;

/// Derives the permission gate from a position source and forwards prompt requests.
#[derive(Clone)]
pub struct PermissionCoordinator {
    source: Arc<dyn PositionSource>,
}

impl std::fmt::Debug for PermissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCoordinator")
            .field("gate", &self.current_gate())
            .finish()
    }
}

impl PermissionCoordinator {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self { source }
    }

    /// Gate for the status the source reports right now.
    pub fn current_gate(&self) -> PermissionGate {
        PermissionGate::from(*self.source.authorization_status().borrow())
    }

    /// Live gate values: the current gate first, then one item per distinct change.
    pub fn gate_updates(&self) -> impl Stream<Item = PermissionGate> + Send + 'static {
        let rx = self.source.authorization_status();
        stream::unfold(
            (rx, None::<PermissionGate>),
            |(mut rx, last)| async move {
                loop {
                    if last.is_some() && rx.changed().await.is_err() {
                        return None;
                    }
                    let gate = PermissionGate::from(*rx.borrow_and_update());
                    if last != Some(gate) {
                        return Some((gate, (rx, Some(gate))));
                    }
                }
            },
        )
    }

    /// Ask the source to show the permission prompt.
    pub fn request_permission(&self) {
        tracing::info!("Requesting location permission");
        self.source.request_authorization();
    }

    /// Request permission if `status` calls for it and the latch has not fired yet.
    ///
    /// Returns the derived gate.
    pub fn observe(&self, status: AuthorizationStatus, latch: &mut RequestLatch) -> PermissionGate {
        let gate = PermissionGate::from(status);
        if gate == PermissionGate::NeedsRequest {
            if latch.fire() {
                self.request_permission();
            } else {
                tracing::debug!("Permission already requested this session");
            }
        }
        gate
    }
}

/// One-shot latch guarding the automatic permission prompt.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestLatch {
    fired: bool,
}

impl RequestLatch {
    /// Returns `true` exactly once until [`reset`](Self::reset).
    pub fn fire(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }
}
