// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking session orchestration.
//!
//! While tracking, a single worker task owns all pipeline state and reacts to
//! authorization changes, fixes, position errors, cadence ticks and lookup
//! completions. Stopping cancels the worker and hands the state back, so a
//! later start resumes from the same checkpoints, places and distance.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::TrackerError;
use crate::models::{AuthorizationStatus, Fix, VisitedPlace};
use crate::services::geocode::{
    resolve, GeocodeScheduler, LookupCompletion, LookupTicket, Settlement, DEFAULT_LOOKUP_TIMEOUT,
    GEOCODE_INTERVAL,
};
use crate::services::lookup::PlaceLookupService;
use crate::services::movement::{MovementGate, MovementSignal};
use crate::services::permission::{PermissionCoordinator, RequestLatch};
use crate::services::source::{PositionError, PositionSource};
use crate::signals::{SessionSignals, SessionSnapshot};
use crate::time_utils::format_utc_rfc3339;

/// Pipeline state that survives stop/start.
#[derive(Debug, Default)]
struct SessionState {
    gate: MovementGate,
    scheduler: GeocodeScheduler,
    latch: RequestLatch,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<SessionState>,
}

/// Owns the tracking lifecycle and the values shown to the user.
pub struct TrackingSession {
    source: Arc<dyn PositionSource>,
    lookup: Arc<dyn PlaceLookupService>,
    permission: PermissionCoordinator,
    signals: Arc<SessionSignals>,
    lookup_timeout: Duration,
    /// Present while stopped
    state: Option<SessionState>,
    /// Present while tracking
    running: Option<Running>,
    /// Cancels tasks that live as long as the session
    lifetime: CancellationToken,
    gate_forwarder: bool,
}

impl std::fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("tracking", &self.is_tracking())
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl TrackingSession {
    pub fn new(source: Arc<dyn PositionSource>, lookup: Arc<dyn PlaceLookupService>) -> Self {
        let permission = PermissionCoordinator::new(source.clone());
        let signals = Arc::new(SessionSignals::new(permission.current_gate()));

        let mut session = Self {
            source,
            lookup,
            permission,
            signals,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            state: Some(SessionState::default()),
            running: None,
            lifetime: CancellationToken::new(),
            gate_forwarder: false,
        };
        session.ensure_gate_forwarder();
        session
    }

    /// Keep the presentation gate in sync with the source whether or not
    /// tracking is running. Deferred to `start()` when built outside a runtime.
    fn ensure_gate_forwarder(&mut self) {
        if self.gate_forwarder {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime yet, permission gate forwarding deferred");
            return;
        };

        let gates = self.permission.gate_updates();
        let signals = self.signals.clone();
        let cancel = self.lifetime.clone();

        handle.spawn(async move {
            let mut gates = Box::pin(gates);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    gate = gates.next() => match gate {
                        Some(gate) => signals.set_permission_gate(gate),
                        None => break,
                    },
                }
            }
        });
        self.gate_forwarder = true;
    }

    /// Bound each place lookup by `timeout` instead of the default.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.running.is_some()
    }

    /// Start tracking. No-op if already tracking.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.running.is_some() {
            tracing::debug!("Tracking already started");
            return;
        }

        self.ensure_gate_forwarder();
        let state = self.state.take().unwrap_or_default();
        let cancel = CancellationToken::new();

        // Subscribe before spawning so nothing published after start() is missed.
        let worker = SessionWorker {
            source: self.source.clone(),
            lookup: self.lookup.clone(),
            permission: self.permission.clone(),
            signals: self.signals.clone(),
            lookup_timeout: self.lookup_timeout,
            state,
            status: self.source.authorization_status(),
            fixes: self.source.fixes(),
            errors: self.source.errors(),
            lookups: JoinSet::new(),
        };

        let handle = tokio::spawn(worker.run(cancel.clone()));
        self.running = Some(Running { cancel, handle });
        tracing::info!("Tracking started");
    }

    /// Stop tracking. No-op if not tracking.
    ///
    /// Once this returns, no in-flight lookup can change the session.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            tracing::debug!("Tracking already stopped");
            return;
        };

        running.cancel.cancel();
        let mut state = match running.handle.await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, "Tracking worker failed, resetting session state");
                SessionState::default()
            }
        };
        self.source.stop_updates();

        tracing::debug!(
            prompted = state.latch.has_fired(),
            pending_movement = state.scheduler.pending().is_some(),
            "Session state retained"
        );
        state.latch.reset();
        self.state = Some(state);
        tracing::info!("Tracking stopped");
    }

    /// Set the place currently being inspected.
    pub fn select(&self, place: Option<VisitedPlace>) {
        self.signals.set_selected_place(place);
    }

    pub fn dismiss_alert(&self) {
        self.signals.clear_alert();
    }

    /// User-initiated permission prompt. Does not consume the automatic prompt.
    pub fn request_permission(&self) {
        self.permission.request_permission();
    }

    pub fn permission(&self) -> &PermissionCoordinator {
        &self.permission
    }

    pub fn signals(&self) -> &SessionSignals {
        &self.signals
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.signals.snapshot(self.is_tracking())
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.lifetime.cancel();
        if let Some(running) = &self.running {
            running.cancel.cancel();
            self.source.stop_updates();
        }
    }
}

struct SessionWorker {
    source: Arc<dyn PositionSource>,
    lookup: Arc<dyn PlaceLookupService>,
    permission: PermissionCoordinator,
    signals: Arc<SessionSignals>,
    lookup_timeout: Duration,
    state: SessionState,
    status: watch::Receiver<AuthorizationStatus>,
    fixes: broadcast::Receiver<Fix>,
    errors: broadcast::Receiver<PositionError>,
    lookups: JoinSet<LookupCompletion>,
}

impl SessionWorker {
    async fn run(mut self, cancel: CancellationToken) -> SessionState {
        let status = *self.status.borrow_and_update();
        self.on_authorization(status);

        let mut ticker = tokio::time::interval_at(Instant::now() + GEOCODE_INTERVAL, GEOCODE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut status_open = true;
        let mut fixes_open = true;
        let mut errors_open = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                changed = self.status.changed(), if status_open => match changed {
                    Ok(()) => {
                        let status = *self.status.borrow_and_update();
                        self.on_authorization(status);
                    }
                    Err(_) => {
                        tracing::warn!("Authorization status channel closed");
                        status_open = false;
                    }
                },

                Some(joined) = self.lookups.join_next(), if !self.lookups.is_empty() => match joined {
                    Ok(completion) => self.on_completion(completion),
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => tracing::error!(error = %e, "Place lookup task panicked"),
                },

                fix = self.fixes.recv(), if fixes_open => match fix {
                    Ok(fix) => self.on_fix(fix),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Fell behind the position stream");
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!("Position stream closed");
                        fixes_open = false;
                    }
                },

                error = self.errors.recv(), if errors_open => match error {
                    Ok(error) => self.on_position_error(error),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Dropped position errors");
                    }
                    Err(RecvError::Closed) => errors_open = false,
                },

                _ = ticker.tick() => self.on_tick(),
            }
        }

        self.lookups.abort_all();
        self.state
    }

    fn on_authorization(&mut self, status: AuthorizationStatus) {
        let gate = self.permission.observe(status, &mut self.state.latch);
        self.signals.set_permission_gate(gate);
        tracing::debug!(?status, ?gate, "Authorization status");

        match status {
            AuthorizationStatus::Authorized => self.source.start_updates(),
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                self.source.stop_updates();
                self.raise(TrackerError::PermissionDenied);
            }
            AuthorizationStatus::Undetermined | AuthorizationStatus::Unknown => {}
        }
    }

    fn on_fix(&mut self, fix: Fix) {
        self.signals.set_current_coordinate(fix.coordinate);

        match self.state.gate.observe(&fix) {
            MovementSignal::FirstFix(fix) => {
                tracing::info!(
                    lat = fix.coordinate.latitude,
                    lon = fix.coordinate.longitude,
                    "First fix of session"
                );
                let ticket = self.state.scheduler.first_fix(fix);
                self.spawn_lookup(ticket);
            }
            MovementSignal::Moved { fix, step_meters } => {
                tracing::debug!(step_meters, "Moved past threshold");
                self.state.scheduler.offer(fix);
            }
            MovementSignal::Stationary { .. } => {}
        }
    }

    fn on_position_error(&mut self, error: PositionError) {
        let error = TrackerError::from(error);
        if error.is_silent() {
            tracing::debug!(error = %error, "Ignoring position error");
            return;
        }

        tracing::warn!(error = %error, "Position error");
        if error == TrackerError::PermissionDenied {
            self.source.stop_updates();
        }
        self.raise(error);
    }

    fn on_tick(&mut self) {
        if let Some(ticket) = self.state.scheduler.on_tick() {
            self.spawn_lookup(ticket);
        }
    }

    fn on_completion(&mut self, completion: LookupCompletion) {
        let seq = completion.ticket.seq;

        match self.state.scheduler.settle(&completion) {
            Settlement::Commit => {
                let fix = &completion.ticket.fix;
                let best = completion.result.as_ref().ok().and_then(|found| found.first());
                let place = VisitedPlace::from_lookup(best, fix);
                let distance = self.state.gate.displacement_from_start(fix);

                tracing::info!(
                    seq,
                    title = %place.title,
                    distance_meters = distance,
                    at = %format_utc_rfc3339(fix.timestamp),
                    "Recorded visited place"
                );
                self.signals.set_distance(distance);
                self.signals.append_visited(place);
            }
            Settlement::Stale => {
                tracing::debug!(seq, "Discarding stale lookup result");
            }
            Settlement::Failed { rearmed } => {
                if let Err(e) = completion.result {
                    tracing::warn!(seq, rearmed, error = %e, "Place lookup failed");
                    self.raise(TrackerError::from(e));
                }
            }
        }
    }

    fn spawn_lookup(&mut self, ticket: LookupTicket) {
        tracing::debug!(seq = ticket.seq, trigger = ?ticket.trigger, "Issuing place lookup");
        let lookup = self.lookup.clone();
        let timeout = self.lookup_timeout;
        self.lookups
            .spawn(async move { resolve(lookup.as_ref(), ticket, timeout).await });
    }

    fn raise(&self, error: TrackerError) {
        if let Some(alert) = error.alert() {
            self.signals.raise_alert(alert);
        }
    }
}

