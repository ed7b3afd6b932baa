// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geocode scheduling.
//!
//! Movement events land in a coalescing slot. Every [`GEOCODE_INTERVAL`] the
//! scheduler drains the slot and, unless the point is within
//! [`REGEOCODE_MIN_METERS`] of the last geocoded point, issues one lookup.
//! The first fix of a session bypasses both the cadence and the filter.
//!
//! Every lookup carries a sequence number. Completions older than the newest
//! committed lookup are stale and must be dropped by the caller.

use std::time::Duration;

use crate::models::{Fix, PlaceDescription};
use crate::services::lookup::{LookupError, PlaceLookupService};
use crate::services::movement::PendingMovement;

/// Cadence of geocode ticks.
pub const GEOCODE_INTERVAL: Duration = Duration::from_secs(5);

/// Points closer than this to the last geocoded point are not looked up again.
pub const REGEOCODE_MIN_METERS: f64 = 1.0;

/// Default upper bound on a single lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a lookup was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTrigger {
    FirstFix,
    Cadence,
}

/// A lookup that has been issued but not yet settled.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTicket {
    pub seq: u64,
    pub fix: Fix,
    pub trigger: LookupTrigger,
}

/// A settled lookup.
#[derive(Debug)]
pub struct LookupCompletion {
    pub ticket: LookupTicket,
    pub result: Result<Vec<PlaceDescription>, LookupError>,
}

/// How a completion affects session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Newest result so far; the caller records the place.
    Commit,
    /// A newer lookup already committed; ignore entirely.
    Stale,
    /// Lookup failed; the caller raises an alert.
    Failed { rearmed: bool },
}

/// Cadence-driven lookup scheduler state.
#[derive(Debug, Clone, Default)]
pub struct GeocodeScheduler {
    pending: PendingMovement,
    last_geocoded: Option<Fix>,
    next_seq: u64,
    committed_seq: Option<u64>,
}

impl GeocodeScheduler {
    /// Record a movement event (last write wins).
    pub fn offer(&mut self, fix: Fix) {
        self.pending.publish(fix);
    }

    /// Immediate lookup for the first fix of a session.
    pub fn first_fix(&mut self, fix: Fix) -> LookupTicket {
        self.ticket(fix, LookupTrigger::FirstFix)
    }

    /// Handle one cadence tick. Returns the lookup to issue, if any.
    pub fn on_tick(&mut self) -> Option<LookupTicket> {
        let fix = self.pending.take()?;

        if let Some(last) = &self.last_geocoded {
            let delta = fix.distance_to(last);
            if delta < REGEOCODE_MIN_METERS {
                tracing::debug!(delta_meters = delta, "Skipping lookup, already geocoded here");
                return None;
            }
        }

        Some(self.ticket(fix, LookupTrigger::Cadence))
    }

    /// Settle a completed lookup against the scheduler state.
    pub fn settle(&mut self, completion: &LookupCompletion) -> Settlement {
        let ticket = &completion.ticket;

        if self.committed_seq.is_some_and(|committed| ticket.seq < committed) {
            return Settlement::Stale;
        }

        match completion.result {
            Ok(_) => {
                self.committed_seq = Some(ticket.seq);
                self.last_geocoded = Some(ticket.fix.clone());
                Settlement::Commit
            }
            // Only the newest ticket may retry; an older fix must not be
            // looked up again once a newer one has been issued.
            Err(_) if ticket.seq == self.next_seq => Settlement::Failed {
                rearmed: self.pending.rearm(ticket.fix.clone()),
            },
            Err(_) => Settlement::Failed { rearmed: false },
        }
    }

    pub fn last_geocoded(&self) -> Option<&Fix> {
        self.last_geocoded.as_ref()
    }

    pub fn pending(&self) -> Option<&Fix> {
        self.pending.peek()
    }

    fn ticket(&mut self, fix: Fix, trigger: LookupTrigger) -> LookupTicket {
        self.next_seq += 1;
        LookupTicket {
            seq: self.next_seq,
            fix,
            trigger,
        }
    }
}

/// Run one lookup, bounded by `timeout`.
pub async fn resolve(
    service: &dyn PlaceLookupService,
    ticket: LookupTicket,
    timeout: Duration,
) -> LookupCompletion {
    let result = match tokio::time::timeout(timeout, service.lookup(ticket.fix.coordinate)).await
    {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout(timeout)),
    };
    LookupCompletion { ticket, result }
}
