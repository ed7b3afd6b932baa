// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - the stages of the tracking pipeline and their adapters.

pub mod geocode;
pub mod lookup;
pub mod movement;
pub mod nominatim;
pub mod permission;
pub mod replay;
pub mod source;

pub use geocode::{GeocodeScheduler, GEOCODE_INTERVAL, REGEOCODE_MIN_METERS};
pub use lookup::{LookupError, OfflineLookup, PlaceLookupService};
pub use movement::{MovementGate, MovementSignal, MOVEMENT_THRESHOLD_METERS};
pub use nominatim::NominatimLookup;
pub use permission::{PermissionCoordinator, RequestLatch};
pub use replay::{ReplayError, ReplayPoint, ReplaySource};
pub use source::{PositionError, PositionFeed, PositionSource};
