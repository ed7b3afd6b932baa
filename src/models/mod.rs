// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the tracking pipeline.

pub mod alert;
pub mod authorization;
pub mod fix;
pub mod place;

pub use alert::AlertState;
pub use authorization::{AuthorizationStatus, PermissionGate};
pub use fix::{Coordinate, Fix};
pub use place::{PlaceDescription, VisitedPlace, DROPPED_PIN_TITLE};
