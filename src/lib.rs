// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit-Tracker: live location tracking with reverse-geocoded visit history
//!
//! This crate turns a stream of position fixes and authorization changes into
//! a list of visited places, the current displacement from the starting
//! point, and user-facing alerts. Position sources and place lookups are
//! pluggable; a recorded-track replay source and a Nominatim client are
//! included.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod signals;
pub mod time_utils;

pub use error::TrackerError;
pub use session::TrackingSession;
pub use signals::{SessionSignals, SessionSnapshot};
