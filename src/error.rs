// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking error taxonomy and its mapping to user-facing alerts.
//!
//! Nothing here is fatal: every error ends up either as a dismissible alert or
//! as a silently swallowed event.

use crate::models::AlertState;
use crate::services::lookup::LookupError;
use crate::services::source::PositionError;

/// Errors the tracking session recovers from locally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    #[error("Place lookup failed: {0}")]
    LookupFailed(#[from] LookupError),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Transient position error: {0}")]
    TransientPosition(PositionError),
}

impl TrackerError {
    pub const GEOCODING_FAILED_MESSAGE: &'static str =
        "Couldn't fetch location info. Please try again.";
    pub const NOT_AUTHORIZED_MESSAGE: &'static str =
        "Location permission is required to track your position.";

    /// Message shown to the user, or `None` for silent errors.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            TrackerError::LookupFailed(_) => Some(Self::GEOCODING_FAILED_MESSAGE),
            TrackerError::PermissionDenied => Some(Self::NOT_AUTHORIZED_MESSAGE),
            TrackerError::TransientPosition(_) => None,
        }
    }

    /// Whether the error is swallowed without telling the user.
    pub fn is_silent(&self) -> bool {
        self.user_message().is_none()
    }

    /// Alert to surface, or `None` for silent errors.
    pub fn alert(&self) -> Option<AlertState> {
        let title = match self {
            TrackerError::LookupFailed(_) => "Error",
            TrackerError::PermissionDenied => "Location Permission",
            TrackerError::TransientPosition(_) => return None,
        };
        self.user_message().map(|message| AlertState::new(title, message))
    }
}

impl From<PositionError> for TrackerError {
    fn from(err: PositionError) -> Self {
        if err.is_denial() {
            TrackerError::PermissionDenied
        } else {
            TrackerError::TransientPosition(err)
        }
    }
}
