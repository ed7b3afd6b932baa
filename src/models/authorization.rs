// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location authorization status and the coarse permission gate derived from it.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Authorization status as reported by the position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    Undetermined,
    /// Always or while-in-use access.
    Authorized,
    Denied,
    /// Blocked by policy (e.g. parental controls).
    Restricted,
    /// A status this crate does not know about.
    Unknown,
}

/// Coarse permission state exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PermissionGate {
    Authorized,
    /// First prompt has not been shown.
    NeedsRequest,
    /// Previously denied or restricted; only the user can change it in settings.
    NeedsSettings,
}

impl From<AuthorizationStatus> for PermissionGate {
    fn from(status: AuthorizationStatus) -> Self {
        match status {
            AuthorizationStatus::Authorized => PermissionGate::Authorized,
            AuthorizationStatus::Undetermined => PermissionGate::NeedsRequest,
            AuthorizationStatus::Denied
            | AuthorizationStatus::Restricted
            | AuthorizationStatus::Unknown => PermissionGate::NeedsSettings,
        }
    }
}
