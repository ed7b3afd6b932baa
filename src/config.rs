// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runtime configuration loaded from environment variables.
//!
//! The movement threshold, geocode cadence and re-geocode filter are fixed
//! constants of the pipeline and are not configurable here.

use std::env;
use std::time::Duration;

use crate::services::geocode::DEFAULT_LOOKUP_TIMEOUT;

/// Default spacing between replayed fixes.
pub const DEFAULT_REPLAY_INTERVAL: Duration = Duration::from_millis(1000);

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of a Nominatim-compatible reverse geocoder; offline lookups if unset
    pub geocoder_url: Option<String>,
    /// User-Agent sent to the geocoder
    pub geocoder_user_agent: String,
    /// Upper bound on a single place lookup
    pub lookup_timeout: Duration,
    /// Spacing between fixes when replaying a recorded track
    pub replay_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoder_url: None,
            geocoder_user_agent: default_user_agent(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            replay_interval: DEFAULT_REPLAY_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let geocoder_url = lookup("GEOCODER_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let geocoder_user_agent = lookup("GEOCODER_USER_AGENT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.geocoder_user_agent);

        let lookup_timeout = match lookup("LOOKUP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("LOOKUP_TIMEOUT_SECS", &raw)?),
            None => defaults.lookup_timeout,
        };

        let replay_interval = match lookup("REPLAY_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_positive("REPLAY_INTERVAL_MS", &raw)?),
            None => defaults.replay_interval,
        };

        Ok(Self {
            geocoder_url,
            geocoder_user_agent,
            lookup_timeout,
            replay_interval,
        })
    }
}

fn default_user_agent() -> String {
    format!("visit-tracker/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid(key, "must be greater than zero".to_string())),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Invalid(key, e.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
