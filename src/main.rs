// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Visit-Tracker CLI
//!
//! Replays a recorded track through a tracking session and prints the
//! resulting session snapshot as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visit_tracker::{
    config::Config,
    services::{NominatimLookup, OfflineLookup, PlaceLookupService, ReplaySource, GEOCODE_INTERVAL},
    time_utils::format_elapsed,
    TrackingSession,
};

/// Extra time after the last fix so the final cadence tick and its lookup land.
const DRAIN_MARGIN: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;

    let track_path = std::env::args()
        .nth(1)
        .context("Usage: visit-tracker <track.geojson|track.polyline>")?;

    tracing::info!(path = %track_path, "Loading track");
    let source = Arc::new(
        ReplaySource::load_from_file(&track_path, config.replay_interval)
            .with_context(|| format!("Failed to load track from {track_path}"))?,
    );
    tracing::info!(points = source.len(), "Track loaded");

    let lookup: Arc<dyn PlaceLookupService> = match &config.geocoder_url {
        Some(url) => {
            tracing::info!(url = %url, "Using Nominatim geocoder");
            Arc::new(
                NominatimLookup::new(url, &config.geocoder_user_agent)
                    .context("Failed to initialize geocoder client")?,
            )
        }
        None => {
            tracing::info!("GEOCODER_URL not set, places will be unnamed");
            Arc::new(OfflineLookup)
        }
    };

    let mut session =
        TrackingSession::new(source.clone(), lookup).with_lookup_timeout(config.lookup_timeout);

    let started = tokio::time::Instant::now();
    session.start();

    tokio::select! {
        _ = async {
            source.finished().await;
            tokio::time::sleep(GEOCODE_INTERVAL + DRAIN_MARGIN).await;
        } => {
            tracing::info!("Track replay complete");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            tracing::info!("Interrupted, stopping");
        }
    }

    session.stop().await;

    let snapshot = session.snapshot();
    tracing::info!(
        places = snapshot.visited.len(),
        distance_meters = snapshot.distance_meters,
        elapsed = %format_elapsed(started.elapsed()),
        "Session finished"
    );

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Initialize structured JSON logging on stderr.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("visit_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
