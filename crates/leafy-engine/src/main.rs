//! # Leafy Engine
//!
//! Headless entry point for Leafy Hollows.
//!
//! Drives the chunk registry with a scripted viewpoint for a fixed number of
//! ticks, logging residency as it goes. Terrain generation and rendering are
//! not wired in; chunks are constructed as flat fills.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod viewpoint;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("leafy=info".parse()?))
        .init();

    info!("Leafy Hollows starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load();
    config.validate();

    let summary = app::run(&config)?;

    info!(
        "Leafy Hollows shutdown complete: {} ticks, {} loads, {} unloads",
        summary.ticks, summary.loads, summary.unloads
    );
    Ok(())
}
