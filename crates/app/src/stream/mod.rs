//! Finger-count streaming pipeline: capture → detect → annotate → notify →
//! virtual camera.
//!
//! The module is split into focused submodules:
//! - `config`: CLI configuration parsing and startup validation.
//! - `server`: Websocket accept loop, resource ownership, shutdown.
//! - `session`: The per-client frame loop and its error taxonomy.
//! - `annotation`: Hand skeleton overlay and info bar drawing.
//! - `telemetry`: Tracing subscriber setup.

use anyhow::Result;

/// Re-export stream settings so callers can configure runs without reaching
/// into submodules.
pub use config::StreamConfig;
/// Launch the streamer with a ready-made configuration.
pub use server::run;

mod annotation;
mod config;
mod server;
mod session;
mod telemetry;

/// Parse CLI arguments and run the streamer until shutdown.
pub fn run_from_args(args: &[String]) -> Result<()> {
    let config = StreamConfig::from_args(args)?;
    run(config)
}
