//! Tracing subscriber setup for the streamer binary.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Install the console subscriber. `RUST_LOG` wins; otherwise `--verbose`
/// selects `debug` over the default `info`.
pub(crate) fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_filter(env_filter),
        )
        .try_init();
}
