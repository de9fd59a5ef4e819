//! Runtime setup for the command-line entry point.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level for a `-v` count
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the tracing subscriber. `RUST_LOG` takes precedence over the
/// verbosity flag. Records from the `log` facade are forwarded.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));
    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
    if installed.is_err() {
        log::debug!("tracing subscriber already installed");
    }
}
