//! Logging setup for the plugin binary.
//!
//! protoc reads the plugin response from stdout, so every log line goes to
//! stderr.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with a custom default filter.
///
/// `RUST_LOG` takes precedence when set. Safe to call more than once; only
/// the first call installs a subscriber.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}
