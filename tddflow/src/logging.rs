//! Diagnostics for the controller, written to stderr.
//!
//! Under `tddflow serve` stdout carries one JSON message per line for the
//! host, so nothing else may ever print there. Tracing goes to stderr, which
//! hosts usually capture to a file, so colors are off.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. `RUST_LOG` overrides [`DEFAULT_FILTER`]:
///
/// ```bash
/// RUST_LOG=tddflow::state=debug tddflow serve 2>flow.log
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact(),
        )
        .init();
}
