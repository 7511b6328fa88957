//! Logging bootstrap: `tracing-subscriber` with `EnvFilter` and JSON output.
//! Library crates only ever emit `tracing` events behind their `tracing`
//! feature; this is the one place a global subscriber is installed.

use tracing_subscriber::EnvFilter;

/// Installs a JSON-formatted subscriber filtered by `RUST_LOG` (default
/// `info`). Safe to call at most once per process; `gatewayctl` is the only
/// caller.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}
