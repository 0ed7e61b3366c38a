//! Logging setup for the client binary.
//!
//! Installs a `tracing-subscriber` registry with an environment-driven
//! filter: `RUST_LOG` selects levels, defaulting to `info`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global tracing subscriber.
///
/// Call once at startup, before the first log line.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
