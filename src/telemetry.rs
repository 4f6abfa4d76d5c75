//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Build the default filter directive for a configured log level
///
/// The exporter's own target gets the configured level; HTTP tracing from tower-http is
/// kept at the same level so scrape requests do not flood the log at `info`.
pub fn default_directive(default_level: &str) -> String {
    format!(
        "nwrfc_exporter={level},tower_http={level}",
        level = default_level
    )
}

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently ignored.
///
/// Reads log level from RUST_LOG environment variable, defaulting to the
/// level specified in config (or "info" if not set).
///
/// # Examples
///
/// ```no_run
/// nwrfc_exporter::telemetry::init("info");
/// tracing::info!("Exporter started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
