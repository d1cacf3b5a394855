//! Tracing initialization for binaries and tests embedding the engine.

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber with the given default filter (overridable via
/// `RUST_LOG`) and bridges `log` records into tracing.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_filter: &str) {
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
