//! Tracing subscriber setup for hosts and tests.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install a formatted tracing subscriber honouring `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into());
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter)).with_target(true).try_init();
}

/// Like [`init_tracing`] but writes through the test harness so output is captured per test.
pub fn init_test_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}
