//! Test logging for hatload crates.

use tracing_subscriber::EnvFilter;

/// Default filter for tests: per-request logs of the load generator and the fake storefront, and
/// only errors from the HTTP stack underneath.
const DEFAULT_DIRECTIVES: &str = "ERROR,hatload=DEBUG,hatload_test=TRACE";

/// Initialize the logger for testing.
///
/// This logs to the stdout registered by the Rust test runner. `RUST_LOG` replaces the default
/// filter, for example `RUST_LOG=hatload=trace,reqwest=debug` to follow connection handling.
///
/// # Example
///
/// ```
/// hatload_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.is_empty() => EnvFilter::new(value),
        _ => EnvFilter::new(DEFAULT_DIRECTIVES),
    };

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
