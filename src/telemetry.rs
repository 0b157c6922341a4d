//! Logging setup

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or unparsable
const DEFAULT_FILTER: &str = "info";

/// Install the global fmt subscriber.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
