use tracing::debug;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "mimir_cache=info,mimir_gateway=info,mimir_embeddings=info";

/// Install the global tracing subscriber used by hosts of the cache.
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Returns `false` when a
/// global subscriber was already installed, which is not an error for callers
/// that initialize logging more than once (tests in particular).
pub fn init_tracing() -> bool {
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_level(true),
        )
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness's captured output.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let installed = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .with(fmt::layer().with_test_writer())
        .try_init()
        .is_ok();
    if installed {
        debug!("test tracing initialized");
    }
}
