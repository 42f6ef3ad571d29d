//! Log output setup.
//!
//! The library crates only emit `tracing` events; binaries call [`init`]
//! once at startup to print them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a formatted subscriber filtered by `RUST_LOG`, falling back
/// to [`DEFAULT_FILTER`].
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// Like [`init`], with a different fallback filter
/// (e.g. `"clinic_session=debug,info"`).
///
/// A second call is a no-op: the first installed subscriber stays.
pub fn init_with(default_filter: &str) {
    let installed = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
