//! Tracing initialization for embedders and tests.
//!
//! The engine logs every status transition and commit outcome through
//! `tracing`; this module wires up a fmt subscriber with env-filter for
//! hosts that have not installed their own.

use crate::error::{Error, Result};

/// Install a fmt subscriber with `RUST_LOG`-style filtering.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn try_init() -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))
}

/// Like [`try_init`], but quietly keeps an already-installed subscriber.
pub fn init() {
    let _ = try_init();
}
