//! Tracing setup for binaries embedding the synchronizer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
///
/// Returns `false` if a global subscriber was already installed (e.g. by
/// the host application), in which case nothing changes.
pub fn init_tracing() -> bool {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
