//! Development-time tracing for debugging ballast.
//!
//! Diagnostics only: output goes to stderr and is controlled by `RUST_LOG`.
//! Product output (restored context, search hits, outcome lines) is printed
//! to stdout by `main` and is unaffected by this module.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset, so durability degradations
/// and corruption recoveries are visible without any configuration.
///
/// # Example
/// ```bash
/// RUST_LOG=ballast=debug ballast ctx snapshot
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
