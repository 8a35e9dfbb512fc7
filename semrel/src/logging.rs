//! Diagnostic tracing for semrel.
//!
//! Logs go to stderr so stdout stays reserved for command output
//! (`semrel command`, the release tool's own report).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `semrel=info,warn` if unset, so the
/// reconciler's branch/plugin decisions are visible without configuration.
///
/// # Example
/// ```bash
/// RUST_LOG=semrel=debug semrel release --add-current-branch
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("semrel=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
