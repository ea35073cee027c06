//! Diagnostic tracing for pipeline commands.
//!
//! Events go to stderr only and are filtered by `RUST_LOG`. They never reach
//! the public directory: request, result and evaluation artifacts are written
//! by `io::persist` whatever the log level, so replay and verification never
//! depend on what was logged.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the stderr subscriber.
///
/// A second call is a no-op, so tests and embedders may call it freely.
///
/// ```bash
/// RUST_LOG=pipeline=debug,eval=debug eval consume
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_does_not_panic() {
        init();
        init();
    }

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
