//! # Structured Logging Module
//!
//! Console-oriented structured logging bootstrap used by embedding
//! applications and the test suite.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber once per process.
///
/// The filter honors `RUST_LOG`, falling back to the given directive.
/// Safe to call repeatedly; later calls are no-ops.
pub fn init_logging(default_level: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

        // Ignore the error if a global subscriber is already set
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .try_init();
    });
}
