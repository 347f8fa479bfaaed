//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber. Verbosity follows
//! `RUST_LOG` and defaults to `info`.

use fenixedu_domain::{FenixError, Result};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install the global tracing subscriber
///
/// `json` selects one JSON object per line instead of human-readable output.
///
/// # Errors
/// Returns `FenixError::Internal` if a global subscriber is already set.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|e| FenixError::Internal(format!("Failed to install tracing subscriber: {e}")))
}
