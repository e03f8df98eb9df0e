//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::AppError;

/// Installs a global `tracing` subscriber according to `config`.
///
/// `RUST_LOG` overrides the configured level. Returns a configuration
/// error when a global subscriber has already been installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .try_init(),
    };

    result.map_err(|e| AppError::configuration(format!("Failed to install subscriber: {e}")))
}
