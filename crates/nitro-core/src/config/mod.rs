//! Manager configuration schemas.
//!
//! Configuration is deserialized through the `config` crate from an
//! optional TOML file overlaid with `NITRO__`-prefixed environment
//! variables. Each sub-module is one logical section.

pub mod logging;
pub mod plugin;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::logging::LoggingConfig;
pub use self::plugin::PluginSettings;

use crate::error::AppError;
use crate::strategy::ErrorStrategy;

/// Root configuration for a plugin manager instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ManagerConfig {
    /// How hook failures during a trigger (and lifecycle batches) are handled.
    #[serde(default)]
    pub error_strategy: ErrorStrategy,
    /// Whether plugin metadata is validated on registration.
    #[serde(default = "default_true")]
    pub validate_metadata: bool,
    /// Whether per-hook execution tracing is enabled from the start.
    #[serde(default)]
    pub hook_tracing: bool,
    /// Upper bound on worker threads used to enforce blocking hook timeouts,
    /// including workers abandoned after their deadline.
    #[serde(default = "default_max_hook_workers")]
    #[validate(range(min = 1, max = 1024))]
    pub max_hook_workers: usize,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Opaque per-plugin settings.
    #[serde(default)]
    pub plugins: PluginSettings,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            error_strategy: ErrorStrategy::default(),
            validate_metadata: default_true(),
            hook_tracing: false,
            max_hook_workers: default_max_hook_workers(),
            logging: LoggingConfig::default(),
            plugins: PluginSettings::default(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from a TOML file (optional) and the environment.
    ///
    /// Environment variables use the `NITRO__` prefix with `__` as the
    /// section separator, e.g. `NITRO__ERROR_STRATEGY=fail_fast`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("NITRO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::finish(config)
    }

    fn finish(config: config::Config) -> Result<Self, AppError> {
        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed
            .validate()
            .map_err(|e| AppError::configuration(format!("Invalid configuration: {e}")))?;

        Ok(parsed)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_hook_workers() -> usize {
    32
}
