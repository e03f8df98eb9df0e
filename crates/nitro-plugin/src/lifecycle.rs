//! Plugin lifecycle states and built-in lifecycle event names.

use std::fmt;

use serde::{Deserialize, Serialize};

use nitro_core::error::AppError;

/// Emitted after a plugin definition is registered.
pub const PLUGIN_REGISTERED: &str = "plugin.registered";
/// Emitted after a plugin finished loading and its hooks are active.
pub const PLUGIN_LOADED: &str = "plugin.loaded";
/// Emitted after a plugin is unloaded.
pub const PLUGIN_UNLOADED: &str = "plugin.unloaded";
/// Emitted after a plugin definition is removed.
pub const PLUGIN_UNREGISTERED: &str = "plugin.unregistered";
/// Emitted when a plugin's load or unload fails.
pub const PLUGIN_ERROR: &str = "plugin.error";
/// Emitted by `start` once every plugin has been loaded.
pub const APP_STARTUP: &str = "app.startup";
/// Emitted by `shutdown` before plugins are unloaded.
pub const APP_SHUTDOWN: &str = "app.shutdown";

/// Lifecycle state of a registered plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    /// Known to the manager, never loaded.
    Registered,
    /// Being constructed and loaded.
    Loading,
    /// Loaded, hooks active.
    Loaded,
    /// Loaded, hooks installed but excluded from dispatch.
    Disabled,
    /// Being unloaded.
    Unloading,
    /// Unloaded, may be loaded again.
    Unloaded,
    /// A load or unload callback failed. Recover by re-registering.
    Failed,
}

impl PluginState {
    /// Whether a plugin instance is live (loaded, enabled or not).
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded | Self::Disabled)
    }

    /// Whether `load` may start from this state.
    pub fn can_load(self) -> bool {
        matches!(self, Self::Registered | Self::Unloaded)
    }

    /// Whether the state machine allows moving to `next`.
    pub fn can_transition_to(self, next: PluginState) -> bool {
        use PluginState::*;
        matches!(
            (self, next),
            (Registered | Unloaded, Loading)
                | (Loading, Loaded | Failed)
                | (Loaded, Disabled | Unloading)
                | (Disabled, Loaded | Unloading)
                | (Unloading, Unloaded | Failed)
        )
    }

    /// Checks a transition, returning an error naming the plugin.
    pub fn check_transition(self, plugin: &str, next: PluginState) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::plugin_load(format!(
                "Plugin '{plugin}' cannot move from {self} to {next}"
            )))
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Registered => "registered",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Disabled => "disabled",
            Self::Unloading => "unloading",
            Self::Unloaded => "unloaded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
