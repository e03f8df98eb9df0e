//! Plugin context — what a plugin sees while it loads.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use nitro_core::config::PluginSettings;
use nitro_core::result::AppResult;

use crate::hooks::definitions::{HookBinding, HookCallback, HookDescriptor};
use crate::hooks::dispatcher::{HookDispatcher, TriggerError, TriggerOutcome};

/// Context passed to [`Plugin::on_load`](crate::traits::Plugin::on_load).
///
/// Configuration lookups are scoped to the plugin's own section of the
/// manager's settings. Hooks registered through the context are owned by
/// the plugin: they stay inactive until the load completes and are removed
/// when it unloads or fails. A plugin may keep a clone of its context to
/// trigger events later.
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Name of the plugin being loaded.
    plugin_name: String,
    /// Manager-wide plugin settings.
    settings: Arc<PluginSettings>,
    /// The manager's dispatcher and, through it, its hook registry.
    dispatcher: Arc<HookDispatcher>,
}

impl PluginContext {
    /// Creates a context for one plugin.
    pub fn new(
        plugin_name: impl Into<String>,
        settings: Arc<PluginSettings>,
        dispatcher: Arc<HookDispatcher>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            settings,
            dispatcher,
        }
    }

    /// Name of the plugin this context belongs to.
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Reads `config[plugin][key]`, falling back to `default` when absent
    /// or not deserializable as `T`.
    pub fn get_config<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.settings.get_or(&self.plugin_name, key, default)
    }

    /// Raw value of `config[plugin][key]`.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.settings.get(&self.plugin_name, key)
    }

    /// The plugin's whole settings section.
    pub fn section(&self) -> Option<&Map<String, Value>> {
        self.settings.section(&self.plugin_name)
    }

    /// Registers a hook owned by this plugin.
    pub fn register_hook(&self, descriptor: HookDescriptor) -> AppResult<Arc<HookBinding>> {
        self.dispatcher
            .registry()
            .register(descriptor, Some(&self.plugin_name))
    }

    /// Removes a hook this plugin registered. Returns whether it was found.
    pub fn unregister_hook(&self, event: &str, callback: &HookCallback) -> bool {
        self.dispatcher
            .registry()
            .unregister(event, callback, Some(&self.plugin_name))
    }

    /// Runs a trigger on the calling thread.
    pub fn trigger(&self, event: &str, payload: Value) -> Result<TriggerOutcome, TriggerError> {
        self.dispatcher.trigger(event, payload)
    }

    /// Runs a trigger on the async path.
    pub async fn trigger_async(
        &self,
        event: &str,
        payload: Value,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.dispatcher.trigger_async(event, payload).await
    }
}
