//! Plugin registry — the table of registered plugins and their states.
//!
//! Records are kept in registration order. The lock is never held across an
//! await point: callers copy what they need out of the table and call into
//! plugins afterwards.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use nitro_core::error::AppError;
use nitro_core::result::AppResult;

use crate::lifecycle::PluginState;
use crate::resolver::DependencyNode;
use crate::traits::{Plugin, PluginDefinition, PluginInfo};

/// Externally visible view of a registered plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    /// Plugin metadata.
    pub info: PluginInfo,
    /// Current lifecycle state.
    pub state: PluginState,
    /// Whether the plugin's hooks take part in dispatch.
    pub enabled: bool,
    /// Patterns of the hooks the plugin currently owns.
    pub hooks: Vec<String>,
    /// When the current instance finished loading.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// One row of the plugin table.
#[derive(Debug)]
struct PluginRecord {
    definition: PluginDefinition,
    state: PluginState,
    instance: Option<Arc<dyn Plugin>>,
    /// Position in load order, while loaded.
    load_seq: Option<u64>,
    loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    records: Vec<PluginRecord>,
    next_load_seq: u64,
}

impl RegistryInner {
    fn find(&self, name: &str) -> Option<&PluginRecord> {
        self.records.iter().find(|r| r.definition.name() == name)
    }

    fn find_mut(&mut self, name: &str) -> AppResult<&mut PluginRecord> {
        self.records
            .iter_mut()
            .find(|r| r.definition.name() == name)
            .ok_or_else(|| not_registered(name))
    }
}

fn not_registered(name: &str) -> AppError {
    AppError::plugin_not_found(format!("Plugin '{name}' is not registered"))
}

/// Registry of all registered plugins.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    inner: RwLock<RegistryInner>,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition in the `Registered` state.
    pub fn insert(&self, definition: PluginDefinition) -> AppResult<()> {
        let mut inner = self.inner.write();
        let name = definition.name().to_string();

        if inner.find(&name).is_some() {
            return Err(AppError::plugin_registration(format!(
                "Plugin '{name}' is already registered"
            )));
        }

        info!(
            plugin = %name,
            version = %definition.info.version,
            dependencies = ?definition.info.dependencies,
            "Registering plugin"
        );

        inner.records.push(PluginRecord {
            definition,
            state: PluginState::Registered,
            instance: None,
            load_seq: None,
            loaded_at: None,
        });
        Ok(())
    }

    /// Removes a plugin, returning its definition.
    pub fn remove(&self, name: &str) -> AppResult<PluginDefinition> {
        let mut inner = self.inner.write();
        let index = inner
            .records
            .iter()
            .position(|r| r.definition.name() == name)
            .ok_or_else(|| not_registered(name))?;
        let record = inner.records.remove(index);
        info!(plugin = %name, "Plugin unregistered");
        Ok(record.definition)
    }

    /// Whether a plugin with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().find(name).is_some()
    }

    /// Current state of a plugin.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        self.inner.read().find(name).map(|r| r.state)
    }

    /// Current definition of a plugin.
    pub fn definition(&self, name: &str) -> Option<PluginDefinition> {
        self.inner.read().find(name).map(|r| r.definition.clone())
    }

    /// Live instance of a plugin, if loaded.
    pub fn instance(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.inner.read().find(name).and_then(|r| r.instance.clone())
    }

    /// Moves a plugin to `next`, checking the transition. Returns the
    /// previous state.
    pub fn transition(&self, name: &str, next: PluginState) -> AppResult<PluginState> {
        let mut inner = self.inner.write();
        let record = inner.find_mut(name)?;
        let previous = record.state;
        previous.check_transition(name, next)?;
        record.state = next;
        debug!(plugin = %name, from = %previous, to = %next, "Plugin state changed");
        Ok(previous)
    }

    /// Marks a plugin failed, dropping any live instance.
    pub fn mark_failed(&self, name: &str) {
        let mut inner = self.inner.write();
        if let Ok(record) = inner.find_mut(name) {
            debug!(plugin = %name, from = %record.state, "Plugin failed");
            record.state = PluginState::Failed;
            record.instance = None;
            record.load_seq = None;
            record.loaded_at = None;
        }
    }

    /// Completes a load: stores the instance and appends the plugin to the
    /// load order.
    pub fn mark_loaded(&self, name: &str, instance: Arc<dyn Plugin>) -> AppResult<()> {
        let mut inner = self.inner.write();
        let seq = inner.next_load_seq;
        let record = inner.find_mut(name)?;
        record.state.check_transition(name, PluginState::Loaded)?;
        record.state = PluginState::Loaded;
        record.instance = Some(instance);
        record.load_seq = Some(seq);
        record.loaded_at = Some(Utc::now());
        inner.next_load_seq += 1;
        Ok(())
    }

    /// Completes an unload, releasing the instance.
    pub fn mark_unloaded(&self, name: &str) -> AppResult<()> {
        let mut inner = self.inner.write();
        let record = inner.find_mut(name)?;
        record.state.check_transition(name, PluginState::Unloaded)?;
        record.state = PluginState::Unloaded;
        record.instance = None;
        record.load_seq = None;
        record.loaded_at = None;
        Ok(())
    }

    /// Swaps the definition used for future loads.
    pub fn replace_definition(&self, name: &str, definition: PluginDefinition) -> AppResult<()> {
        if definition.name() != name {
            return Err(AppError::plugin_registration(format!(
                "Replacement definition for '{name}' is named '{}'",
                definition.name()
            )));
        }
        let mut inner = self.inner.write();
        inner.find_mut(name)?.definition = definition;
        Ok(())
    }

    /// Names and declared dependencies, in registration order.
    pub fn dependency_nodes(&self) -> Vec<DependencyNode> {
        self.inner
            .read()
            .records
            .iter()
            .map(|r| {
                (
                    r.definition.name().to_string(),
                    r.definition.info.dependencies.clone(),
                )
            })
            .collect()
    }

    /// All plugin names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .records
            .iter()
            .map(|r| r.definition.name().to_string())
            .collect()
    }

    /// Names of loaded (enabled or disabled) plugins, in load order.
    pub fn loaded_names(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut loaded: Vec<(u64, String)> = inner
            .records
            .iter()
            .filter(|r| r.state.is_loaded())
            .filter_map(|r| r.load_seq.map(|seq| (seq, r.definition.name().to_string())))
            .collect();
        loaded.sort_by_key(|(seq, _)| *seq);
        loaded.into_iter().map(|(_, name)| name).collect()
    }

    /// Loaded plugins that declare a dependency on `name`.
    pub fn loaded_dependents(&self, name: &str) -> Vec<String> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| r.state.is_loaded())
            .filter(|r| r.definition.info.dependencies.iter().any(|d| d == name))
            .map(|r| r.definition.name().to_string())
            .collect()
    }

    /// Summary of one plugin, without hook patterns.
    pub fn summary(&self, name: &str) -> Option<PluginSummary> {
        self.inner.read().find(name).map(summarize)
    }

    /// Summaries of all plugins in registration order, without hook patterns.
    pub fn summaries(&self) -> Vec<PluginSummary> {
        self.inner.read().records.iter().map(summarize).collect()
    }

    /// Number of registered plugins.
    pub fn count(&self) -> usize {
        self.inner.read().records.len()
    }
}

fn summarize(record: &PluginRecord) -> PluginSummary {
    PluginSummary {
        info: record.definition.info.clone(),
        state: record.state,
        enabled: record.state == PluginState::Loaded,
        hooks: Vec::new(),
        loaded_at: record.loaded_at,
    }
}
