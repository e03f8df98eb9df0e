//! Per-plugin settings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque per-plugin configuration: `plugin name -> key -> value`.
///
/// The engine never interprets these values; plugins read them through a
/// scoped accessor keyed by their own name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginSettings {
    entries: Map<String, Value>,
}

impl PluginSettings {
    /// Creates empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from a JSON object. Non-object values yield empty settings.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(entries) => Self { entries },
            _ => Self::default(),
        }
    }

    /// Sets a single value for a plugin.
    pub fn with(mut self, plugin: &str, key: &str, value: Value) -> Self {
        self.set(plugin, key, value);
        self
    }

    /// Sets a single value for a plugin, creating its section if needed.
    pub fn set(&mut self, plugin: &str, key: &str, value: Value) {
        let section = self
            .entries
            .entry(plugin.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !section.is_object() {
            *section = Value::Object(Map::new());
        }
        if let Value::Object(map) = section {
            map.insert(key.to_string(), value);
        }
    }

    /// Looks up `settings[plugin][key]`.
    pub fn get(&self, plugin: &str, key: &str) -> Option<&Value> {
        self.entries.get(plugin).and_then(|section| section.get(key))
    }

    /// Looks up `settings[plugin][key]` and deserializes it, falling back to
    /// `default` when the key is absent or has an incompatible shape.
    pub fn get_or<T: DeserializeOwned>(&self, plugin: &str, key: &str, default: T) -> T {
        self.get(plugin, key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or(default)
    }

    /// Returns the whole section of one plugin, if any.
    pub fn section(&self, plugin: &str) -> Option<&Map<String, Value>> {
        self.entries.get(plugin).and_then(Value::as_object)
    }
}
