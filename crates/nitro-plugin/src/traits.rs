//! Plugin authoring contract.
//!
//! A plugin is described by a [`PluginDefinition`]: static metadata plus a
//! factory producing a fresh [`Plugin`] instance. The manager calls the
//! factory on every load, so a reload always starts from a new instance.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use nitro_core::error::AppError;
use nitro_core::result::AppResult;

use crate::api::context::PluginContext;
use crate::hooks::definitions::{HookAction, HookCallback, HookDescriptor, HookResult};

/// Metadata describing a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PluginInfo {
    /// Unique plugin name.
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    /// Plugin version string.
    #[validate(length(min = 1, max = 64))]
    pub version: String,
    /// Plugin description.
    #[serde(default)]
    pub description: String,
    /// Author or maintainer.
    #[serde(default)]
    pub author: String,
    /// Names of plugins that must be loaded first.
    #[serde(default)]
    #[validate(custom(function = "validate_dependency_names"))]
    pub dependencies: Vec<String>,
}

impl PluginInfo {
    /// Creates metadata with a name and version; other fields empty.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            author: String::new(),
            dependencies: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Adds a dependency.
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Validates the metadata, mapping failures to a `VALIDATION` error.
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(|e| {
            AppError::validation(format!("Invalid metadata for plugin '{}': {e}", self.name))
        })
    }
}

fn validate_dependency_names(dependencies: &Vec<String>) -> Result<(), ValidationError> {
    if dependencies.iter().any(|d| d.trim().is_empty()) {
        return Err(ValidationError::new("empty_dependency_name"));
    }
    Ok(())
}

/// A live plugin instance.
///
/// `hooks` is read once per load, after `on_load` succeeds.
#[async_trait]
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Called once when the plugin is loaded, before its hooks are installed.
    async fn on_load(&self, _ctx: &PluginContext) -> AppResult<()> {
        Ok(())
    }

    /// Called when the plugin is unloaded, after its hooks are removed.
    async fn on_unload(&self) -> AppResult<()> {
        Ok(())
    }

    /// Called when one of the plugin's hooks, or its load/unload, fails.
    fn on_error(&self, _error: &AppError) {}

    /// Hooks this plugin installs.
    fn hooks(&self) -> Vec<HookDescriptor> {
        Vec::new()
    }
}

/// Constructs a fresh plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> AppResult<Arc<dyn Plugin>> + Send + Sync>;

/// Everything the manager needs to register and (re)construct a plugin.
#[derive(Clone)]
pub struct PluginDefinition {
    /// Plugin metadata.
    pub info: PluginInfo,
    /// Instance constructor.
    pub factory: PluginFactory,
}

impl PluginDefinition {
    /// Creates a definition from metadata and a fallible constructor.
    pub fn new<F>(info: PluginInfo, factory: F) -> Self
    where
        F: Fn() -> AppResult<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        Self {
            info,
            factory: Arc::new(factory),
        }
    }

    /// Creates a definition whose constructor cannot fail.
    pub fn from_fn<P, F>(info: PluginInfo, factory: F) -> Self
    where
        P: Plugin + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        Self::new(info, move || Ok(Arc::new(factory()) as Arc<dyn Plugin>))
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Builds a new instance.
    pub fn instantiate(&self) -> AppResult<Arc<dyn Plugin>> {
        (self.factory)()
    }
}

impl fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("info", &self.info)
            .field("factory", &"<factory>")
            .finish()
    }
}

/// Struct-based asynchronous hook handler.
#[async_trait]
pub trait HookHandler: Send + Sync + fmt::Debug {
    /// Handles the current payload.
    async fn handle(&self, payload: Value) -> HookResult;
}

/// Struct-based blocking hook handler.
pub trait BlockingHookHandler: Send + Sync + fmt::Debug {
    /// Handles the current payload.
    fn handle(&self, payload: &Value) -> HookResult;
}

impl HookCallback {
    /// Adapts an asynchronous handler object into a suspendable callback.
    pub fn from_handler(handler: Arc<dyn HookHandler>) -> Self {
        Self::suspendable(move |payload| {
            let handler = Arc::clone(&handler);
            async move { handler.handle(payload).await }
        })
    }

    /// Adapts a blocking handler object into a blocking callback.
    pub fn from_blocking_handler(handler: Arc<dyn BlockingHookHandler>) -> Self {
        Self::blocking(move |payload| handler.handle(payload))
    }

    /// A blocking callback that maps the payload to a new payload.
    pub fn map<F>(transform: F) -> Self
    where
        F: Fn(&Value) -> AppResult<Value> + Send + Sync + 'static,
    {
        Self::blocking(move |payload| transform(payload).map(HookAction::ContinueWith))
    }
}
