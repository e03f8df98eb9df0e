//! Plugin manager — lifecycle management for all plugins.
//!
//! The manager ties the pieces together: the plugin table, the hook
//! registry and dispatcher, and dependency resolution. Lifecycle operations
//! (register, load, unload, reload, enable/disable, unregister) are
//! serialized by one async lock held for the whole operation. Triggers never
//! take that lock, so they keep running while plugins come and go.
//!
//! Lifecycle events (`plugin.*`, `app.*`) are dispatched through the same
//! dispatcher as any other event. Their hooks run while the lifecycle lock
//! is held and must not call lifecycle operations on the same manager.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use validator::Validate;

use nitro_core::config::{ManagerConfig, PluginSettings};
use nitro_core::error::{AppError, ErrorKind};
use nitro_core::result::AppResult;
use nitro_core::strategy::ErrorStrategy;

use crate::api::context::PluginContext;
use crate::api::sources::{DiscoveryProvider, ReloadSource};
use crate::hooks::definitions::{HookBinding, HookCallback, HookDescriptor};
use crate::hooks::dispatcher::{HookDispatcher, TriggerError, TriggerOutcome};
use crate::hooks::registry::HookRegistry;
use crate::hooks::worker::panic_message;
use crate::lifecycle::{
    APP_SHUTDOWN, APP_STARTUP, PLUGIN_ERROR, PLUGIN_LOADED, PLUGIN_REGISTERED, PLUGIN_UNLOADED,
    PLUGIN_UNREGISTERED, PluginState,
};
use crate::registry::{PluginRegistry, PluginSummary};
use crate::resolver::DependencyResolver;
use crate::traits::{Plugin, PluginDefinition};

/// Manages the full lifecycle of plugins and dispatches events to their hooks.
pub struct PluginManager {
    /// Plugin registry.
    plugin_registry: Arc<PluginRegistry>,
    /// Hook registry.
    hook_registry: Arc<HookRegistry>,
    /// Hook dispatcher.
    hook_dispatcher: Arc<HookDispatcher>,
    /// Per-plugin settings handed to plugins through their context.
    settings: Arc<PluginSettings>,
    /// Whether registration runs full metadata validation.
    validate_metadata: bool,
    /// Where `reload` fetches fresh definitions from.
    reload_source: RwLock<Option<Arc<dyn ReloadSource>>>,
    /// Serializes lifecycle operations.
    lifecycle: Mutex<()>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugin_registry", &self.plugin_registry)
            .field("hook_dispatcher", &self.hook_dispatcher)
            .field("validate_metadata", &self.validate_metadata)
            .field("reload_source", &self.reload_source.read().is_some())
            .finish()
    }
}

impl PluginManager {
    /// Creates a plugin manager with default configuration.
    pub fn new() -> Self {
        Self::build(ManagerConfig::default())
    }

    /// Creates a plugin manager from validated configuration.
    pub fn with_config(config: ManagerConfig) -> AppResult<Self> {
        config
            .validate()
            .map_err(|e| AppError::configuration(format!("Invalid manager configuration: {e}")))?;
        Ok(Self::build(config))
    }

    fn build(config: ManagerConfig) -> Self {
        let hook_registry = Arc::new(HookRegistry::new());
        let hook_dispatcher = Arc::new(HookDispatcher::new(
            Arc::clone(&hook_registry),
            config.error_strategy,
            config.max_hook_workers,
        ));
        hook_dispatcher.set_tracing(config.hook_tracing);

        let plugin_registry = Arc::new(PluginRegistry::new());
        let listener_registry = Arc::clone(&plugin_registry);
        hook_dispatcher.set_error_listener(Arc::new(move |owner: &str, error: &AppError| {
            if let Some(instance) = listener_registry.instance(owner) {
                instance.on_error(error);
            }
        }));

        info!(
            error_strategy = %config.error_strategy,
            max_hook_workers = config.max_hook_workers,
            hook_tracing = config.hook_tracing,
            "Plugin manager created"
        );

        Self {
            plugin_registry,
            hook_registry,
            hook_dispatcher,
            settings: Arc::new(config.plugins),
            validate_metadata: config.validate_metadata,
            reload_source: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Sets where `reload` fetches fresh plugin definitions from. Without a
    /// source, `reload` reuses the registered definition.
    pub fn set_reload_source(&self, source: Arc<dyn ReloadSource>) {
        *self.reload_source.write() = Some(source);
    }

    // ── Registration ───────────────────────────────────────────────

    /// Registers a plugin definition in the `Registered` state.
    pub async fn register(&self, definition: PluginDefinition) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.register_locked(definition).await
    }

    async fn register_locked(&self, definition: PluginDefinition) -> AppResult<()> {
        let info = &definition.info;
        if info.name.trim().is_empty() {
            return Err(AppError::validation("Plugin name must not be empty"));
        }
        if self.validate_metadata {
            info.check()?;
        }

        let name = info.name.clone();
        let version = info.version.clone();
        self.plugin_registry.insert(definition)?;
        // Hooks owned by a plugin stay out of dispatch until it is loaded.
        self.hook_registry.set_owner_active(&name, false);

        self.emit(
            PLUGIN_REGISTERED,
            json!({
                "plugin_name": name,
                "version": version,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        Ok(())
    }

    /// Removes a plugin, unloading it first if needed.
    pub async fn unregister(&self, name: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;

        let state = self
            .plugin_registry
            .state(name)
            .ok_or_else(|| not_registered(name))?;
        if state.is_loaded() {
            if let Err(e) = self.unload_one(name).await {
                warn!(plugin = %name, error = %e, "Unload failed during unregistration");
            }
        }

        self.hook_registry.unregister_owner(name);
        let definition = self.plugin_registry.remove(name)?;
        self.hook_registry.set_owner_active(name, true);

        self.emit(
            PLUGIN_UNREGISTERED,
            json!({
                "plugin_name": name,
                "version": definition.info.version,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        Ok(())
    }

    /// Registers every definition a discovery provider finds.
    ///
    /// Individual registration failures are logged and skipped. Returns the
    /// names that were registered.
    pub async fn discover_plugins(
        &self,
        provider: &dyn DiscoveryProvider,
        directory: &Path,
        pattern: &str,
        recursive: bool,
    ) -> AppResult<Vec<String>> {
        let definitions = provider.discover(directory, pattern, recursive)?;
        let _guard = self.lifecycle.lock().await;

        let mut registered = Vec::new();
        for definition in definitions {
            let name = definition.name().to_string();
            match self.register_locked(definition).await {
                Ok(()) => registered.push(name),
                Err(e) => {
                    warn!(plugin = %name, error = %e, "Skipping discovered plugin");
                }
            }
        }

        info!(
            directory = %directory.display(),
            pattern = %pattern,
            registered = registered.len(),
            "Plugin discovery complete"
        );
        Ok(registered)
    }

    // ── Loading ────────────────────────────────────────────────────

    /// Loads a plugin, loading its dependency closure first.
    ///
    /// Loading an already loaded (or disabled) plugin is a no-op.
    pub async fn load(&self, name: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.load_with_dependencies(name).await
    }

    /// Loads every registered plugin in dependency order.
    ///
    /// A dependency problem anywhere in the graph fails the call before
    /// anything is loaded. Individual failures follow the error strategy;
    /// plugins whose dependency failed in this pass are skipped. Returns the
    /// names loaded by this call.
    pub async fn load_all(&self) -> AppResult<Vec<String>> {
        let _guard = self.lifecycle.lock().await;

        let order = DependencyResolver::resolve(&self.plugin_registry.dependency_nodes())?;
        let strategy = self.hook_dispatcher.strategy();
        let mut loaded = Vec::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut failures = Vec::new();

        for name in order {
            if self
                .plugin_registry
                .state(&name)
                .is_some_and(PluginState::is_loaded)
            {
                continue;
            }

            let blocked_by = self.plugin_registry.definition(&name).and_then(|d| {
                d.info
                    .dependencies
                    .iter()
                    .find(|dep| failed.contains(dep.as_str()))
                    .cloned()
            });

            let result = match blocked_by {
                Some(dep) => Err(AppError::plugin_load(format!(
                    "Plugin '{name}' skipped: dependency '{dep}' failed to load"
                ))),
                None => self.load_one(&name).await,
            };

            match result {
                Ok(()) => loaded.push(name),
                Err(e) => {
                    failed.insert(name.clone());
                    match strategy {
                        ErrorStrategy::FailFast => return Err(e),
                        ErrorStrategy::LogAndContinue => {
                            warn!(plugin = %name, error = %e, "Continuing after plugin load failure");
                        }
                        ErrorStrategy::CollectAll => failures.push(e),
                    }
                }
            }
        }

        if !failures.is_empty() {
            return Err(AppError::aggregate(
                format!("{} plugin(s) failed to load", failures.len()),
                failures,
            ));
        }

        info!(loaded = loaded.len(), "All plugins loaded");
        Ok(loaded)
    }

    async fn load_with_dependencies(&self, name: &str) -> AppResult<()> {
        match self.plugin_registry.state(name) {
            None => return Err(not_registered(name)),
            Some(state) if state.is_loaded() => {
                debug!(plugin = %name, "Plugin already loaded");
                return Ok(());
            }
            Some(state) if !state.can_load() => {
                return Err(AppError::plugin_load(format!(
                    "Plugin '{name}' cannot be loaded from the {state} state"
                )));
            }
            Some(_) => {}
        }

        let order =
            DependencyResolver::resolve_closure(name, &self.plugin_registry.dependency_nodes())?;

        for plugin in &order {
            if self
                .plugin_registry
                .state(plugin)
                .is_some_and(PluginState::is_loaded)
            {
                continue;
            }
            if let Err(e) = self.load_one(plugin).await {
                if plugin == name {
                    return Err(e);
                }
                let mut err = AppError::plugin_load(format!(
                    "Plugin '{name}' cannot be loaded: dependency '{plugin}' failed"
                ));
                err.related.push(e);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Loads a single plugin whose dependencies are already loaded.
    async fn load_one(&self, name: &str) -> AppResult<()> {
        let definition = self
            .plugin_registry
            .definition(name)
            .ok_or_else(|| not_registered(name))?;

        if let Some(dep) = definition.info.dependencies.iter().find(|dep| {
            !self
                .plugin_registry
                .state(dep)
                .is_some_and(PluginState::is_loaded)
        }) {
            return Err(AppError::plugin_load(format!(
                "Plugin '{name}' requires '{dep}', which is not loaded"
            )));
        }

        self.plugin_registry.transition(name, PluginState::Loading)?;
        self.hook_registry.set_owner_active(name, false);
        info!(plugin = %name, version = %definition.info.version, "Loading plugin");

        let instance = match panic::catch_unwind(AssertUnwindSafe(|| definition.instantiate())) {
            Ok(Ok(instance)) => instance,
            Ok(Err(e)) => {
                let err = AppError::with_source(
                    ErrorKind::PluginLoad,
                    format!("Plugin '{name}' could not be constructed: {}", e.message),
                    e,
                );
                return self.fail(name, None, err).await;
            }
            Err(panic) => {
                let err = AppError::plugin_load(format!(
                    "Plugin '{name}' constructor panicked: {}",
                    panic_message(panic.as_ref())
                ));
                return self.fail(name, None, err).await;
            }
        };

        let ctx = PluginContext::new(
            name,
            Arc::clone(&self.settings),
            Arc::clone(&self.hook_dispatcher),
        );
        if let Err(e) = guarded(instance.on_load(&ctx)).await {
            let err = AppError::with_source(
                ErrorKind::PluginLoad,
                format!("Plugin '{name}' failed to load: {}", e.message),
                e,
            );
            return self.fail(name, Some(instance), err).await;
        }

        let descriptors = instance.hooks();
        let count = descriptors.len();
        for descriptor in descriptors {
            if let Err(e) = self.hook_registry.register(descriptor, Some(name)) {
                self.hook_registry.unregister_owner(name);
                // on_load has run; pair it with on_unload.
                if let Err(unload_err) = guarded(instance.on_unload()).await {
                    warn!(plugin = %name, error = %unload_err, "Unload after failed hook installation failed");
                }
                let err = AppError::with_source(
                    ErrorKind::PluginLoad,
                    format!("Plugin '{name}' declared an invalid hook: {}", e.message),
                    e,
                );
                return self.fail(name, Some(instance), err).await;
            }
        }

        self.plugin_registry.mark_loaded(name, instance)?;
        self.hook_registry.set_owner_active(name, true);
        info!(plugin = %name, hooks = count, "Plugin loaded");

        self.emit(
            PLUGIN_LOADED,
            json!({
                "plugin_name": name,
                "version": definition.info.version,
                "hooks": count,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        Ok(())
    }

    // ── Unloading ──────────────────────────────────────────────────

    /// Unloads a loaded or disabled plugin.
    pub async fn unload(&self, name: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.unload_one(name).await
    }

    /// Unloads every loaded plugin in reverse load order, applying the error
    /// strategy to failures. Returns the names unloaded.
    pub async fn unload_all(&self) -> AppResult<Vec<String>> {
        let _guard = self.lifecycle.lock().await;

        let strategy = self.hook_dispatcher.strategy();
        let mut unloaded = Vec::new();
        let mut failures = Vec::new();

        for name in self.plugin_registry.loaded_names().into_iter().rev() {
            match self.unload_one(&name).await {
                Ok(()) => unloaded.push(name),
                Err(e) => match strategy {
                    ErrorStrategy::FailFast => return Err(e),
                    ErrorStrategy::LogAndContinue => {
                        error!(plugin = %name, error = %e, "Error unloading plugin");
                    }
                    ErrorStrategy::CollectAll => failures.push(e),
                },
            }
        }

        if !failures.is_empty() {
            return Err(AppError::aggregate(
                format!("{} plugin(s) failed to unload", failures.len()),
                failures,
            ));
        }

        info!(unloaded = unloaded.len(), "All plugins unloaded");
        Ok(unloaded)
    }

    async fn unload_one(&self, name: &str) -> AppResult<()> {
        let state = self
            .plugin_registry
            .state(name)
            .ok_or_else(|| not_registered(name))?;
        if !state.is_loaded() {
            return Err(AppError::plugin_not_found(format!(
                "Plugin '{name}' is not loaded (state: {state})"
            )));
        }

        let dependents = self.plugin_registry.loaded_dependents(name);
        if !dependents.is_empty() {
            warn!(plugin = %name, dependents = ?dependents, "Unloading a plugin that loaded plugins depend on");
        }

        self.plugin_registry.transition(name, PluginState::Unloading)?;
        self.hook_registry.set_owner_active(name, false);
        let removed = self.hook_registry.unregister_owner(name);

        let instance = self.plugin_registry.instance(name);
        let unloaded = match &instance {
            Some(plugin) => guarded(plugin.on_unload()).await,
            None => Ok(()),
        };
        if let Err(e) = unloaded {
            let err = AppError::with_source(
                ErrorKind::PluginLoad,
                format!("Plugin '{name}' failed to unload: {}", e.message),
                e,
            );
            return self.fail(name, instance, err).await;
        }

        self.plugin_registry.mark_unloaded(name)?;
        info!(plugin = %name, hooks_removed = removed, "Plugin unloaded");

        self.emit(
            PLUGIN_UNLOADED,
            json!({
                "plugin_name": name,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        Ok(())
    }

    /// Replaces a plugin with a fresh instance under the same name.
    ///
    /// The new definition comes from the reload source when one is set. All
    /// bindings of the old instance are removed before the new one loads.
    pub async fn reload(&self, name: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;

        let state = self
            .plugin_registry
            .state(name)
            .ok_or_else(|| not_registered(name))?;
        if !(state.is_loaded() || state.can_load()) {
            return Err(AppError::plugin_load(format!(
                "Plugin '{name}' cannot be reloaded from the {state} state"
            )));
        }

        let source = self.reload_source.read().clone();
        let fresh = match source {
            Some(source) => Some(source.fetch(name)?),
            None => None,
        };

        info!(plugin = %name, fresh_definition = fresh.is_some(), "Reloading plugin");

        if state.is_loaded() {
            self.unload_one(name).await?;
        }
        if let Some(definition) = fresh {
            self.plugin_registry.replace_definition(name, definition)?;
        }
        self.load_with_dependencies(name).await
    }

    /// Moves a plugin to `Failed`, notifies it and emits `plugin.error`.
    async fn fail(
        &self,
        name: &str,
        instance: Option<Arc<dyn Plugin>>,
        err: AppError,
    ) -> AppResult<()> {
        self.plugin_registry.mark_failed(name);
        self.hook_registry.unregister_owner(name);

        if let Some(plugin) = instance {
            if panic::catch_unwind(AssertUnwindSafe(|| plugin.on_error(&err))).is_err() {
                warn!(plugin = %name, "Error handler panicked");
            }
        }

        error!(plugin = %name, kind = %err.kind, error = %err, "Plugin failed");
        self.emit(
            PLUGIN_ERROR,
            json!({
                "plugin_name": name,
                "error": err.to_string(),
                "kind": err.kind.to_string(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        Err(err)
    }

    // ── Enable / disable ───────────────────────────────────────────

    /// Re-activates a disabled plugin's hooks.
    pub async fn enable_plugin(&self, name: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;
        match self.plugin_registry.state(name) {
            None => Err(not_registered(name)),
            Some(PluginState::Loaded) => Ok(()),
            Some(PluginState::Disabled) => {
                self.plugin_registry.transition(name, PluginState::Loaded)?;
                self.hook_registry.set_owner_active(name, true);
                info!(plugin = %name, "Plugin enabled");
                Ok(())
            }
            Some(state) => Err(AppError::plugin_not_found(format!(
                "Plugin '{name}' is not loaded (state: {state})"
            ))),
        }
    }

    /// Excludes a loaded plugin's hooks from dispatch without removing them.
    pub async fn disable_plugin(&self, name: &str) -> AppResult<()> {
        let _guard = self.lifecycle.lock().await;
        match self.plugin_registry.state(name) {
            None => Err(not_registered(name)),
            Some(PluginState::Disabled) => Ok(()),
            Some(PluginState::Loaded) => {
                self.plugin_registry.transition(name, PluginState::Disabled)?;
                self.hook_registry.set_owner_active(name, false);
                info!(plugin = %name, "Plugin disabled");
                Ok(())
            }
            Some(state) => Err(AppError::plugin_not_found(format!(
                "Plugin '{name}' is not loaded (state: {state})"
            ))),
        }
    }

    // ── Application lifecycle ──────────────────────────────────────

    /// Loads all plugins, then emits `app.startup`.
    pub async fn start(&self) -> AppResult<Vec<String>> {
        let loaded = self.load_all().await?;
        self.emit(
            APP_STARTUP,
            json!({
                "plugins": self.plugin_registry.loaded_names(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        Ok(loaded)
    }

    /// Emits `app.shutdown`, then unloads all plugins in reverse load order.
    pub async fn shutdown(&self) -> AppResult<Vec<String>> {
        self.emit(
            APP_SHUTDOWN,
            json!({
                "plugins": self.plugin_registry.loaded_names(),
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )
        .await;
        self.unload_all().await
    }

    async fn emit(&self, event: &str, payload: Value) {
        match self.hook_dispatcher.trigger_async(event, payload).await {
            Ok(outcome) if outcome.executed > 0 => {
                debug!(event = %event, executed = outcome.executed, "Lifecycle event dispatched");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(event = %event, error = %e, "Lifecycle event hooks failed");
            }
        }
    }

    // ── Hooks and triggers ─────────────────────────────────────────

    /// Registers a single hook, optionally owned by a plugin.
    pub fn register_hook(
        &self,
        descriptor: HookDescriptor,
        owner: Option<&str>,
    ) -> AppResult<Arc<HookBinding>> {
        self.hook_registry.register(descriptor, owner)
    }

    /// Removes a hook registered with this pattern, callback and owner.
    pub fn unregister_hook(&self, event: &str, callback: &HookCallback, owner: Option<&str>) -> bool {
        self.hook_registry.unregister(event, callback, owner)
    }

    /// Runs a trigger on the calling thread.
    pub fn trigger(&self, event: &str, payload: Value) -> Result<TriggerOutcome, TriggerError> {
        self.hook_dispatcher.trigger(event, payload)
    }

    /// Runs a trigger on the async path.
    pub async fn trigger_async(
        &self,
        event: &str,
        payload: Value,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.hook_dispatcher.trigger_async(event, payload).await
    }

    /// Runs a trigger on the async path until `cancel` fires.
    pub async fn trigger_async_with_cancel(
        &self,
        event: &str,
        payload: Value,
        cancel: &CancellationToken,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.hook_dispatcher
            .trigger_async_with_cancel(event, payload, cancel)
            .await
    }

    /// Sets the error strategy used by triggers and lifecycle batches.
    pub fn set_error_strategy(&self, strategy: ErrorStrategy) {
        self.hook_dispatcher.set_strategy(strategy);
    }

    /// Returns the current error strategy.
    pub fn error_strategy(&self) -> ErrorStrategy {
        self.hook_dispatcher.strategy()
    }

    /// Turns per-hook timing records on or off.
    pub fn enable_hook_tracing(&self, enabled: bool) {
        self.hook_dispatcher.set_tracing(enabled);
    }

    // ── Introspection ──────────────────────────────────────────────

    /// Summary of one plugin.
    pub fn get_plugin(&self, name: &str) -> Option<PluginSummary> {
        self.plugin_registry.summary(name).map(|mut summary| {
            summary.hooks = self.hook_registry.patterns_for_owner(name);
            summary
        })
    }

    /// Summaries of all plugins, in registration order.
    pub fn get_all_plugins(&self) -> Vec<PluginSummary> {
        self.plugin_registry
            .summaries()
            .into_iter()
            .map(|mut summary| {
                summary.hooks = self.hook_registry.patterns_for_owner(&summary.info.name);
                summary
            })
            .collect()
    }

    /// Names of all registered plugins, in registration order.
    pub fn get_registered_names(&self) -> Vec<String> {
        self.plugin_registry.names()
    }

    /// Names of loaded plugins, in load order.
    pub fn get_loaded_names(&self) -> Vec<String> {
        self.plugin_registry.loaded_names()
    }

    /// Whether a plugin is loaded (enabled or disabled).
    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugin_registry
            .state(name)
            .is_some_and(PluginState::is_loaded)
    }

    /// Current lifecycle state of a plugin.
    pub fn plugin_state(&self, name: &str) -> Option<PluginState> {
        self.plugin_registry.state(name)
    }

    /// Every pattern that currently has hooks.
    pub fn get_events(&self) -> Vec<String> {
        self.hook_registry.events()
    }

    /// Reads `config[plugin][key]`.
    pub fn get_plugin_config(&self, plugin: &str, key: &str) -> Option<Value> {
        self.settings.get(plugin, key).cloned()
    }

    /// Returns the hook dispatcher.
    pub fn dispatcher(&self) -> &Arc<HookDispatcher> {
        &self.hook_dispatcher
    }

    /// Returns the hook registry.
    pub fn hook_registry(&self) -> &Arc<HookRegistry> {
        &self.hook_registry
    }

    /// Returns the plugin registry.
    pub fn plugin_registry(&self) -> &Arc<PluginRegistry> {
        &self.plugin_registry
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

fn not_registered(name: &str) -> AppError {
    AppError::plugin_not_found(format!("Plugin '{name}' is not registered"))
}

/// Awaits a plugin callback, turning a panic into an error.
async fn guarded<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(AppError::plugin_load(format!(
            "panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}
