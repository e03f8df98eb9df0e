//! # nitro-dispatch
//!
//! In-process event and hook dispatch engine. Plugins register prioritized
//! hooks against dot-segmented event patterns and cooperatively transform a
//! shared JSON payload; a manager drives their dependency-ordered lifecycle.
//!
//! This crate re-exports the public surface of [`nitro_core`] and
//! [`nitro_plugin`].

pub use nitro_core::{
    AppError, AppResult, ErrorKind, ErrorStrategy, LoggingConfig, ManagerConfig, PluginSettings,
    logging::init_logging,
};
pub use nitro_plugin::{
    DependencyResolver, DiscoveryProvider, HookAction, HookCallback, HookDescriptor,
    HookDispatcher, HookRegistry, HookResult, Plugin, PluginCatalog, PluginContext,
    PluginDefinition, PluginInfo, PluginManager, PluginRegistry, PluginState, PluginSummary,
    ReloadSource, TriggerError, TriggerOutcome,
};

pub use nitro_core as core;
pub use nitro_plugin as plugin;
pub use nitro_plugin::{plugin_info, prelude};
