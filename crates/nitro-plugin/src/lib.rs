//! # nitro-plugin
//!
//! In-process event and plugin engine for Nitro Dispatch. Provides:
//!
//! - Dot-segmented event patterns with prefix and trailing wildcards
//! - Hook registry with priority-ordered bindings
//! - Dispatcher with blocking and async entry points, per-hook timeouts,
//!   stop-propagation, cancellation and configurable error strategies
//! - Dependency resolution with cycle and missing-dependency detection
//! - Plugin lifecycle management (register, load, enable/disable, unload,
//!   reload) with lifecycle events dispatched as ordinary events

pub mod api;
pub mod catalog;
pub mod hooks;
pub mod lifecycle;
pub mod macros;
pub mod manager;
pub mod prelude;
pub mod registry;
pub mod resolver;
pub mod traits;

pub use api::context::PluginContext;
pub use api::sources::{DiscoveryProvider, ReloadSource};
pub use catalog::PluginCatalog;
pub use hooks::definitions::{HookAction, HookCallback, HookDescriptor, HookResult};
pub use hooks::dispatcher::{HookDispatcher, TriggerError, TriggerOutcome};
pub use hooks::registry::HookRegistry;
pub use lifecycle::PluginState;
pub use manager::PluginManager;
pub use registry::{PluginRegistry, PluginSummary};
pub use resolver::DependencyResolver;
pub use traits::{Plugin, PluginDefinition, PluginInfo};
