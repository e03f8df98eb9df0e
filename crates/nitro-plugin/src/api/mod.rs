//! Plugin API — the context handed to plugins and the collaborators that
//! supply plugin definitions.

pub mod context;
pub mod sources;

pub use context::PluginContext;
pub use sources::{DiscoveryProvider, ReloadSource};
