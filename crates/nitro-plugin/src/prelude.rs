//! Prelude for convenient imports.

pub use async_trait::async_trait;
pub use serde_json::{Value, json};

pub use nitro_core::error::{AppError, ErrorKind};
pub use nitro_core::result::AppResult;
pub use nitro_core::strategy::ErrorStrategy;

pub use crate::api::context::PluginContext;
pub use crate::hooks::definitions::{HookAction, HookCallback, HookDescriptor, HookResult};
pub use crate::traits::{BlockingHookHandler, HookHandler, Plugin, PluginDefinition, PluginInfo};

pub use crate::plugin_info;
