//! Hook system — patterns, bindings, registry and dispatcher.

pub mod definitions;
pub mod dispatcher;
pub mod pattern;
pub mod registry;
pub(crate) mod worker;

pub use definitions::{
    DEFAULT_PRIORITY, ExecutionMode, HookAction, HookBinding, HookCallback, HookDescriptor,
    HookResult,
};
pub use dispatcher::{ErrorListener, HookDispatcher, HookFailure, TriggerError, TriggerOutcome};
pub use pattern::{EventPattern, validate_event_name};
pub use registry::HookRegistry;
