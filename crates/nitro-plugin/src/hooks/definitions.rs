//! Hook callbacks, descriptors and bindings.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nitro_core::error::AppError;

use super::pattern::EventPattern;

/// Default hook priority. Higher runs earlier.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Action returned by a hook handler telling the dispatcher what to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HookAction {
    /// Keep the current payload and run the next hook.
    Continue,
    /// Replace the payload and run the next hook.
    ContinueWith(Value),
    /// Stop propagation. No further hooks run for this trigger.
    Halt {
        /// Final payload; `None` keeps the payload the hook received.
        payload: Option<Value>,
        /// Reason for halting.
        reason: String,
    },
}

impl HookAction {
    /// Stop propagation after replacing the payload.
    pub fn halt_with(payload: Value, reason: impl Into<String>) -> Self {
        Self::Halt {
            payload: Some(payload),
            reason: reason.into(),
        }
    }

    /// Stop propagation, keeping the payload unchanged.
    pub fn halt(reason: impl Into<String>) -> Self {
        Self::Halt {
            payload: None,
            reason: reason.into(),
        }
    }
}

/// Result returned from a hook handler invocation.
pub type HookResult = Result<HookAction, AppError>;

/// How a hook must be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Plain function call; usable from both trigger paths.
    Blocking,
    /// Returns a future; only usable from the asynchronous trigger path.
    Suspendable,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::Suspendable => write!(f, "suspendable"),
        }
    }
}

pub(crate) type BlockingFn = dyn Fn(&Value) -> HookResult + Send + Sync;
pub(crate) type SuspendableFn = dyn Fn(Value) -> BoxFuture<'static, HookResult> + Send + Sync;

#[derive(Clone)]
pub(crate) enum CallbackKind {
    Blocking(Arc<BlockingFn>),
    Suspendable(Arc<SuspendableFn>),
}

/// A shared, cheaply clonable hook callback.
///
/// The execution mode is fixed by the constructor. Clones share identity:
/// unregistering with any clone removes the binding created from another.
#[derive(Clone)]
pub struct HookCallback {
    pub(crate) kind: CallbackKind,
}

impl HookCallback {
    /// Wraps a blocking function of the current payload.
    pub fn blocking<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> HookResult + Send + Sync + 'static,
    {
        Self {
            kind: CallbackKind::Blocking(Arc::new(handler)),
        }
    }

    /// Wraps an asynchronous function of the current payload.
    pub fn suspendable<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        Self {
            kind: CallbackKind::Suspendable(Arc::new(
                move |payload: Value| -> BoxFuture<'static, HookResult> {
                    Box::pin(handler(payload))
                },
            )),
        }
    }

    /// Returns the execution mode of this callback.
    pub fn mode(&self) -> ExecutionMode {
        match self.kind {
            CallbackKind::Blocking(_) => ExecutionMode::Blocking,
            CallbackKind::Suspendable(_) => ExecutionMode::Suspendable,
        }
    }

    /// Whether both handles refer to the same underlying callback.
    pub fn same_as(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    fn identity(&self) -> *const () {
        match &self.kind {
            CallbackKind::Blocking(f) => Arc::as_ptr(f) as *const (),
            CallbackKind::Suspendable(f) => Arc::as_ptr(f) as *const (),
        }
    }
}

impl fmt::Debug for HookCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCallback")
            .field("mode", &self.mode())
            .field("handler", &"<callback>")
            .finish()
    }
}

/// Declarative hook request, as returned by [`Plugin::hooks`](crate::traits::Plugin::hooks)
/// or passed to the manager's `register_hook`.
#[derive(Debug, Clone)]
pub struct HookDescriptor {
    /// Event pattern the hook subscribes to.
    pub event: String,
    /// The callback.
    pub callback: HookCallback,
    /// Priority (higher = runs earlier).
    pub priority: i32,
    /// Optional execution deadline.
    pub timeout: Option<Duration>,
}

impl HookDescriptor {
    /// Creates a descriptor with default priority and no timeout.
    pub fn new(event: impl Into<String>, callback: HookCallback) -> Self {
        Self {
            event: event.into(),
            callback,
            priority: DEFAULT_PRIORITY,
            timeout: None,
        }
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the execution deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An installed hook. Immutable once created.
#[derive(Debug, Clone)]
pub struct HookBinding {
    /// Compiled event pattern.
    pub pattern: EventPattern,
    /// Priority (higher = earlier).
    pub priority: i32,
    /// Optional execution deadline.
    pub timeout: Option<Duration>,
    /// Owning plugin name, looked up on demand. `None` for anonymous hooks.
    pub owner: Option<String>,
    /// The callback.
    pub callback: HookCallback,
    /// Registration sequence number; breaks priority ties.
    pub sequence: u64,
}

impl HookBinding {
    /// Returns the execution mode of the callback.
    pub fn mode(&self) -> ExecutionMode {
        self.callback.mode()
    }

    /// Owner name for logs and error messages.
    pub fn owner_label(&self) -> &str {
        self.owner.as_deref().unwrap_or("anonymous")
    }

    /// Total order key: priority descending, then registration order.
    pub(crate) fn order_key(&self) -> (std::cmp::Reverse<i32>, u64) {
        (std::cmp::Reverse(self.priority), self.sequence)
    }
}
