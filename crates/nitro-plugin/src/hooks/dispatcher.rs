//! Hook dispatcher — runs the matching hooks of a trigger in order.
//!
//! Both entry points share one algorithm:
//! - Take a snapshot of the active bindings matching the event.
//! - Call each binding in turn with the current payload; `ContinueWith`
//!   replaces the payload for the next hook.
//! - `Halt` ends the trigger immediately with `stopped = true`, whatever the
//!   error strategy.
//! - A failure or timeout is handled by the error strategy read at the start
//!   of the trigger.
//!
//! Hooks of one trigger never run concurrently with each other.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use nitro_core::error::{AppError, ErrorKind};
use nitro_core::strategy::ErrorStrategy;

use super::definitions::{CallbackKind, ExecutionMode, HookAction, HookBinding};
use super::pattern::validate_event_name;
use super::registry::HookRegistry;
use super::worker::{HookWorkers, WorkerFailure, panic_message};

/// Receives every hook failure together with the owning plugin's name.
pub type ErrorListener = Arc<dyn Fn(&str, &AppError) + Send + Sync>;

/// A single hook failure recorded during a trigger.
#[derive(Debug, Clone)]
pub struct HookFailure {
    /// Owning plugin, `None` for anonymous hooks.
    pub plugin: Option<String>,
    /// Pattern of the failing binding.
    pub pattern: String,
    /// The wrapped failure.
    pub error: AppError,
}

/// Result of dispatching one trigger.
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    /// The concrete event that was triggered.
    pub event: String,
    /// Final payload (or the payload at the point of stopping/aborting).
    pub payload: Value,
    /// Whether a hook halted propagation.
    pub stopped: bool,
    /// Halt reason (if stopped).
    pub stop_reason: Option<String>,
    /// Plugin that halted (if stopped by an owned hook).
    pub stopped_by: Option<String>,
    /// Whether the trigger was cancelled before all hooks ran.
    pub cancelled: bool,
    /// Number of hooks that ran to a result; an abandoned hook is not counted.
    pub executed: usize,
    /// Failures recorded under the active error strategy.
    pub errors: Vec<HookFailure>,
}

impl TriggerOutcome {
    fn new(event: &str, payload: Value) -> Self {
        Self {
            event: event.to_string(),
            payload,
            stopped: false,
            stop_reason: None,
            stopped_by: None,
            cancelled: false,
            executed: 0,
            errors: Vec::new(),
        }
    }

    /// Whether no hook failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes the outcome, returning the final payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// A trigger that ended in failure under `FailFast` or `CollectAll`.
///
/// The outcome still carries the payload reached before the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TriggerError {
    /// The single (FailFast) or aggregate (CollectAll) error.
    #[source]
    pub error: AppError,
    /// Outcome at the point of failure.
    pub outcome: TriggerOutcome,
}

impl TriggerError {
    /// Kind of the carried error.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind
    }
}

impl From<TriggerError> for AppError {
    fn from(err: TriggerError) -> Self {
        err.error
    }
}

/// Why a single invocation did not produce an action.
#[derive(Debug)]
enum Failure {
    Returned(AppError),
    TimedOut(Duration),
    Panicked(String),
    Rejected(String),
}

impl From<WorkerFailure> for Failure {
    fn from(failure: WorkerFailure) -> Self {
        match failure {
            WorkerFailure::TimedOut(timeout) => Self::TimedOut(timeout),
            WorkerFailure::Panicked(message) => Self::Panicked(message),
            WorkerFailure::Saturated(limit) => Self::Rejected(format!(
                "all {limit} hook workers are busy"
            )),
            WorkerFailure::Spawn(err) => Self::Rejected(format!(
                "could not start hook worker: {err}"
            )),
        }
    }
}

enum Step {
    Next,
    Stop,
    Abort,
}

/// Mutable state of one trigger in progress.
struct Run {
    strategy: ErrorStrategy,
    outcome: TriggerOutcome,
    abort: Option<AppError>,
}

/// Dispatches triggers to the hooks held by a [`HookRegistry`].
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
    /// Current error strategy, read once per trigger.
    strategy: RwLock<ErrorStrategy>,
    /// Per-hook timing records.
    tracing: AtomicBool,
    /// Workers for timed blocking hooks.
    workers: HookWorkers,
    /// Failure notification hook.
    listener: RwLock<Option<ErrorListener>>,
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("registry", &self.registry)
            .field("strategy", &*self.strategy.read())
            .field("tracing", &self.tracing.load(Ordering::Relaxed))
            .field("workers", &self.workers)
            .finish()
    }
}

impl HookDispatcher {
    /// Creates a dispatcher over the given registry.
    pub fn new(registry: Arc<HookRegistry>, strategy: ErrorStrategy, max_workers: usize) -> Self {
        Self {
            registry,
            strategy: RwLock::new(strategy),
            tracing: AtomicBool::new(false),
            workers: HookWorkers::new(max_workers),
            listener: RwLock::new(None),
        }
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Replaces the error strategy. Triggers already running keep theirs.
    pub fn set_strategy(&self, strategy: ErrorStrategy) {
        let previous = std::mem::replace(&mut *self.strategy.write(), strategy);
        info!(from = %previous, to = %strategy, "Error strategy changed");
    }

    /// Returns the current error strategy.
    pub fn strategy(&self) -> ErrorStrategy {
        *self.strategy.read()
    }

    /// Turns per-hook timing records on or off.
    pub fn set_tracing(&self, enabled: bool) {
        self.tracing.store(enabled, Ordering::Relaxed);
        debug!(enabled, "Hook tracing toggled");
    }

    /// Whether per-hook timing records are on.
    pub fn tracing_enabled(&self) -> bool {
        self.tracing.load(Ordering::Relaxed)
    }

    /// Timed blocking workers currently alive and the configured limit.
    pub fn worker_usage(&self) -> (usize, usize) {
        (self.workers.in_flight(), self.workers.limit())
    }

    /// Installs the listener told about every hook failure of an owned hook.
    pub fn set_error_listener(&self, listener: ErrorListener) {
        *self.listener.write() = Some(listener);
    }

    /// Runs a trigger on the calling thread.
    ///
    /// Fails with a `HOOK` error, without running anything, when a
    /// suspendable hook matches the event.
    pub fn trigger(&self, event: &str, payload: Value) -> Result<TriggerOutcome, TriggerError> {
        let mut run = self.begin(event, payload)?;
        let bindings = self.registry.snapshot(event);

        if let Some(binding) = bindings
            .iter()
            .find(|b| b.mode() == ExecutionMode::Suspendable)
        {
            let error = AppError::hook(format!(
                "Event '{event}' matched suspendable hook '{}' from plugin '{}'; use trigger_async",
                binding.pattern,
                binding.owner_label()
            ));
            return Err(TriggerError {
                error,
                outcome: run.outcome,
            });
        }

        if !bindings.is_empty() {
            debug!(event = %event, hook_count = bindings.len(), "Dispatching event");
        }

        for binding in &bindings {
            let started = Instant::now();
            let result = self.invoke_blocking(binding, &run.outcome.payload);
            match self.settle(&mut run, binding, result, started) {
                Step::Next => {}
                Step::Stop | Step::Abort => break,
            }
        }

        self.finish(run)
    }

    /// Runs a trigger on the async path.
    ///
    /// Suspendable hooks are awaited; blocking hooks are called in-line,
    /// or on the blocking pool when they carry a timeout.
    pub async fn trigger_async(
        &self,
        event: &str,
        payload: Value,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.run_async(event, payload, None).await
    }

    /// Like [`trigger_async`](Self::trigger_async), but stops once `cancel`
    /// fires. The hook in progress is abandoned and the outcome carries the
    /// payload it was given.
    pub async fn trigger_async_with_cancel(
        &self,
        event: &str,
        payload: Value,
        cancel: &CancellationToken,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.run_async(event, payload, Some(cancel)).await
    }

    async fn run_async(
        &self,
        event: &str,
        payload: Value,
        cancel: Option<&CancellationToken>,
    ) -> Result<TriggerOutcome, TriggerError> {
        let mut run = self.begin(event, payload)?;
        let bindings = self.registry.snapshot(event);

        if !bindings.is_empty() {
            debug!(event = %event, hook_count = bindings.len(), "Dispatching event (async)");
        }

        for binding in &bindings {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                info!(
                    event = %event,
                    executed = run.outcome.executed,
                    remaining = bindings.len() - run.outcome.executed,
                    "Trigger cancelled"
                );
                run.outcome.cancelled = true;
                break;
            }

            let started = Instant::now();
            let invocation = self.invoke_async(binding, &run.outcome.payload);
            let result = match cancel {
                Some(token) => tokio::select! {
                    result = invocation => Some(result),
                    _ = token.cancelled() => None,
                },
                None => Some(invocation.await),
            };

            // Cancelled mid-hook: abandon it and keep the payload it received.
            let Some(result) = result else {
                warn!(
                    event = %event,
                    pattern = %binding.pattern,
                    plugin = %binding.owner_label(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Trigger cancelled, abandoning hook in progress"
                );
                run.outcome.cancelled = true;
                break;
            };

            match self.settle(&mut run, binding, result, started) {
                Step::Next => {}
                Step::Stop | Step::Abort => break,
            }
        }

        self.finish(run)
    }

    fn begin(&self, event: &str, payload: Value) -> Result<Run, TriggerError> {
        let outcome = TriggerOutcome::new(event, payload);
        if let Err(error) = validate_event_name(event) {
            return Err(TriggerError { error, outcome });
        }
        Ok(Run {
            strategy: self.strategy(),
            outcome,
            abort: None,
        })
    }

    fn invoke_blocking(&self, binding: &HookBinding, payload: &Value) -> Result<HookAction, Failure> {
        let CallbackKind::Blocking(callback) = &binding.callback.kind else {
            return Err(Failure::Rejected(
                "suspendable hook invoked from the blocking path".to_string(),
            ));
        };

        match binding.timeout {
            None => match panic::catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(result) => result.map_err(Failure::Returned),
                Err(panic) => Err(Failure::Panicked(panic_message(panic.as_ref()))),
            },
            Some(timeout) => {
                match self.workers.run(Arc::clone(callback), payload.clone(), timeout) {
                    Ok(result) => result.map_err(Failure::Returned),
                    Err(failure) => Err(failure.into()),
                }
            }
        }
    }

    async fn invoke_async(&self, binding: &HookBinding, payload: &Value) -> Result<HookAction, Failure> {
        match &binding.callback.kind {
            CallbackKind::Suspendable(callback) => {
                let future = panic::catch_unwind(AssertUnwindSafe(|| callback(payload.clone())))
                    .map_err(|panic| Failure::Panicked(panic_message(panic.as_ref())))?;
                let guarded = AssertUnwindSafe(future).catch_unwind();

                let joined = match binding.timeout {
                    Some(timeout) => tokio::time::timeout(timeout, guarded)
                        .await
                        .map_err(|_| Failure::TimedOut(timeout))?,
                    None => guarded.await,
                };

                match joined {
                    Ok(result) => result.map_err(Failure::Returned),
                    Err(panic) => Err(Failure::Panicked(panic_message(panic.as_ref()))),
                }
            }
            CallbackKind::Blocking(callback) => match binding.timeout {
                None => self.invoke_blocking(binding, payload),
                Some(timeout) => {
                    let slot = self.workers.acquire().ok_or_else(|| {
                        Failure::from(WorkerFailure::Saturated(self.workers.limit()))
                    })?;
                    let callback = Arc::clone(callback);
                    let payload = payload.clone();
                    let handle = tokio::task::spawn_blocking(move || {
                        let _slot = slot;
                        callback(&payload)
                    });

                    match tokio::time::timeout(timeout, handle).await {
                        Ok(Ok(result)) => result.map_err(Failure::Returned),
                        Ok(Err(join_err)) if join_err.is_panic() => Err(Failure::Panicked(
                            panic_message(join_err.into_panic().as_ref()),
                        )),
                        Ok(Err(join_err)) => Err(Failure::Rejected(format!(
                            "hook worker was cancelled: {join_err}"
                        ))),
                        Err(_) => Err(Failure::TimedOut(timeout)),
                    }
                }
            },
        }
    }

    /// Applies one invocation result to the run.
    fn settle(
        &self,
        run: &mut Run,
        binding: &HookBinding,
        result: Result<HookAction, Failure>,
        started: Instant,
    ) -> Step {
        run.outcome.executed += 1;

        if self.tracing_enabled() {
            debug!(
                event = %run.outcome.event,
                pattern = %binding.pattern,
                plugin = %binding.owner_label(),
                priority = binding.priority,
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                ok = result.is_ok(),
                "Hook executed"
            );
        }

        match result {
            Ok(HookAction::Continue) => Step::Next,
            Ok(HookAction::ContinueWith(payload)) => {
                run.outcome.payload = payload;
                Step::Next
            }
            Ok(HookAction::Halt { payload, reason }) => {
                info!(
                    event = %run.outcome.event,
                    pattern = %binding.pattern,
                    plugin = %binding.owner_label(),
                    reason = %reason,
                    "Hook stopped propagation"
                );
                if let Some(payload) = payload {
                    run.outcome.payload = payload;
                }
                run.outcome.stopped = true;
                run.outcome.stop_reason = Some(reason);
                run.outcome.stopped_by = binding.owner.clone();
                Step::Stop
            }
            Err(failure) => {
                let error = wrap_failure(binding, failure);
                error!(
                    event = %run.outcome.event,
                    pattern = %binding.pattern,
                    plugin = %binding.owner_label(),
                    kind = %error.kind,
                    strategy = %run.strategy,
                    error = %error,
                    "Hook failed"
                );
                self.notify(binding, &error);

                run.outcome.errors.push(HookFailure {
                    plugin: binding.owner.clone(),
                    pattern: binding.pattern.as_str().to_string(),
                    error: error.clone(),
                });

                if run.strategy == ErrorStrategy::FailFast {
                    run.abort = Some(error);
                    Step::Abort
                } else {
                    Step::Next
                }
            }
        }
    }

    fn finish(&self, run: Run) -> Result<TriggerOutcome, TriggerError> {
        let Run {
            strategy,
            outcome,
            abort,
        } = run;

        if let Some(error) = abort {
            return Err(TriggerError { error, outcome });
        }

        if strategy == ErrorStrategy::CollectAll && !outcome.errors.is_empty() {
            let error = AppError::aggregate(
                format!(
                    "{} hook(s) failed while handling '{}'",
                    outcome.errors.len(),
                    outcome.event
                ),
                outcome.errors.iter().map(|f| f.error.clone()).collect(),
            );
            return Err(TriggerError { error, outcome });
        }

        Ok(outcome)
    }

    fn notify(&self, binding: &HookBinding, error: &AppError) {
        let Some(owner) = binding.owner.as_deref() else {
            return;
        };
        let Some(listener) = self.listener.read().clone() else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| listener(owner, error))).is_err() {
            warn!(plugin = %owner, "Error handler panicked");
        }
    }
}

fn wrap_failure(binding: &HookBinding, failure: Failure) -> AppError {
    let pattern = &binding.pattern;
    let owner = binding.owner_label();
    match failure {
        Failure::Returned(err) if err.kind == ErrorKind::HookTimeout => err,
        Failure::Returned(err) => AppError::with_source(
            ErrorKind::Hook,
            format!("Hook '{pattern}' from plugin '{owner}' failed: {}", err.message),
            err,
        ),
        Failure::TimedOut(timeout) => AppError::hook_timeout(format!(
            "Hook '{pattern}' from plugin '{owner}' exceeded its {}ms timeout",
            timeout.as_millis()
        )),
        Failure::Panicked(message) => AppError::hook(format!(
            "Hook '{pattern}' from plugin '{owner}' panicked: {message}"
        )),
        Failure::Rejected(message) => AppError::hook(format!(
            "Hook '{pattern}' from plugin '{owner}' could not run: {message}"
        )),
    }
}
