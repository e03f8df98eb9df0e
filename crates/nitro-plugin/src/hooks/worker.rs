//! Bounded workers for blocking hooks that carry a timeout.
//!
//! A timed blocking hook runs on its own named thread while the caller waits
//! on a channel with a deadline. On timeout the caller stops waiting; the
//! thread keeps running until the callback returns and only then frees its
//! slot. The slot limit caps how many such threads may exist at once.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use serde_json::Value;

use super::definitions::{BlockingFn, HookResult};

/// Why a worker run did not produce a handler result.
#[derive(Debug)]
pub(crate) enum WorkerFailure {
    /// The deadline passed first.
    TimedOut(Duration),
    /// The callback panicked.
    Panicked(String),
    /// Every slot is taken by running or abandoned workers.
    Saturated(usize),
    /// The OS refused to start a thread.
    Spawn(std::io::Error),
}

/// Holds one worker slot until dropped.
#[derive(Debug)]
pub(crate) struct WorkerSlot {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Pool accounting for timed blocking hooks.
#[derive(Debug)]
pub(crate) struct HookWorkers {
    in_flight: Arc<AtomicUsize>,
    limit: usize,
}

impl HookWorkers {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            limit: limit.max(1),
        }
    }

    /// Workers currently running, abandoned ones included.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn limit(&self) -> usize {
        self.limit
    }

    /// Claims a slot, or `None` when the limit is reached.
    pub(crate) fn acquire(&self) -> Option<WorkerSlot> {
        let limit = self.limit;
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < limit).then_some(n + 1)
            })
            .ok()
            .map(|_| WorkerSlot {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    /// Runs `callback` on a worker thread, waiting at most `timeout`.
    pub(crate) fn run(
        &self,
        callback: Arc<BlockingFn>,
        payload: Value,
        timeout: Duration,
    ) -> Result<HookResult, WorkerFailure> {
        let slot = self
            .acquire()
            .ok_or(WorkerFailure::Saturated(self.limit))?;
        let (tx, rx) = mpsc::sync_channel(1);

        std::thread::Builder::new()
            .name("nitro-hook".to_string())
            .spawn(move || {
                let _slot = slot;
                let result = panic::catch_unwind(AssertUnwindSafe(|| callback(&payload)));
                // The receiver is gone when the caller timed out.
                let _ = tx.send(result);
            })
            .map_err(WorkerFailure::Spawn)?;

        match rx.recv_timeout(timeout) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(panic)) => Err(WorkerFailure::Panicked(panic_message(panic.as_ref()))),
            Err(RecvTimeoutError::Timeout) => Err(WorkerFailure::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerFailure::Panicked(
                "worker exited without a result".to_string(),
            )),
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
