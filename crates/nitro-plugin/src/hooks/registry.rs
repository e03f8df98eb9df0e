//! Hook registry — bindings grouped by compiled pattern, priority-ordered.
//!
//! Mutation takes the write lock; [`HookRegistry::snapshot`] holds the read
//! lock only long enough to copy the matching bindings, so triggers execute
//! outside any lock and concurrent (un)registration cannot disturb an
//! in-flight trigger.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use nitro_core::error::AppError;

use super::definitions::{HookBinding, HookCallback, HookDescriptor};
use super::pattern::EventPattern;

/// All bindings registered under one pattern, kept sorted.
#[derive(Debug)]
struct Bucket {
    pattern: EventPattern,
    bindings: Vec<Arc<HookBinding>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Buckets in first-registration order.
    buckets: Vec<Bucket>,
    /// Owners whose bindings are currently excluded from snapshots.
    inactive_owners: HashSet<String>,
    /// Next registration sequence number.
    next_sequence: u64,
}

impl RegistryState {
    fn is_active(&self, binding: &HookBinding) -> bool {
        binding
            .owner
            .as_ref()
            .is_none_or(|owner| !self.inactive_owners.contains(owner))
    }
}

/// Registry of hook bindings organized by event pattern.
#[derive(Debug, Default)]
pub struct HookRegistry {
    state: RwLock<RegistryState>,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles the descriptor's pattern and installs a binding for it.
    pub fn register(
        &self,
        descriptor: HookDescriptor,
        owner: Option<&str>,
    ) -> Result<Arc<HookBinding>, AppError> {
        let pattern = EventPattern::compile(&descriptor.event)?;

        let mut state = self.state.write();
        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let binding = Arc::new(HookBinding {
            pattern,
            priority: descriptor.priority,
            timeout: descriptor.timeout,
            owner: owner.map(str::to_string),
            callback: descriptor.callback,
            sequence,
        });

        let index = match state
            .buckets
            .iter()
            .position(|b| b.pattern == binding.pattern)
        {
            Some(index) => index,
            None => {
                state.buckets.push(Bucket {
                    pattern: binding.pattern.clone(),
                    bindings: Vec::new(),
                });
                state.buckets.len() - 1
            }
        };

        let bindings = &mut state.buckets[index].bindings;
        let key = binding.order_key();
        let position = bindings.partition_point(|b| b.order_key() <= key);
        bindings.insert(position, Arc::clone(&binding));

        debug!(
            pattern = %binding.pattern,
            owner = %binding.owner_label(),
            priority = binding.priority,
            timeout_ms = binding.timeout.map(|t| t.as_millis() as u64),
            mode = %binding.mode(),
            "Hook registered"
        );

        Ok(binding)
    }

    /// Removes the binding with this pattern, callback and owner.
    ///
    /// Returns whether anything was removed.
    pub fn unregister(&self, pattern: &str, callback: &HookCallback, owner: Option<&str>) -> bool {
        let mut state = self.state.write();
        let Some(index) = state
            .buckets
            .iter()
            .position(|b| b.pattern.as_str() == pattern)
        else {
            return false;
        };

        let bindings = &mut state.buckets[index].bindings;
        let before = bindings.len();
        bindings.retain(|b| !(b.callback.same_as(callback) && b.owner.as_deref() == owner));
        let removed = bindings.len() < before;

        if bindings.is_empty() {
            state.buckets.remove(index);
        }

        if removed {
            debug!(pattern = %pattern, owner = ?owner, "Hook unregistered");
        }
        removed
    }

    /// Removes every binding owned by `owner`. Returns the number removed.
    pub fn unregister_owner(&self, owner: &str) -> usize {
        let mut state = self.state.write();
        let mut removed = 0;

        for bucket in &mut state.buckets {
            let before = bucket.bindings.len();
            bucket
                .bindings
                .retain(|b| b.owner.as_deref() != Some(owner));
            removed += before - bucket.bindings.len();
        }

        // Remove empty pattern entries
        state.buckets.retain(|b| !b.bindings.is_empty());

        info!(plugin = %owner, removed, "All hooks unregistered for plugin");
        removed
    }

    /// Includes or excludes an owner's bindings from snapshots without
    /// touching the bindings themselves.
    pub fn set_owner_active(&self, owner: &str, active: bool) {
        let mut state = self.state.write();
        if active {
            state.inactive_owners.remove(owner);
        } else {
            state.inactive_owners.insert(owner.to_string());
        }
    }

    /// Whether an owner's bindings currently take part in snapshots.
    pub fn is_owner_active(&self, owner: &str) -> bool {
        !self.state.read().inactive_owners.contains(owner)
    }

    /// Active bindings matching a concrete event, in execution order:
    /// priority descending, registration order ascending.
    pub fn snapshot(&self, event: &str) -> Vec<Arc<HookBinding>> {
        self.collect(event, true)
    }

    /// All bindings matching an event, including inactive ones.
    pub fn hooks_for(&self, event: &str) -> Vec<Arc<HookBinding>> {
        self.collect(event, false)
    }

    fn collect(&self, event: &str, active_only: bool) -> Vec<Arc<HookBinding>> {
        let mut matched: Vec<Arc<HookBinding>> = {
            let state = self.state.read();
            state
                .buckets
                .iter()
                .filter(|bucket| bucket.pattern.matches(event))
                .flat_map(|bucket| bucket.bindings.iter())
                .filter(|binding| !active_only || state.is_active(binding))
                .cloned()
                .collect()
        };

        matched.sort_by_key(|b| b.order_key());
        matched
    }

    /// Whether any active binding matches the event.
    pub fn has_handlers(&self, event: &str) -> bool {
        !self.snapshot(event).is_empty()
    }

    /// Returns every registered pattern, in first-registration order.
    pub fn events(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .buckets
            .iter()
            .map(|b| b.pattern.as_str().to_string())
            .collect()
    }

    /// Returns the patterns of every binding owned by `owner`.
    pub fn patterns_for_owner(&self, owner: &str) -> Vec<String> {
        let state = self.state.read();
        state
            .buckets
            .iter()
            .flat_map(|bucket| bucket.bindings.iter())
            .filter(|b| b.owner.as_deref() == Some(owner))
            .map(|b| b.pattern.as_str().to_string())
            .collect()
    }

    /// Total number of installed bindings.
    pub fn binding_count(&self) -> usize {
        let state = self.state.read();
        state.buckets.iter().map(|b| b.bindings.len()).sum()
    }

    /// Removes every binding registered under exactly this pattern.
    pub fn clear_event(&self, pattern: &str) -> usize {
        let mut state = self.state.write();
        let Some(index) = state
            .buckets
            .iter()
            .position(|b| b.pattern.as_str() == pattern)
        else {
            return 0;
        };
        let removed = state.buckets.remove(index).bindings.len();
        debug!(pattern = %pattern, removed, "Cleared all hooks for pattern");
        removed
    }

    /// Removes every binding.
    pub fn clear_all(&self) {
        let mut state = self.state.write();
        state.buckets.clear();
        debug!("Cleared all hooks");
    }
}
