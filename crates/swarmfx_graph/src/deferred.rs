// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot deferred tasks, coalesced per key.
//!
//! Code running in a read-only pass (drawing, iteration) schedules work here
//! instead of mutating state inline; the host drains the queue once per loop
//! tick. Scheduling a key that is already pending is a no-op, and a drained
//! task is gone: there is no cancellation.

use indexmap::IndexSet;
use std::hash::Hash;

/// Queue of pending task keys
#[derive(Debug, Clone)]
pub struct DeferredQueue<K> {
    pending: IndexSet<K>,
}

impl<K: Eq + Hash> DeferredQueue<K> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            pending: IndexSet::new(),
        }
    }

    /// Schedule `key`. Returns `false` if it was already pending.
    pub fn schedule(&mut self, key: K) -> bool {
        self.pending.insert(key)
    }

    /// Whether `key` is waiting to run
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains(key)
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending key in scheduling order
    pub fn drain(&mut self) -> Vec<K> {
        self.pending.drain(..).collect()
    }

    /// Drop all pending tasks
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<K: Eq + Hash> Default for DeferredQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
