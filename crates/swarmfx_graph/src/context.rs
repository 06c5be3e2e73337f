// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-session runtime state.
//!
//! Everything that outlives a single evaluation lives in a
//! [`RuntimeContext`] owned by the host and passed into every runtime call:
//! cache node stores, the last activity snapshot and pending output-list
//! syncs. It starts empty and is cleared when the graph is torn down.

use crate::deferred::DeferredQueue;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Value stored by a cache node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// Scalar value
    pub value: f32,
    /// Color value
    pub color: [f32; 4],
    /// Frame the entry was written at
    pub frame: i32,
}

/// Session state shared by evaluation, activity tracking and output sync
#[derive(Debug, Default)]
pub struct RuntimeContext {
    caches: HashMap<String, CacheEntry>,
    activity: IndexMap<String, bool>,
    activity_frame: Option<i32>,
    pending_syncs: DeferredQueue<String>,
}

impl RuntimeContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cache entry under `name`
    pub fn store_cache(&mut self, name: &str, entry: CacheEntry) {
        self.caches.insert(name.to_string(), entry);
    }

    /// Entry last stored under `name`
    pub fn load_cache(&self, name: &str) -> Option<&CacheEntry> {
        self.caches.get(name)
    }

    /// Number of named cache entries
    pub fn cache_count(&self) -> usize {
        self.caches.len()
    }

    /// Activity of each output node at the last tracked frame
    pub fn activity(&self) -> &IndexMap<String, bool> {
        &self.activity
    }

    /// Frame of the last activity snapshot
    pub fn activity_frame(&self) -> Option<i32> {
        self.activity_frame
    }

    /// Whether the named output was active at the last tracked frame
    pub fn is_active(&self, output: &str) -> bool {
        self.activity.get(output).copied().unwrap_or(false)
    }

    pub(crate) fn set_activity(&mut self, frame: i32, activity: IndexMap<String, bool>) {
        self.activity = activity;
        self.activity_frame = Some(frame);
    }

    /// Ask for the named scene's output list to be synced at the next idle
    /// point. Returns `false` if a sync is already pending.
    pub fn request_sync(&mut self, scene: impl Into<String>) -> bool {
        self.pending_syncs.schedule(scene.into())
    }

    /// Whether a sync is waiting for `scene`
    pub fn has_pending_sync(&self, scene: &str) -> bool {
        self.pending_syncs.is_pending(&scene.to_string())
    }

    /// Take every pending sync request. Called once per host tick.
    pub fn take_pending_syncs(&mut self) -> Vec<String> {
        self.pending_syncs.drain()
    }

    /// Drop all session state (graph teardown)
    pub fn teardown(&mut self) {
        self.caches.clear();
        self.activity.clear();
        self.activity_frame = None;
        self.pending_syncs.clear();
    }
}
