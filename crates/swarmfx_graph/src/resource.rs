// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named resource pools shared by every graph in a session.
//!
//! Resources are owned by the host scene; the graph only keeps handles to
//! them. Names are the stable handle across documents, [`ResourceId`]s are
//! not.

use crate::ramp::ColorRamp;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pooled resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub Uuid);

impl ResourceId {
    /// Create a new random resource ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of host resource a property can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Collection of scene objects (a drone group)
    Collection,
    /// Single scene object
    Object,
    /// Mesh data block
    Mesh,
    /// Image
    Image,
    /// Text block
    Text,
}

/// A named resource entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource name, unique per kind
    pub name: String,
}

/// Pools of named resources plus the color ramp pool
#[derive(Debug, Clone, Default)]
pub struct ResourcePools {
    resources: IndexMap<ResourceId, Resource>,
    ramps: IndexMap<String, ColorRamp>,
}

impl ResourcePools {
    /// Create empty pools
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, returning the existing handle if one with the
    /// same kind and name is already pooled
    pub fn insert(&mut self, kind: ResourceKind, name: impl Into<String>) -> ResourceId {
        let name = name.into();
        if let Some(id) = self.lookup(kind, &name) {
            return id;
        }
        let id = ResourceId::new();
        self.resources.insert(id, Resource { kind, name });
        id
    }

    /// Find a resource by kind and name
    pub fn lookup(&self, kind: ResourceKind, name: &str) -> Option<ResourceId> {
        self.resources
            .iter()
            .find(|(_, r)| r.kind == kind && r.name == name)
            .map(|(id, _)| *id)
    }

    /// Get a resource by handle
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    /// Remove a resource. Handles held by nodes become stale.
    pub fn remove(&mut self, id: ResourceId) -> Option<Resource> {
        self.resources.shift_remove(&id)
    }

    /// Iterate over pooled resources of one kind
    pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources
            .iter()
            .filter(move |(_, r)| r.kind == kind)
            .map(|(id, r)| (*id, r))
    }

    /// Get a ramp by name
    pub fn ramp(&self, name: &str) -> Option<&ColorRamp> {
        self.ramps.get(name)
    }

    /// Get a mutable ramp by name
    pub fn ramp_mut(&mut self, name: &str) -> Option<&mut ColorRamp> {
        self.ramps.get_mut(name)
    }

    /// Get the ramp called `name`, creating a default one if absent
    pub fn ensure_ramp(&mut self, name: &str) -> &mut ColorRamp {
        self.ramps
            .entry(name.to_string())
            .or_insert_with(ColorRamp::new)
    }

    /// Remove a ramp
    pub fn remove_ramp(&mut self, name: &str) -> Option<ColorRamp> {
        self.ramps.shift_remove(name)
    }

    /// Names of all pooled ramps
    pub fn ramp_names(&self) -> impl Iterator<Item = &str> {
        self.ramps.keys().map(String::as_str)
    }

    /// First ramp name derived from `base` that is not in use
    pub fn unique_ramp_name(&self, base: &str) -> String {
        crate::graph::unique_name(base, |candidate| self.ramps.contains_key(candidate))
    }
}
