// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output registry and activity tracking.
//!
//! Output nodes are listed by priority, then by name. Each scene keeps a
//! cached copy of that list together with a selection index; the cache is
//! reconciled against the graph either directly or, from a read-only pass,
//! through a deferred sync request on the [`RuntimeContext`].

use crate::context::RuntimeContext;
use crate::evaluation::{Evaluator, OutputSignal, SceneSampler};
use crate::graph::Graph;
use crate::node::{NodeId, NodeKind};
use crate::resource::ResourcePools;
use indexmap::IndexMap;

/// An output node as seen by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEntry {
    /// Node handle
    pub node: NodeId,
    /// Node name
    pub name: String,
    /// Priority, lower first
    pub priority: i32,
    /// Display label
    pub label: String,
}

/// Output nodes of `graph` ordered by (priority, name)
pub fn list_outputs(graph: &Graph) -> Vec<OutputEntry> {
    let mut entries: Vec<OutputEntry> = graph
        .nodes()
        .filter(|n| n.kind == NodeKind::Output)
        .map(|n| OutputEntry {
            node: n.id,
            name: n.name.clone(),
            priority: n.int_property("priority").unwrap_or(0),
            label: n.display_label().to_string(),
        })
        .collect();

    entries.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
    entries
}

/// One row of a scene's cached output list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputListItem {
    /// Output node name
    pub name: String,
    /// Display label
    pub label: String,
}

/// Per-scene output list cache and selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneOutputs {
    /// Scene name, the key for deferred syncs
    pub scene: String,
    /// Selected row
    pub active_index: usize,
    /// Cached rows
    pub items: Vec<OutputListItem>,
}

impl SceneOutputs {
    /// Create an empty cache for `scene`
    pub fn new(scene: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            ..Default::default()
        }
    }

    /// Name of the selected output
    pub fn selected(&self) -> Option<&str> {
        self.items.get(self.active_index).map(|i| i.name.as_str())
    }
}

fn current_items(graph: &Graph) -> Vec<OutputListItem> {
    list_outputs(graph)
        .into_iter()
        .map(|e| OutputListItem {
            name: e.name,
            label: e.label,
        })
        .collect()
}

/// Whether the scene's cached list differs from the graph's outputs
pub fn needs_sync(scene: &SceneOutputs, graph: &Graph) -> bool {
    scene.items != current_items(graph) || (!scene.items.is_empty() && scene.active_index >= scene.items.len())
}

/// Reconcile the scene's cached list and selection with the graph.
///
/// The selection follows the previously selected output by name; if that
/// output is gone the old index is clamped into range. Returns whether
/// anything changed.
pub fn sync_outputs(scene: &mut SceneOutputs, graph: &Graph) -> bool {
    let items = current_items(graph);
    let previous = scene.selected().map(str::to_string);

    let index = match previous.and_then(|name| items.iter().position(|i| i.name == name)) {
        Some(index) => index,
        None => scene.active_index.min(items.len().saturating_sub(1)),
    };

    let changed = items != scene.items || index != scene.active_index;
    if changed {
        tracing::debug!(
            "Synced outputs for {}: {} items, selected {}",
            scene.scene,
            items.len(),
            index
        );
    }
    scene.items = items;
    scene.active_index = index;
    changed
}

/// Read-only variant of [`sync_outputs`]: if the cache is stale, schedule a
/// sync on the context instead of writing. Returns whether a new request was
/// queued.
pub fn request_sync(scene: &SceneOutputs, graph: &Graph, ctx: &mut RuntimeContext) -> bool {
    needs_sync(scene, graph) && ctx.request_sync(scene.scene.as_str())
}

/// Evaluate every output once at `frame`, in registry order.
///
/// An output that fails to evaluate is logged and maps to `None`.
pub fn evaluate_outputs(
    graph: &Graph,
    pools: &ResourcePools,
    frame: i32,
    ctx: &mut RuntimeContext,
    sampler: &dyn SceneSampler,
) -> IndexMap<String, Option<OutputSignal>> {
    let mut evaluator = Evaluator::new(graph, pools, sampler, frame);
    list_outputs(graph)
        .into_iter()
        .map(|entry| {
            let signal = match evaluator.evaluate_output(entry.node, ctx) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    tracing::warn!("Failed to evaluate {}: {e}", entry.name);
                    None
                }
            };
            (entry.name, signal)
        })
        .collect()
}

/// Record which of the already evaluated outputs are active at `frame`.
///
/// A failed evaluation counts as inactive.
pub fn record_activity(
    ctx: &mut RuntimeContext,
    frame: i32,
    signals: &IndexMap<String, Option<OutputSignal>>,
) -> IndexMap<String, bool> {
    let activity: IndexMap<String, bool> = signals
        .iter()
        .map(|(name, signal)| (name.clone(), signal.is_some_and(|s| s.is_active())))
        .collect();
    ctx.set_activity(frame, activity.clone());
    activity
}

/// Evaluate every output at `frame` and record which ones are active
pub fn track_activity(
    graph: &Graph,
    pools: &ResourcePools,
    frame: i32,
    ctx: &mut RuntimeContext,
    sampler: &dyn SceneSampler,
) -> IndexMap<String, bool> {
    let signals = evaluate_outputs(graph, pools, frame, ctx, sampler);
    record_activity(ctx, frame, &signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EmptyScene;
    use crate::node::Node;
    use crate::port::PortValue;
    use crate::property::Value;

    fn output(graph: &mut Graph, name: &str, priority: i32) -> NodeId {
        graph.add_node(
            Node::new(NodeKind::Output)
                .with_name(name)
                .with_property("priority", Value::Int(priority)),
        )
    }

    #[test]
    fn test_list_outputs_orders_by_priority_then_name() {
        let mut graph = Graph::new("Test");
        output(&mut graph, "b", 2);
        output(&mut graph, "a", 1);
        output(&mut graph, "c", 1);
        graph.create_node(NodeKind::Value);

        let names: Vec<_> = list_outputs(&graph).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sync_keeps_selection_by_name() {
        let mut graph = Graph::new("Test");
        output(&mut graph, "b", 0);
        output(&mut graph, "c", 0);
        let mut scene = SceneOutputs::new("Scene");
        assert!(sync_outputs(&mut scene, &graph));
        scene.active_index = 1;
        assert_eq!(scene.selected(), Some("c"));

        output(&mut graph, "a", 0);
        assert!(needs_sync(&scene, &graph));
        assert!(sync_outputs(&mut scene, &graph));
        assert_eq!(scene.selected(), Some("c"));
        assert_eq!(scene.active_index, 2);
        assert!(!sync_outputs(&mut scene, &graph));
    }

    #[test]
    fn test_sync_clamps_when_selection_vanishes() {
        let mut graph = Graph::new("Test");
        output(&mut graph, "a", 0);
        let b = output(&mut graph, "b", 0);
        let mut scene = SceneOutputs::new("Scene");
        sync_outputs(&mut scene, &graph);
        scene.active_index = 1;

        graph.remove_node(b);
        sync_outputs(&mut scene, &graph);
        assert_eq!(scene.active_index, 0);
        assert_eq!(scene.selected(), Some("a"));

        graph = Graph::new("Empty");
        sync_outputs(&mut scene, &graph);
        assert_eq!(scene.active_index, 0);
        assert_eq!(scene.selected(), None);
    }

    #[test]
    fn test_request_sync_defers_and_coalesces() {
        let mut graph = Graph::new("Test");
        output(&mut graph, "a", 0);
        let mut scene = SceneOutputs::new("Scene");
        let mut ctx = RuntimeContext::new();

        assert!(request_sync(&scene, &graph, &mut ctx));
        assert!(!request_sync(&scene, &graph, &mut ctx));
        // Nothing written until the queue is drained
        assert!(scene.items.is_empty());

        for name in ctx.take_pending_syncs() {
            assert_eq!(name, scene.scene);
            sync_outputs(&mut scene, &graph);
        }
        assert_eq!(scene.items.len(), 1);
        assert!(!request_sync(&scene, &graph, &mut ctx));
    }

    #[test]
    fn test_track_activity() {
        let mut graph = Graph::new("Test");
        let lit = output(&mut graph, "lit", 0);
        output(&mut graph, "dark", 0);
        graph
            .node_mut(lit)
            .unwrap()
            .set_input_default("Intensity", PortValue::Float(0.5));

        let mut ctx = RuntimeContext::new();
        let activity = track_activity(&graph, &ResourcePools::new(), 4, &mut ctx, &EmptyScene);
        assert_eq!(activity.get("lit"), Some(&true));
        assert_eq!(activity.get("dark"), Some(&false));
        assert_eq!(ctx.activity_frame(), Some(4));
        assert!(ctx.is_active("lit"));
    }
}
