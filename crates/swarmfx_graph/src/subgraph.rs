// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dependency subgraph extraction.

use crate::graph::Graph;
use crate::link::Link;
use crate::node::NodeId;
use indexmap::IndexSet;

/// Collect `root` and every node it transitively depends on.
///
/// Dependencies are followed depth-first through each input's incoming
/// link, in socket order. Every node appears once, even for diamond shapes
/// or cycles. A missing root yields an empty set.
pub fn collect(graph: &Graph, root: NodeId) -> IndexSet<NodeId> {
    let mut visited = IndexSet::new();
    if graph.node(root).is_some() {
        visit(graph, root, &mut visited);
    }
    visited
}

fn visit(graph: &Graph, node_id: NodeId, visited: &mut IndexSet<NodeId>) {
    if !visited.insert(node_id) {
        return;
    }
    let Some(node) = graph.node(node_id) else {
        return;
    };

    // Visit all nodes that this node depends on
    for input in &node.inputs {
        if let Some(link) = graph.incoming_link(input.id) {
            visit(graph, link.from_node, visited);
        }
    }
}

/// Links whose endpoints both lie in `nodes`, in graph order
pub fn internal_links<'a>(graph: &'a Graph, nodes: &IndexSet<NodeId>) -> Vec<&'a Link> {
    graph
        .links()
        .filter(|l| nodes.contains(&l.from_node) && nodes.contains(&l.to_node))
        .collect()
}
