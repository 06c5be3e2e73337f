// SPDX-License-Identifier: MIT OR Apache-2.0
//! Portable documents: export a subgraph, import it into any graph.
//!
//! A document names nodes and sockets instead of using in-memory IDs, so it
//! can be written to disk and re-linked after import:
//! - [`export`] walks the root's dependency subgraph
//! - [`import`] recreates nodes, then links by name
//!
//! Import is additive. Records that cannot be honoured (an unknown socket,
//! a link whose endpoint is missing) are skipped; only a malformed document
//! is an error, and it is rejected before the graph is touched.

use crate::graph::Graph;
use crate::node::{Node, NodeId, NodeKind};
use crate::port::PortValue;
use crate::property::{self, PropertyValue};
use crate::ramp::{self, RampRecord};
use crate::resource::ResourcePools;
use crate::subgraph;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A serialized effect subgraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Format version
    pub version: u32,
    /// Graph type the document belongs to
    pub tree_type: String,
    /// Name of the root (entry) node
    pub root: String,
    /// Node records
    pub nodes: Vec<NodeRecord>,
    /// Link records
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

/// A serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node name, unique within the document
    pub name: String,
    /// User-facing label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Node type
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Layout position
    #[serde(default)]
    pub location: [f32; 2],
    /// Encoded properties
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
    /// Defaults of unlinked inputs
    #[serde(default)]
    pub inputs: Vec<InputRecord>,
    /// Owned color ramp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_ramp: Option<RampRecord>,
}

/// Default value of one input socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Socket name
    pub name: String,
    /// Encoded default
    pub default: PropertyValue,
}

/// A serialized link
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Source node name
    pub from_node: String,
    /// Source (output) socket name
    pub from_socket: String,
    /// Target node name
    pub to_node: String,
    /// Target (input) socket name
    pub to_socket: String,
}

impl Document {
    /// Current document format version
    pub const FORMAT_VERSION: u32 = 1;

    /// Tree type tag written to every document
    pub const TREE_TYPE: &'static str = "SwarmLightTree";

    /// Get a node record by name
    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Check the document can be imported
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.version == 0 || self.version > Self::FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion(self.version));
        }
        if self.tree_type != Self::TREE_TYPE {
            return Err(DocumentError::TreeTypeMismatch(self.tree_type.clone()));
        }
        let mut names = HashSet::new();
        for record in &self.nodes {
            if !names.insert(record.name.as_str()) {
                return Err(DocumentError::DuplicateNode(record.name.clone()));
            }
        }
        if !names.contains(self.root.as_str()) {
            return Err(DocumentError::MissingRoot(self.root.clone()));
        }
        Ok(())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON and validate
    pub fn from_json(s: &str) -> Result<Self, DocumentError> {
        let document: Self = serde_json::from_str(s)?;
        document.validate()?;
        Ok(document)
    }

    /// Save document to file
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load document from file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

/// Export the subgraph feeding `root`.
pub fn export(graph: &Graph, pools: &ResourcePools, root: NodeId) -> Result<Document, DocumentError> {
    let root_node = graph.node(root).ok_or(DocumentError::NodeNotFound(root))?;
    let members = subgraph::collect(graph, root);

    let nodes: Vec<NodeRecord> = members
        .iter()
        .filter_map(|id| graph.node(*id))
        .map(|node| node_record(graph, pools, node))
        .collect();

    let links: Vec<LinkRecord> = subgraph::internal_links(graph, &members)
        .into_iter()
        .filter_map(|link| {
            let from = graph.node(link.from_node)?;
            let to = graph.node(link.to_node)?;
            Some(LinkRecord {
                from_node: from.name.clone(),
                from_socket: from.port(&link.from_port)?.name.clone(),
                to_node: to.name.clone(),
                to_socket: to.port(&link.to_port)?.name.clone(),
            })
        })
        .collect();

    tracing::info!(
        "Exported '{}' ({} nodes, {} links)",
        root_node.name,
        nodes.len(),
        links.len()
    );

    Ok(Document {
        version: Document::FORMAT_VERSION,
        tree_type: Document::TREE_TYPE.to_string(),
        root: root_node.name.clone(),
        nodes,
        links,
    })
}

fn node_record(graph: &Graph, pools: &ResourcePools, node: &Node) -> NodeRecord {
    let inputs = node
        .inputs
        .iter()
        .filter(|port| graph.incoming_link(port.id).is_none())
        .filter_map(|port| {
            let default = port.default_value.as_ref()?.to_portable();
            if default.is_none() {
                tracing::debug!("Omitting default of {}.{} (not finite)", node.name, port.name);
            }
            Some(InputRecord {
                name: port.name.clone(),
                default: default?,
            })
        })
        .collect();

    NodeRecord {
        name: node.name.clone(),
        label: node.label.clone(),
        kind: node.kind,
        location: node.position,
        properties: property::encode_properties(node, pools),
        inputs,
        color_ramp: ramp::encode_ramp(node, pools),
    }
}

/// Import every node and link of `document` into `graph`.
///
/// Returns the created nodes keyed by their names in the document (the
/// graph may have renamed them to keep names unique).
pub fn import(
    graph: &mut Graph,
    pools: &mut ResourcePools,
    document: &Document,
) -> Result<IndexMap<String, NodeId>, DocumentError> {
    document.validate()?;

    let mut created = IndexMap::new();
    for record in &document.nodes {
        let node = build_node(record, pools);
        let id = graph.add_node(node);
        created.insert(record.name.clone(), id);
    }

    let mut linked = 0;
    for link in &document.links {
        let (Some(&from), Some(&to)) = (created.get(&link.from_node), created.get(&link.to_node)) else {
            tracing::warn!(
                "Skipping link {}.{} -> {}.{}: node not in document",
                link.from_node,
                link.from_socket,
                link.to_node,
                link.to_socket
            );
            continue;
        };
        match graph.connect_by_name(from, &link.from_socket, to, &link.to_socket) {
            Ok(_) => linked += 1,
            Err(e) => tracing::warn!(
                "Skipping link {}.{} -> {}.{}: {e}",
                link.from_node,
                link.from_socket,
                link.to_node,
                link.to_socket
            ),
        }
    }

    tracing::info!(
        "Imported '{}' ({} nodes, {}/{} links)",
        document.root,
        created.len(),
        linked,
        document.links.len()
    );
    Ok(created)
}

fn build_node(record: &NodeRecord, pools: &mut ResourcePools) -> Node {
    let mut node = Node::new(record.kind)
        .with_name(record.name.clone())
        .with_position(record.location[0], record.location[1]);
    node.label.clone_from(&record.label);

    property::apply_properties(&mut node, &record.properties, pools);

    for input in &record.inputs {
        let Some(port_type) = node.input(&input.name).map(|p| p.port_type) else {
            tracing::debug!("Node {} has no input '{}'", record.name, input.name);
            continue;
        };
        match PortValue::from_portable(port_type, &input.default) {
            Some(value) => {
                node.set_input_default(&input.name, value);
            }
            None => tracing::debug!(
                "Default for {}.{} does not fit a {:?} socket",
                record.name,
                input.name,
                port_type
            ),
        }
    }

    if let Some(ramp_record) = &record.color_ramp {
        if record.kind.owns_ramp() {
            ramp::apply_ramp(&mut node, ramp_record, pools);
        } else {
            tracing::debug!("Ignoring color ramp on {:?} node {}", record.kind, record.name);
        }
    }

    node
}

/// Error reading, validating or exporting a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document is not valid JSON or does not match the schema
    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    /// Format version this build cannot read
    #[error("Unsupported document version {0}")]
    UnsupportedVersion(u32),

    /// Document belongs to another tree type
    #[error("Document tree type '{0}' is not {expected}", expected = Document::TREE_TYPE)]
    TreeTypeMismatch(String),

    /// Two node records share a name
    #[error("Duplicate node name '{0}'")]
    DuplicateNode(String),

    /// Declared root is not among the node records
    #[error("Root node '{0}' is not in the document")]
    MissingRoot(String),

    /// Export root is not in the graph
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Value;

    const MINIMAL: &str = r#"{
        "version": 1,
        "tree_type": "SwarmLightTree",
        "root": "Output",
        "nodes": [
            {"name": "Output", "type": "output", "location": [0.0, 0.0]}
        ]
    }"#;

    #[test]
    fn test_parse_minimal_document() {
        let document = Document::from_json(MINIMAL).unwrap();
        assert_eq!(document.root, "Output");
        assert!(document.links.is_empty());
        assert_eq!(document.node("Output").unwrap().kind, NodeKind::Output);
    }

    #[test]
    fn test_validation_failures() {
        let mut document = Document::from_json(MINIMAL).unwrap();
        document.version = 2;
        assert!(matches!(document.validate(), Err(DocumentError::UnsupportedVersion(2))));

        let mut document = Document::from_json(MINIMAL).unwrap();
        document.tree_type = "ShaderNodeTree".to_string();
        assert!(matches!(document.validate(), Err(DocumentError::TreeTypeMismatch(_))));

        let mut document = Document::from_json(MINIMAL).unwrap();
        document.root = "Elsewhere".to_string();
        assert!(matches!(document.validate(), Err(DocumentError::MissingRoot(_))));

        let mut document = Document::from_json(MINIMAL).unwrap();
        document.nodes.push(document.nodes[0].clone());
        assert!(matches!(document.validate(), Err(DocumentError::DuplicateNode(_))));
    }

    #[test]
    fn test_unknown_node_type_is_malformed() {
        let json = MINIMAL.replace(r#""type": "output""#, r#""type": "teleporter""#);
        assert!(matches!(Document::from_json(&json), Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_invalid_document_leaves_graph_untouched() {
        let mut graph = Graph::new("Test");
        let mut pools = ResourcePools::new();
        let mut document = Document::from_json(MINIMAL).unwrap();
        document.root = "Missing".to_string();

        assert!(import(&mut graph, &mut pools, &document).is_err());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_export_writes_only_unlinked_defaults() {
        let mut graph = Graph::new("Test");
        let pools = ResourcePools::new();
        let value = graph.create_node(NodeKind::Value);
        let math = graph.add_node(
            Node::new(NodeKind::Math).with_input_default("B", PortValue::Float(5.0)),
        );
        graph.connect_by_name(value, "Value", math, "A").unwrap();

        let document = export(&graph, &pools, math).unwrap();
        let record = document.node("Math").unwrap();
        assert_eq!(
            record.inputs,
            vec![InputRecord { name: "B".to_string(), default: PropertyValue::Float(5.0) }]
        );
        assert_eq!(document.links.len(), 1);
        assert_eq!(document.root, "Math");
    }

    #[test]
    fn test_bad_link_records_are_skipped() {
        let mut document = Document::from_json(MINIMAL).unwrap();
        document.nodes.push(NodeRecord {
            name: "Value".to_string(),
            label: None,
            kind: NodeKind::Value,
            location: [-200.0, 0.0],
            properties: IndexMap::new(),
            inputs: Vec::new(),
            color_ramp: None,
        });
        let link = |from_node: &str, from_socket: &str, to_socket: &str| LinkRecord {
            from_node: from_node.to_string(),
            from_socket: from_socket.to_string(),
            to_node: "Output".to_string(),
            to_socket: to_socket.to_string(),
        };
        document.links = vec![
            link("Value", "Missing", "Intensity"),
            link("Ghost", "Value", "Intensity"),
            link("Value", "Color", "Intensity"),
            link("Value", "Value", "Intensity"),
        ];

        let mut graph = Graph::new("Test");
        let mut pools = ResourcePools::new();
        let created = import(&mut graph, &mut pools, &document).unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn test_non_finite_state_still_round_trips() {
        let mut graph = Graph::new("Test");
        let mut pools = ResourcePools::new();
        let value = graph.add_node(Node::new(NodeKind::Value).with_property("value", Value::Float(f32::NAN)));
        let math = graph.add_node(
            Node::new(NodeKind::Math).with_input_default("B", PortValue::Float(f32::INFINITY)),
        );
        let mut effect = Node::new(NodeKind::Effect);
        ramp::apply_ramp(
            &mut effect,
            &RampRecord {
                name: "Glow".to_string(),
                interpolation: Default::default(),
                color_mode: Default::default(),
                elements: vec![ramp::RampStopRecord { position: 0.0, color: [1.0; 4] }],
            },
            &mut pools,
        );
        let effect = graph.add_node(effect);
        if let Some(ramp) = pools.ramp_mut("Glow") {
            ramp.elements[0].position = f32::NAN;
            ramp.elements[0].color[1] = f32::NEG_INFINITY;
        }
        graph.connect_by_name(value, "Value", math, "A").unwrap();
        graph.connect_by_name(math, "Value", effect, "Factor").unwrap();

        let exported = export(&graph, &pools, effect).unwrap();
        let parsed = Document::from_json(&exported.to_json().unwrap()).unwrap();

        assert!(!parsed.node("Value").unwrap().properties.contains_key("value"));
        assert!(parsed.node("Math").unwrap().inputs.is_empty());
        let stop = parsed.node("Effect").unwrap().color_ramp.as_ref().unwrap().elements[0];
        assert_eq!(stop.position, 0.0);
        assert_eq!(stop.color, [1.0, 0.0, 1.0, 1.0]);
    }
}
