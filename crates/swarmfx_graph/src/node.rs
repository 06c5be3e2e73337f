// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the effect graph.

use crate::graph::FrameId;
use crate::ops::{BlendMode, CacheMode, EffectType, MathOperation};
use crate::port::{Port, PortId, PortType, PortValue};
use crate::property::{PropertyDef, PropertyKind, Value};
use crate::resource::ResourceKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node.
///
/// Transient: documents and the output registry use [`Node::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed catalogue of node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Constant value and color
    Value,
    /// Scalar math operation
    Math,
    /// Color blend operation
    Blend,
    /// Frame-driven effect generator, optionally shaped by a ramp
    Effect,
    /// Named store/load of a value across evaluations
    Cache,
    /// Sample of a scene collection
    CollectionInfo,
    /// Sample of a scene object's mesh
    MeshInfo,
    /// LED output channel
    Output,
}

impl NodeKind {
    /// Every node kind, in catalogue order
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Value,
            NodeKind::Math,
            NodeKind::Blend,
            NodeKind::Effect,
            NodeKind::Cache,
            NodeKind::CollectionInfo,
            NodeKind::MeshInfo,
            NodeKind::Output,
        ]
    }

    /// Default display name, also the base for generated node names
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Value => "Value",
            NodeKind::Math => "Math",
            NodeKind::Blend => "Blend",
            NodeKind::Effect => "Effect",
            NodeKind::Cache => "Cache",
            NodeKind::CollectionInfo => "Collection Info",
            NodeKind::MeshInfo => "Mesh Info",
            NodeKind::Output => "Output",
        }
    }

    /// Whether nodes of this kind carry a color ramp
    pub fn owns_ramp(&self) -> bool {
        matches!(self, NodeKind::Effect)
    }

    /// Declared input sockets
    pub fn inputs(&self) -> Vec<Port> {
        match self {
            NodeKind::Value | NodeKind::CollectionInfo | NodeKind::MeshInfo => vec![],
            NodeKind::Math => vec![
                Port::input("A", PortType::Float).with_default(PortValue::Float(0.0)),
                Port::input("B", PortType::Float).with_default(PortValue::Float(0.0)),
            ],
            NodeKind::Blend => vec![
                Port::input("Factor", PortType::Float).with_default(PortValue::Float(1.0)),
                Port::input("A", PortType::Color).with_default(PortValue::Color([0.0, 0.0, 0.0, 1.0])),
                Port::input("B", PortType::Color).with_default(PortValue::Color([1.0, 1.0, 1.0, 1.0])),
            ],
            NodeKind::Effect => vec![
                Port::input("Factor", PortType::Float).with_default(PortValue::Float(0.0)),
            ],
            NodeKind::Cache => vec![
                Port::input("Value", PortType::Float).with_default(PortValue::Float(0.0)),
                Port::input("Color", PortType::Color).with_default(PortValue::Color([0.0, 0.0, 0.0, 1.0])),
            ],
            NodeKind::Output => vec![
                Port::input("Color", PortType::Color).with_default(PortValue::Color([1.0, 1.0, 1.0, 1.0])),
                Port::input("Intensity", PortType::Float).with_default(PortValue::Float(0.0)),
            ],
        }
    }

    /// Declared output sockets
    pub fn outputs(&self) -> Vec<Port> {
        match self {
            NodeKind::Math => vec![Port::output("Value", PortType::Float)],
            NodeKind::Blend => vec![Port::output("Color", PortType::Color)],
            NodeKind::Value
            | NodeKind::Effect
            | NodeKind::Cache
            | NodeKind::CollectionInfo
            | NodeKind::MeshInfo => vec![
                Port::output("Value", PortType::Float),
                Port::output("Color", PortType::Color),
            ],
            NodeKind::Output => vec![],
        }
    }

    /// Declared property schema
    pub fn properties(&self) -> Vec<PropertyDef> {
        match self {
            NodeKind::Value => vec![
                PropertyDef::new("value", PropertyKind::Float, Value::Float(0.0)),
                PropertyDef::new("color", PropertyKind::Color, Value::Color([1.0, 1.0, 1.0, 1.0])),
            ],
            NodeKind::Math => vec![
                PropertyDef::new(
                    "operation",
                    PropertyKind::Enum(MathOperation::NAMES),
                    Value::Text("ADD".to_string()),
                ),
                PropertyDef::new("use_clamp", PropertyKind::Bool, Value::Bool(false)),
            ],
            NodeKind::Blend => vec![
                PropertyDef::new(
                    "blend_type",
                    PropertyKind::Enum(BlendMode::NAMES),
                    Value::Text("MIX".to_string()),
                ),
                PropertyDef::new("use_clamp", PropertyKind::Bool, Value::Bool(false)),
            ],
            NodeKind::Effect => vec![
                PropertyDef::new(
                    "effect_type",
                    PropertyKind::Enum(EffectType::NAMES),
                    Value::Text("RAMP".to_string()),
                ),
                PropertyDef::new("period", PropertyKind::Int, Value::Int(24)),
                PropertyDef::new("offset", PropertyKind::Int, Value::Int(0)),
            ],
            NodeKind::Cache => vec![
                PropertyDef::new("cache_name", PropertyKind::Text, Value::Text("Cache".to_string())),
                PropertyDef::new(
                    "mode",
                    PropertyKind::Enum(CacheMode::NAMES),
                    Value::Text("WRITE".to_string()),
                ),
            ],
            NodeKind::CollectionInfo => vec![
                PropertyDef::new(
                    "collection",
                    PropertyKind::Resource(ResourceKind::Collection),
                    Value::Resource(None),
                ),
                PropertyDef::new("sample_offset", PropertyKind::Vector(3), Value::Vector(vec![0.0; 3])),
                PropertyDef::new("scene_handle", PropertyKind::Runtime, Value::Opaque(None)),
            ],
            NodeKind::MeshInfo => vec![
                PropertyDef::new(
                    "object",
                    PropertyKind::Resource(ResourceKind::Object),
                    Value::Resource(None),
                ),
                PropertyDef::new("attribute", PropertyKind::Text, Value::Text("color".to_string())),
                PropertyDef::new("scene_handle", PropertyKind::Runtime, Value::Opaque(None)),
            ],
            NodeKind::Output => vec![
                PropertyDef::new("priority", PropertyKind::Int, Value::Int(0)),
            ],
        }
    }
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type
    pub kind: NodeKind,
    /// Identifier, unique within the owning graph
    pub name: String,
    /// User-facing label
    pub label: Option<String>,
    /// Position in the graph UI
    pub position: [f32; 2],
    /// Property values, in schema order
    properties: IndexMap<String, Value>,
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Pool name of the owned color ramp
    pub ramp: Option<String>,
    /// Frame the node is grouped under
    pub frame: Option<FrameId>,
}

impl Node {
    /// Width assumed for layout when placing imported nodes
    pub const WIDTH: f32 = 180.0;

    /// Create a new node with the declared sockets and default properties
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            name: kind.display_name().to_string(),
            label: None,
            position: [0.0, 0.0],
            properties: kind
                .properties()
                .into_iter()
                .map(|def| (def.name.to_string(), def.default))
                .collect(),
            inputs: kind.inputs(),
            outputs: kind.outputs(),
            ramp: None,
            frame: None,
        }
    }

    /// Set the requested name (the graph may add a suffix on insertion)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Set a property, builder style (ignored if it does not fit the schema)
    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        self.set_property(name, value);
        self
    }

    /// Set an input default, builder style (ignored on a type mismatch)
    pub fn with_input_default(mut self, name: &str, value: PortValue) -> Self {
        self.set_input_default(name, value);
        self
    }

    /// Label if set, otherwise the name
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Get a property value
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// All property values in schema order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Set a property.
    ///
    /// Returns `false` if the node type has no such property or the value
    /// does not fit its declared kind.
    pub fn set_property(&mut self, name: &str, value: Value) -> bool {
        let Some(def) = self.kind.properties().into_iter().find(|d| d.name == name) else {
            return false;
        };
        if !value.fits(def.kind) {
            return false;
        }
        self.properties.insert(def.name.to_string(), value);
        true
    }

    /// Property as a float (ints are widened)
    pub fn float_property(&self, name: &str) -> Option<f32> {
        match self.property(name)? {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    /// Property as an int
    pub fn int_property(&self, name: &str) -> Option<i32> {
        match self.property(name)? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Property as a bool
    pub fn bool_property(&self, name: &str) -> Option<bool> {
        match self.property(name)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Property as text (enum identifiers included)
    pub fn text_property(&self, name: &str) -> Option<&str> {
        match self.property(name)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Property as a color
    pub fn color_property(&self, name: &str) -> Option<[f32; 4]> {
        match self.property(name)? {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Set the default value of an input; `false` if missing or mistyped
    pub fn set_input_default(&mut self, name: &str, value: PortValue) -> bool {
        self.inputs
            .iter_mut()
            .find(|p| p.name == name)
            .is_some_and(|p| p.set_default(value))
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == *port_id)
            .or_else(|| self.outputs.iter().find(|p| p.id == *port_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_instantiates_schema() {
        let node = Node::new(NodeKind::Math);
        assert_eq!(node.name, "Math");
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(node.outputs.len(), 1);
        assert_eq!(node.text_property("operation"), Some("ADD"));
        assert_eq!(node.bool_property("use_clamp"), Some(false));
    }

    #[test]
    fn test_socket_names_unique_per_direction() {
        for kind in NodeKind::all() {
            let node = Node::new(*kind);
            for (i, port) in node.inputs.iter().enumerate() {
                assert!(node.inputs[i + 1..].iter().all(|p| p.name != port.name));
            }
            for (i, port) in node.outputs.iter().enumerate() {
                assert!(node.outputs[i + 1..].iter().all(|p| p.name != port.name));
            }
        }
    }

    #[test]
    fn test_set_property_checks_schema() {
        let mut node = Node::new(NodeKind::Math);
        assert!(node.set_property("operation", Value::Text("DIVIDE".to_string())));
        assert!(!node.set_property("operation", Value::Text("SQUARE".to_string())));
        assert!(!node.set_property("operation", Value::Float(1.0)));
        assert!(!node.set_property("missing", Value::Bool(true)));
        assert_eq!(node.text_property("operation"), Some("DIVIDE"));
    }

    #[test]
    fn test_input_default() {
        let node = Node::new(NodeKind::Math).with_input_default("B", PortValue::Float(5.0));
        assert_eq!(node.input("B").unwrap().default_value, Some(PortValue::Float(5.0)));
        let mut node = node;
        assert!(!node.set_input_default("B", PortValue::Bool(true)));
        assert!(!node.set_input_default("C", PortValue::Float(1.0)));
    }

    #[test]
    fn test_fresh_ports_per_node() {
        let a = Node::new(NodeKind::Output);
        let b = Node::new(NodeKind::Output);
        assert_ne!(a.inputs[0].id, b.inputs[0].id);
        assert!(a.port(&a.inputs[1].id).is_some());
        assert!(a.port(&b.inputs[1].id).is_none());
    }
}
