// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node properties and their portable encoding.
//!
//! Every [`NodeKind`](crate::node::NodeKind) declares its property schema up
//! front. The codec walks that schema, so encoding never depends on what a
//! node happens to hold at runtime:
//! - representable properties become a [`PropertyValue`]
//! - runtime-only properties are left out of the encoded mapping
//! - resource references are written as `{kind, name}` and resolved against
//!   [`ResourcePools`] on the way back in

use crate::node::Node;
use crate::resource::{ResourceId, ResourceKind, ResourcePools};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declared type of a node property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Boolean toggle
    Bool,
    /// Integer
    Int,
    /// Float
    Float,
    /// Free text
    Text,
    /// One of a fixed set of identifiers
    Enum(&'static [&'static str]),
    /// RGBA color
    Color,
    /// Fixed-length numeric vector
    Vector(usize),
    /// Reference to a named host resource
    Resource(ResourceKind),
    /// Host runtime state with no portable form
    Runtime,
}

/// Definition of one property in a node type's schema
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Property name
    pub name: &'static str,
    /// Declared type
    pub kind: PropertyKind,
    /// Value a fresh node starts with
    pub default: Value,
}

impl PropertyDef {
    /// Create a property definition
    pub fn new(name: &'static str, kind: PropertyKind, default: Value) -> Self {
        Self { name, kind, default }
    }
}

/// Live value of a node property
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// Text or enum identifier
    Text(String),
    /// RGBA color
    Color([f32; 4]),
    /// Numeric vector
    Vector(Vec<f32>),
    /// Resource handle, `None` when unset
    Resource(Option<ResourceId>),
    /// Opaque host handle
    Opaque(Option<u64>),
}

impl Value {
    /// Check whether this value is valid for a property of kind `kind`
    pub fn fits(&self, kind: PropertyKind) -> bool {
        match (self, kind) {
            (Self::Bool(_), PropertyKind::Bool)
            | (Self::Int(_), PropertyKind::Int)
            | (Self::Float(_), PropertyKind::Float)
            | (Self::Text(_), PropertyKind::Text)
            | (Self::Color(_), PropertyKind::Color)
            | (Self::Resource(_), PropertyKind::Resource(_))
            | (Self::Opaque(_), PropertyKind::Runtime) => true,
            (Self::Text(s), PropertyKind::Enum(options)) => options.contains(&s.as_str()),
            (Self::Vector(v), PropertyKind::Vector(n)) => v.len() == n,
            _ => false,
        }
    }
}

/// Reference to a named resource in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind
    pub kind: ResourceKind,
    /// Resource name
    pub name: String,
}

/// Portable property value as written to documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Text(String),
    /// Numeric vector (colors are length 4)
    Vector(Vec<f64>),
    /// Named resource reference
    Resource(ResourceRef),
}

/// Encode every representable property of `node`.
///
/// Runtime properties and references to resources that no longer exist are
/// omitted. Unset references are omitted too, so decoding leaves them at
/// their default (unset).
pub fn encode_properties(node: &Node, pools: &ResourcePools) -> IndexMap<String, PropertyValue> {
    let mut encoded = IndexMap::new();
    for def in node.kind.properties() {
        let Some(value) = node.property(def.name) else {
            continue;
        };
        match encode_value(value, pools) {
            Some(portable) => {
                encoded.insert(def.name.to_string(), portable);
            }
            None => {
                tracing::debug!("Omitting property {}.{} (no portable form)", node.name, def.name);
            }
        }
    }
    encoded
}

/// Apply encoded properties onto `node`.
///
/// Unknown names, values of the wrong shape, and unresolved references are
/// skipped; the affected properties keep their current value.
pub fn apply_properties(
    node: &mut Node,
    properties: &IndexMap<String, PropertyValue>,
    pools: &ResourcePools,
) {
    let schema = node.kind.properties();
    for (name, portable) in properties {
        let Some(def) = schema.iter().find(|d| d.name == name) else {
            tracing::debug!("Node {} has no property named {name}", node.name);
            continue;
        };
        match decode_value(def.kind, portable, pools) {
            Some(value) => {
                node.set_property(def.name, value);
            }
            None => {
                tracing::debug!("Leaving {}.{name} at its current value", node.name);
            }
        }
    }
}

fn encode_value(value: &Value, pools: &ResourcePools) -> Option<PropertyValue> {
    match value {
        Value::Bool(b) => Some(PropertyValue::Bool(*b)),
        Value::Int(i) => Some(PropertyValue::Int(i64::from(*i))),
        Value::Float(f) => f.is_finite().then(|| PropertyValue::Float(f64::from(*f))),
        Value::Text(s) => Some(PropertyValue::Text(s.clone())),
        Value::Color(c) => encode_vector(c),
        Value::Vector(v) => encode_vector(v),
        Value::Resource(Some(id)) => pools.get(*id).map(|resource| {
            PropertyValue::Resource(ResourceRef {
                kind: resource.kind,
                name: resource.name.clone(),
            })
        }),
        Value::Resource(None) | Value::Opaque(_) => None,
    }
}

/// Non-finite components have no JSON form
pub(crate) fn encode_vector(components: &[f32]) -> Option<PropertyValue> {
    components
        .iter()
        .all(|c| c.is_finite())
        .then(|| PropertyValue::Vector(components.iter().map(|c| f64::from(*c)).collect()))
}

fn decode_value(kind: PropertyKind, portable: &PropertyValue, pools: &ResourcePools) -> Option<Value> {
    match (kind, portable) {
        (PropertyKind::Bool, PropertyValue::Bool(b)) => Some(Value::Bool(*b)),
        (PropertyKind::Int, PropertyValue::Int(i)) => i32::try_from(*i).ok().map(Value::Int),
        (PropertyKind::Float, PropertyValue::Float(f)) => Some(Value::Float(*f as f32)),
        (PropertyKind::Float, PropertyValue::Int(i)) => Some(Value::Float(*i as f32)),
        (PropertyKind::Text, PropertyValue::Text(s)) => Some(Value::Text(s.clone())),
        (PropertyKind::Enum(options), PropertyValue::Text(s)) if options.contains(&s.as_str()) => {
            Some(Value::Text(s.clone()))
        }
        (PropertyKind::Color, PropertyValue::Vector(v)) => match v.as_slice() {
            [r, g, b] => Some(Value::Color([*r as f32, *g as f32, *b as f32, 1.0])),
            [r, g, b, a] => Some(Value::Color([*r as f32, *g as f32, *b as f32, *a as f32])),
            _ => None,
        },
        (PropertyKind::Vector(n), PropertyValue::Vector(v)) if v.len() == n => {
            Some(Value::Vector(v.iter().map(|c| *c as f32).collect()))
        }
        (PropertyKind::Resource(expected), PropertyValue::Resource(reference)) => {
            if reference.kind != expected {
                tracing::warn!(
                    "Resource {:?} '{}' does not match expected kind {:?}",
                    reference.kind,
                    reference.name,
                    expected
                );
                return None;
            }
            let id = pools.lookup(reference.kind, &reference.name);
            if id.is_none() {
                tracing::debug!("Unresolved {:?} reference '{}'", reference.kind, reference.name);
            }
            id.map(|id| Value::Resource(Some(id)))
        }
        _ => None,
    }
}
