// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for node inputs/outputs.

use crate::property::{encode_vector, PropertyValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a socket.
///
/// Only valid for the lifetime of the graph holding the socket; documents
/// refer to sockets by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value (factors, intensities)
    Float,
    /// 3D vector
    Vector,
    /// Color (RGBA)
    Color,
}

impl PortType {
    /// Check if this type can connect to another type.
    ///
    /// Links carry values unconverted, so only identical types connect.
    pub fn can_connect_to(&self, other: &PortType) -> bool {
        self == other
    }

    /// Value used for an unlinked input without a declared default
    pub fn zero(&self) -> PortValue {
        match self {
            Self::Bool => PortValue::Bool(false),
            Self::Int => PortValue::Int(0),
            Self::Float => PortValue::Float(0.0),
            Self::Vector => PortValue::Vector([0.0; 3]),
            Self::Color => PortValue::Color([0.0, 0.0, 0.0, 1.0]),
        }
    }
}

/// A socket on a node
#[derive(Debug, Clone)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Port name, unique per direction on its node
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub port_type: PortType,
    /// Default value (for inputs)
    pub default_value: Option<PortValue>,
}

impl Port {
    /// Create a new input port
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            direction: PortDirection::Input,
            port_type,
            default_value: None,
        }
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            direction: PortDirection::Output,
            port_type,
            default_value: None,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, value: PortValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Check if a link from this port to another is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        if self.direction != PortDirection::Output || other.direction != PortDirection::Input {
            return false;
        }

        self.port_type.can_connect_to(&other.port_type)
    }

    /// Replace the default value if `value` has this port's type.
    ///
    /// Returns `false` (and leaves the port untouched) on a type mismatch.
    pub fn set_default(&mut self, value: PortValue) -> bool {
        if value.port_type() != self.port_type {
            return false;
        }
        self.default_value = Some(value);
        true
    }

    /// Declared default, or the type's zero value
    pub fn default_or_zero(&self) -> PortValue {
        self.default_value
            .clone()
            .unwrap_or_else(|| self.port_type.zero())
    }
}

/// Value that can be stored in or flow through a port
#[derive(Debug, Clone, PartialEq)]
pub enum PortValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 3D vector
    Vector([f32; 3]),
    /// Color
    Color([f32; 4]),
}

impl PortValue {
    /// Get the port type for this value
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Bool(_) => PortType::Bool,
            Self::Int(_) => PortType::Int,
            Self::Float(_) => PortType::Float,
            Self::Vector(_) => PortType::Vector,
            Self::Color(_) => PortType::Color,
        }
    }

    /// Read the value as a scalar.
    ///
    /// Colors collapse to the mean of their RGB channels, vectors to `x`.
    pub fn as_float(&self) -> f32 {
        match self {
            Self::Bool(b) => f32::from(u8::from(*b)),
            Self::Int(i) => *i as f32,
            Self::Float(f) => *f,
            Self::Vector(v) => v[0],
            Self::Color(c) => (c[0] + c[1] + c[2]) / 3.0,
        }
    }

    /// Read the value as an RGBA color (scalars become opaque grey)
    pub fn as_color(&self) -> [f32; 4] {
        match self {
            Self::Color(c) => *c,
            Self::Vector(v) => [v[0], v[1], v[2], 1.0],
            other => {
                let f = other.as_float();
                [f, f, f, 1.0]
            }
        }
    }

    /// Portable form used in documents, `None` for non-finite floats
    pub fn to_portable(&self) -> Option<PropertyValue> {
        match self {
            Self::Bool(b) => Some(PropertyValue::Bool(*b)),
            Self::Int(i) => Some(PropertyValue::Int(i64::from(*i))),
            Self::Float(f) => f.is_finite().then(|| PropertyValue::Float(f64::from(*f))),
            Self::Vector(v) => encode_vector(v),
            Self::Color(c) => encode_vector(c),
        }
    }

    /// Decode a portable value for a socket of type `port_type`.
    ///
    /// Returns `None` when the portable shape does not fit the socket.
    pub fn from_portable(port_type: PortType, value: &PropertyValue) -> Option<Self> {
        match (port_type, value) {
            (PortType::Bool, PropertyValue::Bool(b)) => Some(Self::Bool(*b)),
            (PortType::Int, PropertyValue::Int(i)) => i32::try_from(*i).ok().map(Self::Int),
            (PortType::Float, PropertyValue::Float(f)) => Some(Self::Float(*f as f32)),
            (PortType::Float, PropertyValue::Int(i)) => Some(Self::Float(*i as f32)),
            (PortType::Vector, PropertyValue::Vector(v)) if v.len() == 3 => {
                Some(Self::Vector([v[0] as f32, v[1] as f32, v[2] as f32]))
            }
            (PortType::Color, PropertyValue::Vector(v)) => match v.len() {
                3 => Some(Self::Color([v[0] as f32, v[1] as f32, v[2] as f32, 1.0])),
                4 => Some(Self::Color([v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32])),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_requires_matching_types() {
        let out = Port::output("Value", PortType::Float);
        let float_in = Port::input("A", PortType::Float);
        let color_in = Port::input("Color", PortType::Color);

        assert!(out.can_connect(&float_in));
        assert!(!out.can_connect(&color_in));
        // Input to output is never valid
        assert!(!float_in.can_connect(&out));
    }

    #[test]
    fn test_set_default_rejects_wrong_type() {
        let mut port = Port::input("B", PortType::Float).with_default(PortValue::Float(0.0));
        assert!(!port.set_default(PortValue::Color([1.0; 4])));
        assert_eq!(port.default_value, Some(PortValue::Float(0.0)));
        assert!(port.set_default(PortValue::Float(5.0)));
        assert_eq!(port.default_or_zero(), PortValue::Float(5.0));
    }

    #[test]
    fn test_portable_color_accepts_rgb() {
        let rgb = PropertyValue::Vector(vec![0.5, 0.25, 1.0]);
        assert_eq!(
            PortValue::from_portable(PortType::Color, &rgb),
            Some(PortValue::Color([0.5, 0.25, 1.0, 1.0]))
        );
        assert_eq!(PortValue::from_portable(PortType::Vector, &PropertyValue::Float(1.0)), None);
    }
}
