// SPDX-License-Identifier: MIT OR Apache-2.0
//! Color ramps (gradients) attached to effect nodes.
//!
//! A ramp lives in the [`ResourcePools`] under a name and the owning node
//! keeps that name. Documents carry the ramp inline as a [`RampRecord`].

use crate::node::Node;
use crate::resource::ResourcePools;
use serde::{Deserialize, Serialize};

/// Interpolation between neighbouring stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RampInterpolation {
    /// Smoothstep between stops
    Ease,
    /// Cardinal spline
    Cardinal,
    /// Straight line between stops
    #[default]
    Linear,
    /// B-spline
    BSpline,
    /// Hold the left stop's color
    Constant,
}

/// Color space the host blends stops in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RampColorMode {
    /// Red, green, blue
    #[default]
    Rgb,
    /// Hue, saturation, value
    Hsv,
    /// Hue, saturation, lightness
    Hsl,
}

/// A single color stop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStop {
    /// Position in `[0, 1]`
    pub position: f32,
    /// RGBA color
    pub color: [f32; 4],
}

/// An ordered gradient of color stops
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    /// Interpolation mode
    pub interpolation: RampInterpolation,
    /// Color mode
    pub color_mode: RampColorMode,
    /// Stops, sorted by position
    pub elements: Vec<RampStop>,
}

impl ColorRamp {
    /// Create a black-to-white ramp
    pub fn new() -> Self {
        Self {
            interpolation: RampInterpolation::Linear,
            color_mode: RampColorMode::Rgb,
            elements: vec![
                RampStop { position: 0.0, color: [0.0, 0.0, 0.0, 1.0] },
                RampStop { position: 1.0, color: [1.0, 1.0, 1.0, 1.0] },
            ],
        }
    }

    /// Sample the ramp at `t`.
    ///
    /// Blending is done in RGB; cardinal and b-spline modes use the same
    /// two-stop blend as linear.
    pub fn sample(&self, t: f32) -> [f32; 4] {
        let (Some(first), Some(last)) = (self.elements.first(), self.elements.last()) else {
            return [0.0; 4];
        };
        if t <= first.position {
            return first.color;
        }
        if t >= last.position {
            return last.color;
        }

        for pair in self.elements.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if t < left.position || t >= right.position {
                continue;
            }
            let span = right.position - left.position;
            if span <= f32::EPSILON {
                return right.color;
            }
            let f = (t - left.position) / span;
            let f = match self.interpolation {
                RampInterpolation::Constant => return left.color,
                RampInterpolation::Ease => f * f * (3.0 - 2.0 * f),
                RampInterpolation::Linear
                | RampInterpolation::Cardinal
                | RampInterpolation::BSpline => f,
            };
            return lerp_color(left.color, right.color, f);
        }

        last.color
    }

    /// Insert a stop halfway between the last two stops
    pub fn insert_midpoint(&mut self) {
        let position = match self.elements.as_slice() {
            [] => 0.5,
            [only] => (only.position + 1.0) / 2.0,
            [.., a, b] => (a.position + b.position) / 2.0,
        };
        let color = self.sample(position);
        let index = self
            .elements
            .iter()
            .position(|s| s.position > position)
            .unwrap_or(self.elements.len());
        self.elements.insert(index, RampStop { position, color });
    }

    /// Keep stops ordered by position (stable for equal positions)
    pub fn sort_stops(&mut self) {
        self.elements.sort_by(|a, b| a.position.total_cmp(&b.position));
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::new()
    }
}

fn lerp_color(a: [f32; 4], b: [f32; 4], f: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * f)
}

/// A ramp stop as written to documents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampStopRecord {
    /// Position in `[0, 1]`
    pub position: f32,
    /// RGBA color
    pub color: [f32; 4],
}

/// A ramp as written to documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampRecord {
    /// Pool name of the ramp
    pub name: String,
    /// Interpolation mode
    #[serde(default)]
    pub interpolation: RampInterpolation,
    /// Color mode
    #[serde(default)]
    pub color_mode: RampColorMode,
    /// Stops in order
    pub elements: Vec<RampStopRecord>,
}

/// Encode the ramp owned by `node`, if any
pub fn encode_ramp(node: &Node, pools: &ResourcePools) -> Option<RampRecord> {
    let name = node.ramp.as_deref()?;
    let Some(ramp) = pools.ramp(name) else {
        tracing::debug!("Node {} refers to missing ramp '{name}'", node.name);
        return None;
    };

    Some(RampRecord {
        name: name.to_string(),
        interpolation: ramp.interpolation,
        color_mode: ramp.color_mode,
        elements: ramp
            .elements
            .iter()
            .map(|s| RampStopRecord {
                position: finite_or_zero(s.position).clamp(0.0, 1.0),
                color: s.color.map(finite_or_zero),
            })
            .collect(),
    })
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Make `node` own the ramp named in `record` and overwrite it from the record.
///
/// An existing pooled ramp with that name is reused. The stop list is grown
/// with midpoint stops or truncated from the end to match the record (a ramp
/// always keeps at least one stop), then every stop is overwritten.
pub fn apply_ramp(node: &mut Node, record: &RampRecord, pools: &mut ResourcePools) {
    node.ramp = Some(record.name.clone());
    let ramp = pools.ensure_ramp(&record.name);
    ramp.interpolation = record.interpolation;
    ramp.color_mode = record.color_mode;

    let target = record.elements.len().max(1);
    while ramp.elements.len() < target {
        ramp.insert_midpoint();
    }
    ramp.elements.truncate(target);

    for (stop, stop_record) in ramp.elements.iter_mut().zip(&record.elements) {
        stop.position = stop_record.position.clamp(0.0, 1.0);
        stop.color = stop_record.color;
    }
    ramp.sort_stops();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn record(stops: &[(f32, [f32; 4])]) -> RampRecord {
        RampRecord {
            name: "Glow".to_string(),
            interpolation: RampInterpolation::Ease,
            color_mode: RampColorMode::Hsv,
            elements: stops
                .iter()
                .map(|(position, color)| RampStopRecord { position: *position, color: *color })
                .collect(),
        }
    }

    #[test]
    fn test_apply_grows_stop_list() {
        let mut pools = ResourcePools::new();
        let mut node = Node::new(NodeKind::Effect);
        let rec = record(&[
            (0.0, [1.0, 0.0, 0.0, 1.0]),
            (0.3, [0.0, 1.0, 0.0, 1.0]),
            (0.6, [0.0, 0.0, 1.0, 1.0]),
            (1.0, [1.0, 1.0, 1.0, 1.0]),
        ]);

        apply_ramp(&mut node, &rec, &mut pools);

        let ramp = pools.ramp("Glow").unwrap();
        assert_eq!(node.ramp.as_deref(), Some("Glow"));
        assert_eq!(ramp.elements.len(), 4);
        assert_eq!(ramp.elements[1].position, 0.3);
        assert_eq!(ramp.interpolation, RampInterpolation::Ease);
        assert_eq!(ramp.color_mode, RampColorMode::Hsv);
    }

    #[test]
    fn test_apply_shrinks_stop_list() {
        let mut pools = ResourcePools::new();
        let existing = pools.ensure_ramp("Glow");
        existing.insert_midpoint();
        existing.insert_midpoint();
        assert_eq!(existing.elements.len(), 4);

        let mut node = Node::new(NodeKind::Effect);
        apply_ramp(&mut node, &record(&[(0.25, [0.5; 4])]), &mut pools);

        let ramp = pools.ramp("Glow").unwrap();
        assert_eq!(ramp.elements, vec![RampStop { position: 0.25, color: [0.5; 4] }]);
    }

    #[test]
    fn test_apply_twice_is_identical() {
        let mut pools = ResourcePools::new();
        let mut node = Node::new(NodeKind::Effect);
        // Out of order on purpose
        let rec = record(&[(0.8, [1.0; 4]), (0.2, [0.0, 0.0, 0.0, 1.0]), (0.5, [0.5; 4])]);

        apply_ramp(&mut node, &rec, &mut pools);
        let first = pools.ramp("Glow").unwrap().clone();
        apply_ramp(&mut node, &rec, &mut pools);
        let second = pools.ramp("Glow").unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(first.elements[0].position, 0.2);
    }

    #[test]
    fn test_encode_matches_applied_record() {
        let mut pools = ResourcePools::new();
        let mut node = Node::new(NodeKind::Effect);
        let rec = record(&[(0.0, [0.0, 0.0, 0.0, 1.0]), (1.0, [1.0, 0.5, 0.0, 1.0])]);

        apply_ramp(&mut node, &rec, &mut pools);
        assert_eq!(encode_ramp(&node, &pools), Some(rec));
    }

    #[test]
    fn test_sample_modes() {
        let mut ramp = ColorRamp::new();
        assert_eq!(ramp.sample(0.5), [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(ramp.sample(-1.0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(ramp.sample(2.0), [1.0; 4]);

        ramp.interpolation = RampInterpolation::Constant;
        assert_eq!(ramp.sample(0.9), [0.0, 0.0, 0.0, 1.0]);

        ramp.interpolation = RampInterpolation::Ease;
        assert!(ramp.sample(0.25)[0] < 0.25);
    }
}
