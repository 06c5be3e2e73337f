// SPDX-License-Identifier: MIT OR Apache-2.0
//! Operation tags carried by math, blend, effect and cache nodes.
//!
//! Tags are stored on nodes as enum identifiers (see
//! [`PropertyKind::Enum`](crate::property::PropertyKind::Enum)) and parsed
//! here when a node is evaluated.

/// Result of a division or modulo by zero
pub const DIVIDE_BY_ZERO: f32 = 0.0;

/// Scalar operation of a math node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOperation {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`, or [`DIVIDE_BY_ZERO`]
    Divide,
    /// `min(a, b)`
    Minimum,
    /// `max(a, b)`
    Maximum,
    /// Floored `a mod b`, or [`DIVIDE_BY_ZERO`]
    Modulo,
}

impl MathOperation {
    /// Identifiers in declaration order
    pub const NAMES: &'static [&'static str] =
        &["ADD", "SUBTRACT", "MULTIPLY", "DIVIDE", "MINIMUM", "MAXIMUM", "MODULO"];

    /// Parse an identifier
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "ADD" => Some(Self::Add),
            "SUBTRACT" => Some(Self::Subtract),
            "MULTIPLY" => Some(Self::Multiply),
            "DIVIDE" => Some(Self::Divide),
            "MINIMUM" => Some(Self::Minimum),
            "MAXIMUM" => Some(Self::Maximum),
            "MODULO" => Some(Self::Modulo),
            _ => None,
        }
    }

    /// Apply the operation
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => safe_divide(a, b),
            Self::Minimum => a.min(b),
            Self::Maximum => a.max(b),
            Self::Modulo => {
                if b == 0.0 {
                    DIVIDE_BY_ZERO
                } else {
                    a - b * (a / b).floor()
                }
            }
        }
    }
}

/// Per-channel blend of a blend node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Crossfade from `a` to `b`
    Mix,
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`, or [`DIVIDE_BY_ZERO`]
    Divide,
    /// `min(a, b)`
    Darken,
    /// `max(a, b)`
    Lighten,
}

impl BlendMode {
    /// Identifiers in declaration order
    pub const NAMES: &'static [&'static str] =
        &["MIX", "ADD", "SUBTRACT", "MULTIPLY", "DIVIDE", "DARKEN", "LIGHTEN"];

    /// Parse an identifier
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "MIX" => Some(Self::Mix),
            "ADD" => Some(Self::Add),
            "SUBTRACT" => Some(Self::Subtract),
            "MULTIPLY" => Some(Self::Multiply),
            "DIVIDE" => Some(Self::Divide),
            "DARKEN" => Some(Self::Darken),
            "LIGHTEN" => Some(Self::Lighten),
            _ => None,
        }
    }

    /// Blend `b` over `a` with strength `factor`.
    ///
    /// Each RGB channel is `a + (op(a, b) - a) * factor`; alpha is taken from `a`.
    pub fn apply(self, factor: f32, a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
        let mut out = a;
        for i in 0..3 {
            let blended = match self {
                Self::Mix => b[i],
                Self::Add => a[i] + b[i],
                Self::Subtract => a[i] - b[i],
                Self::Multiply => a[i] * b[i],
                Self::Divide => safe_divide(a[i], b[i]),
                Self::Darken => a[i].min(b[i]),
                Self::Lighten => a[i].max(b[i]),
            };
            out[i] = a[i] + (blended - a[i]) * factor;
        }
        out
    }
}

/// Built-in effect generators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectType {
    /// Sample the node's ramp at the input factor
    Ramp,
    /// Smooth cosine pulse over `period` frames
    Pulse,
    /// Full on for the first half of each period
    Blink,
}

impl EffectType {
    /// Identifiers in declaration order
    pub const NAMES: &'static [&'static str] = &["RAMP", "PULSE", "BLINK"];

    /// Parse an identifier
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "RAMP" => Some(Self::Ramp),
            "PULSE" => Some(Self::Pulse),
            "BLINK" => Some(Self::Blink),
            _ => None,
        }
    }

    /// Scalar level of the effect at `frame`.
    ///
    /// `period` values below one are treated as one.
    pub fn level(self, factor: f32, frame: i32, period: i32, offset: i32) -> f32 {
        let period = i64::from(period.max(1));
        let phase = (i64::from(frame) + i64::from(offset)).rem_euclid(period) as f32 / period as f32;
        match self {
            Self::Ramp => factor,
            Self::Pulse => 0.5 - 0.5 * (std::f32::consts::TAU * phase).cos(),
            Self::Blink => {
                if phase < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Whether a cache node stores or retrieves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Store the input under the cache name
    Write,
    /// Return the value last stored under the cache name
    Read,
}

impl CacheMode {
    /// Identifiers in declaration order
    pub const NAMES: &'static [&'static str] = &["WRITE", "READ"];

    /// Parse an identifier
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "WRITE" => Some(Self::Write),
            "READ" => Some(Self::Read),
            _ => None,
        }
    }
}

fn safe_divide(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        DIVIDE_BY_ZERO
    } else {
        a / b
    }
}

/// Clamp every channel of a color to `[0, 1]`
pub fn clamp_color(color: [f32; 4]) -> [f32; 4] {
    color.map(|c| c.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_by_zero_is_sentinel() {
        assert_eq!(MathOperation::Divide.apply(1.0, 0.0), DIVIDE_BY_ZERO);
        assert_eq!(MathOperation::Modulo.apply(3.0, 0.0), DIVIDE_BY_ZERO);
        assert_eq!(MathOperation::Divide.apply(1.0, 4.0), 0.25);
    }

    #[test]
    fn test_modulo_is_floored() {
        assert_eq!(MathOperation::Modulo.apply(-1.0, 4.0), 3.0);
        assert_eq!(MathOperation::Modulo.apply(5.0, 4.0), 1.0);
    }

    #[test]
    fn test_names_parse() {
        for name in MathOperation::NAMES {
            assert!(MathOperation::parse(name).is_some());
        }
        for name in BlendMode::NAMES {
            assert!(BlendMode::parse(name).is_some());
        }
        for name in EffectType::NAMES {
            assert!(EffectType::parse(name).is_some());
        }
        for name in CacheMode::NAMES {
            assert!(CacheMode::parse(name).is_some());
        }
        assert_eq!(MathOperation::parse("add"), None);
    }

    #[test]
    fn test_blend_factor() {
        let black = [0.0, 0.0, 0.0, 1.0];
        let white = [1.0, 1.0, 1.0, 1.0];
        assert_eq!(BlendMode::Mix.apply(0.5, black, white), [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(BlendMode::Mix.apply(0.0, black, white), black);
        assert_eq!(BlendMode::Divide.apply(1.0, white, black), black);
        assert_eq!(BlendMode::Add.apply(1.0, white, white), [2.0, 2.0, 2.0, 1.0]);
        assert_eq!(clamp_color([2.0, -1.0, 0.5, 1.0]), [1.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_effect_levels() {
        assert_eq!(EffectType::Blink.level(0.0, 0, 10, 0), 1.0);
        assert_eq!(EffectType::Blink.level(0.0, 5, 10, 0), 0.0);
        assert_eq!(EffectType::Pulse.level(0.0, 0, 10, 0), 0.0);
        assert!((EffectType::Pulse.level(0.0, 5, 10, 0) - 1.0).abs() < 1e-6);
        assert_eq!(EffectType::Ramp.level(0.7, 3, 10, 0), 0.7);
        // Degenerate period does not divide by zero
        assert_eq!(EffectType::Blink.level(0.0, 3, 0, 0), 1.0);
    }

    #[test]
    fn test_effect_level_with_extreme_offsets() {
        // (10 + i32::MAX) mod 24 = 17, in the off half of the period
        assert_eq!(EffectType::Blink.level(0.0, 10, 24, i32::MAX), 0.0);
        assert_eq!(EffectType::Blink.level(0.0, i32::MIN, 24, i32::MIN), 1.0);

        let pulse = EffectType::Pulse.level(0.0, i32::MAX, i32::MAX, i32::MAX);
        assert!((0.0..=1.0).contains(&pulse));
    }
}
