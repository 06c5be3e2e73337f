// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-frame evaluation of output nodes.
//!
//! Each output is evaluated by pulling values through its dependency
//! subgraph. Results are memoized only within one output's walk; two
//! outputs sharing a node compute it twice.
//!
//! Cycles are allowed in the graph. While walking, an input whose source
//! node is still being computed is treated as unlinked and falls back to
//! its default.
//!
//! The walk recurses once per node on the current dependency chain. Chains
//! longer than [`Evaluator::MAX_DEPTH`] fail with
//! [`EvaluationError::TooDeep`] instead of exhausting the stack.

use crate::context::{CacheEntry, RuntimeContext};
use crate::graph::Graph;
use crate::link::Link;
use crate::node::{Node, NodeId, NodeKind};
use crate::ops::{clamp_color, BlendMode, CacheMode, EffectType, MathOperation};
use crate::port::{PortId, PortValue};
use crate::resource::ResourcePools;
use std::collections::{HashMap, HashSet};

/// Result of evaluating a node
#[derive(Debug, Clone)]
pub struct NodeOutput {
    /// Output values by port ID
    pub values: HashMap<PortId, PortValue>,
}

impl NodeOutput {
    /// Create a new empty output
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set an output value
    pub fn set(&mut self, port_id: PortId, value: PortValue) {
        self.values.insert(port_id, value);
    }

    /// Get an output value
    pub fn get(&self, port_id: &PortId) -> Option<&PortValue> {
        self.values.get(port_id)
    }
}

impl Default for NodeOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Color and intensity driving one LED output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSignal {
    /// RGBA color
    pub color: [f32; 4],
    /// Intensity
    pub intensity: f32,
}

impl OutputSignal {
    /// Intensities at or below this magnitude count as off
    pub const ACTIVITY_THRESHOLD: f32 = 1e-6;

    /// Whether the signal drives the LED at all
    pub fn is_active(&self) -> bool {
        self.intensity.abs() > Self::ACTIVITY_THRESHOLD
    }
}

/// A sample resolved by the host scene for an environment node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSample {
    /// Scalar sample
    pub value: f32,
    /// Color sample
    pub color: [f32; 4],
}

impl Default for EnvironmentSample {
    fn default() -> Self {
        Self {
            value: 0.0,
            color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Host-side resolution of collection and mesh info nodes
pub trait SceneSampler {
    /// Sample the scene for `node` at `frame`; `None` when nothing resolves
    fn sample(&self, node: &Node, pools: &ResourcePools, frame: i32) -> Option<EnvironmentSample>;
}

/// Sampler for a host without a scene: every sample is empty
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScene;

impl SceneSampler for EmptyScene {
    fn sample(&self, _node: &Node, _pools: &ResourcePools, _frame: i32) -> Option<EnvironmentSample> {
        None
    }
}

/// Walks output subgraphs for a single frame
pub struct Evaluator<'a> {
    graph: &'a Graph,
    pools: &'a ResourcePools,
    sampler: &'a dyn SceneSampler,
    frame: i32,
    /// Node outputs computed during the current walk
    outputs: HashMap<NodeId, NodeOutput>,
    /// Nodes currently being computed
    stack: HashSet<NodeId>,
}

impl<'a> Evaluator<'a> {
    /// Longest dependency chain a single walk follows
    pub const MAX_DEPTH: usize = 256;

    /// Create an evaluator for `frame`
    pub fn new(
        graph: &'a Graph,
        pools: &'a ResourcePools,
        sampler: &'a dyn SceneSampler,
        frame: i32,
    ) -> Self {
        Self {
            graph,
            pools,
            sampler,
            frame,
            outputs: HashMap::new(),
            stack: HashSet::new(),
        }
    }

    /// Frame being evaluated
    pub fn frame(&self) -> i32 {
        self.frame
    }

    /// Evaluate one output node
    pub fn evaluate_output(
        &mut self,
        output: NodeId,
        ctx: &mut RuntimeContext,
    ) -> Result<OutputSignal, EvaluationError> {
        let graph = self.graph;
        let node = graph.node(output).ok_or(EvaluationError::NodeNotFound(output))?;
        if node.kind != NodeKind::Output {
            return Err(EvaluationError::NotAnOutput(node.name.clone()));
        }

        self.outputs.clear();
        self.stack.clear();
        tracing::trace!("Evaluating {} at frame {}", node.name, self.frame);

        self.stack.insert(output);
        let color = self.input_value(node, "Color", ctx)?.as_color();
        let intensity = self.input_value(node, "Intensity", ctx)?.as_float();
        self.stack.remove(&output);

        Ok(OutputSignal { color, intensity })
    }

    /// Value flowing into the named input: the linked source's output if
    /// any, otherwise the socket default
    fn input_value(
        &mut self,
        node: &'a Node,
        socket: &str,
        ctx: &mut RuntimeContext,
    ) -> Result<PortValue, EvaluationError> {
        let port = node.input(socket).ok_or_else(|| EvaluationError::MissingInput {
            node: node.name.clone(),
            socket: socket.to_string(),
        })?;

        let graph = self.graph;
        if let Some(link) = graph.incoming_link(port.id) {
            if self.stack.contains(&link.from_node) {
                tracing::debug!("Cycle at {}.{}, using default", node.name, socket);
            } else if let Some(value) = self.linked_value(link, ctx)? {
                return Ok(value);
            }
        }

        Ok(port.default_or_zero())
    }

    fn linked_value(
        &mut self,
        link: &Link,
        ctx: &mut RuntimeContext,
    ) -> Result<Option<PortValue>, EvaluationError> {
        if !self.outputs.contains_key(&link.from_node) {
            let graph = self.graph;
            let source = graph
                .node(link.from_node)
                .ok_or(EvaluationError::NodeNotFound(link.from_node))?;
            if self.stack.len() >= Self::MAX_DEPTH {
                return Err(EvaluationError::TooDeep(source.name.clone()));
            }

            self.stack.insert(source.id);
            let result = self.compute(source, ctx);
            self.stack.remove(&source.id);
            self.outputs.insert(source.id, result?);
        }

        Ok(self
            .outputs
            .get(&link.from_node)
            .and_then(|o| o.get(&link.from_port))
            .cloned())
    }

    fn compute(&mut self, node: &'a Node, ctx: &mut RuntimeContext) -> Result<NodeOutput, EvaluationError> {
        let mut out = NodeOutput::new();

        match node.kind {
            NodeKind::Value => {
                let value = node.float_property("value").unwrap_or(0.0);
                let color = node.color_property("color").unwrap_or([1.0; 4]);
                put(&mut out, node, "Value", PortValue::Float(value));
                put(&mut out, node, "Color", PortValue::Color(color));
            }
            NodeKind::Math => {
                let a = self.input_value(node, "A", ctx)?.as_float();
                let b = self.input_value(node, "B", ctx)?.as_float();
                let operation = tag(node, "operation", MathOperation::parse).unwrap_or(MathOperation::Add);
                let mut result = operation.apply(a, b);
                if node.bool_property("use_clamp").unwrap_or(false) {
                    result = result.clamp(0.0, 1.0);
                }
                put(&mut out, node, "Value", PortValue::Float(result));
            }
            NodeKind::Blend => {
                let factor = self.input_value(node, "Factor", ctx)?.as_float().clamp(0.0, 1.0);
                let a = self.input_value(node, "A", ctx)?.as_color();
                let b = self.input_value(node, "B", ctx)?.as_color();
                let mode = tag(node, "blend_type", BlendMode::parse).unwrap_or(BlendMode::Mix);
                let mut color = mode.apply(factor, a, b);
                if node.bool_property("use_clamp").unwrap_or(false) {
                    color = clamp_color(color);
                }
                put(&mut out, node, "Color", PortValue::Color(color));
            }
            NodeKind::Effect => {
                let factor = self.input_value(node, "Factor", ctx)?.as_float();
                let effect = tag(node, "effect_type", EffectType::parse).unwrap_or(EffectType::Ramp);
                let period = node.int_property("period").unwrap_or(1);
                let offset = node.int_property("offset").unwrap_or(0);
                let level = effect.level(factor, self.frame, period, offset);
                let color = match node.ramp.as_deref().and_then(|name| self.pools.ramp(name)) {
                    Some(ramp) => ramp.sample(level),
                    None => [level, level, level, 1.0],
                };
                put(&mut out, node, "Value", PortValue::Float(level));
                put(&mut out, node, "Color", PortValue::Color(color));
            }
            NodeKind::Cache => {
                let name = node.text_property("cache_name").unwrap_or_default().to_string();
                let entry = match tag(node, "mode", CacheMode::parse).unwrap_or(CacheMode::Write) {
                    CacheMode::Write => {
                        let entry = CacheEntry {
                            value: self.input_value(node, "Value", ctx)?.as_float(),
                            color: self.input_value(node, "Color", ctx)?.as_color(),
                            frame: self.frame,
                        };
                        ctx.store_cache(&name, entry);
                        entry
                    }
                    CacheMode::Read => ctx.load_cache(&name).copied().unwrap_or(CacheEntry {
                        value: 0.0,
                        color: [0.0, 0.0, 0.0, 1.0],
                        frame: self.frame,
                    }),
                };
                put(&mut out, node, "Value", PortValue::Float(entry.value));
                put(&mut out, node, "Color", PortValue::Color(entry.color));
            }
            NodeKind::CollectionInfo | NodeKind::MeshInfo => {
                let sample = self
                    .sampler
                    .sample(node, self.pools, self.frame)
                    .unwrap_or_default();
                put(&mut out, node, "Value", PortValue::Float(sample.value));
                put(&mut out, node, "Color", PortValue::Color(sample.color));
            }
            NodeKind::Output => {}
        }

        Ok(out)
    }
}

fn put(out: &mut NodeOutput, node: &Node, socket: &str, value: PortValue) {
    if let Some(port) = node.output(socket) {
        out.set(port.id, value);
    }
}

fn tag<T>(node: &Node, property: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = node.text_property(property).and_then(parse);
    if parsed.is_none() {
        tracing::warn!("Node {} has no valid '{property}', using the default", node.name);
    }
    parsed
}

/// Evaluate one output node at `frame`
pub fn evaluate(
    graph: &Graph,
    pools: &ResourcePools,
    output: NodeId,
    frame: i32,
    ctx: &mut RuntimeContext,
    sampler: &dyn SceneSampler,
) -> Result<OutputSignal, EvaluationError> {
    Evaluator::new(graph, pools, sampler, frame).evaluate_output(output, ctx)
}

/// Error during evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Evaluation was asked for a node that is not an output
    #[error("Node '{0}' is not an output")]
    NotAnOutput(String),

    /// Dependency chain exceeds [`Evaluator::MAX_DEPTH`]
    #[error("Dependency chain too deep at node '{0}'")]
    TooDeep(String),

    /// Node lacks an input its type requires
    #[error("Node '{node}' has no input '{socket}'")]
    MissingInput {
        /// Node name
        node: String,
        /// Socket name
        socket: String,
    },
}
