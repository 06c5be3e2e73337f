// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless frame loop.
//!
//! Stands in for the interactive host: owns the graph, the resource pools
//! and the runtime context, and advances them one frame per tick. Each tick
//! runs a read-only pass first (which may only request output-list syncs),
//! then evaluates the outputs, then drains the deferred syncs.

use crate::config::SceneSampleConfig;
use indexmap::IndexMap;
use swarmfx_graph::evaluation::{EnvironmentSample, SceneSampler};
use swarmfx_graph::property::Value;
use swarmfx_graph::registry::{self, SceneOutputs};
use swarmfx_graph::template::{self, TemplateError, TemplateImport};
use swarmfx_graph::{Document, Graph, Node, OutputSignal, ResourcePools, RuntimeContext};

/// Scene samples keyed by the name of the referenced collection or object
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    samples: IndexMap<String, EnvironmentSample>,
}

impl HeadlessScene {
    /// Provide a fixed sample for a resource name
    pub fn set_sample(&mut self, resource: impl Into<String>, sample: EnvironmentSample) {
        self.samples.insert(resource.into(), sample);
    }

    /// Scene built from configured samples
    pub fn from_config(samples: &[SceneSampleConfig]) -> Self {
        let mut scene = Self::default();
        for s in samples {
            scene.set_sample(
                s.resource.clone(),
                EnvironmentSample {
                    value: s.value,
                    color: s.color,
                },
            );
        }
        scene
    }
}

impl SceneSampler for HeadlessScene {
    fn sample(&self, node: &Node, pools: &ResourcePools, _frame: i32) -> Option<EnvironmentSample> {
        let id = ["object", "collection"].iter().find_map(|name| match node.property(name) {
            Some(Value::Resource(Some(id))) => Some(*id),
            _ => None,
        })?;
        let resource = pools.get(id)?;
        self.samples.get(&resource.name).copied()
    }
}

/// What one tick produced
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Frame number
    pub frame: i32,
    /// Signal per output, in registry order
    pub signals: Vec<(String, OutputSignal)>,
    /// Activity per output
    pub activity: IndexMap<String, bool>,
}

/// Headless host session
pub struct Host {
    /// Graph being played
    pub graph: Graph,
    /// Resource pools
    pub pools: ResourcePools,
    /// Runtime state
    pub ctx: RuntimeContext,
    /// Output list shown for the scene
    pub scene: SceneOutputs,
    /// Environment sampler
    pub sampler: HeadlessScene,
}

impl Host {
    /// Create a host with an empty graph
    pub fn new(scene: &str) -> Self {
        Self {
            graph: Graph::new(scene),
            pools: ResourcePools::new(),
            ctx: RuntimeContext::new(),
            scene: SceneOutputs::new(scene),
            sampler: HeadlessScene::default(),
        }
    }

    /// Import a template document into the graph
    pub fn import(&mut self, document: &Document, margin: f32) -> Result<TemplateImport, TemplateError> {
        template::import_template(&mut self.graph, &mut self.pools, document, margin)
    }

    /// Advance to `frame`
    pub fn tick(&mut self, frame: i32) -> FrameReport {
        // Read-only pass: only schedules work
        if registry::request_sync(&self.scene, &self.graph, &mut self.ctx) {
            tracing::debug!("Output list of {} is stale", self.scene.scene);
        }

        let evaluated = registry::evaluate_outputs(&self.graph, &self.pools, frame, &mut self.ctx, &self.sampler);
        let activity = registry::record_activity(&mut self.ctx, frame, &evaluated);

        self.drain_deferred();
        FrameReport {
            frame,
            signals: evaluated
                .into_iter()
                .filter_map(|(name, signal)| Some((name, signal?)))
                .collect(),
            activity,
        }
    }

    fn drain_deferred(&mut self) {
        for scene in self.ctx.take_pending_syncs() {
            if scene == self.scene.scene {
                registry::sync_outputs(&mut self.scene, &self.graph);
            } else {
                tracing::debug!("Dropping sync for unknown scene {scene}");
            }
        }
    }

    /// Tear the session down, dropping all runtime state and the ramps
    /// owned by the graph's nodes
    pub fn teardown(&mut self) {
        for ramp in self.graph.nodes().filter_map(|n| n.ramp.as_deref()) {
            self.pools.remove_ramp(ramp);
        }
        self.ctx.teardown();
        self.graph = Graph::new(self.scene.scene.clone());
        self.scene = SceneOutputs::new(self.scene.scene.clone());
    }
}
