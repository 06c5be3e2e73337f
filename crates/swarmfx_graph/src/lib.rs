// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lighting-effect node graphs for drone swarms.
//!
//! This crate provides the graph model behind swarm light shows:
//! - Typed nodes, sockets and single-writer links
//! - Portable documents for exporting and re-importing subgraphs
//! - A template catalogue of such documents
//! - Per-frame evaluation of output nodes and activity tracking
//!
//! ## Architecture
//!
//! Nodes and links live in a [`Graph`]. Everything that outlives one
//! evaluation (cache stores, activity, pending output-list syncs) lives in a
//! [`RuntimeContext`] the host owns and passes in. Named resources and color
//! ramps live in [`ResourcePools`]. Transient IDs are never persisted;
//! documents refer to nodes and resources by name.

pub mod context;
pub mod deferred;
pub mod document;
pub mod evaluation;
pub mod graph;
pub mod link;
pub mod node;
pub mod ops;
pub mod port;
pub mod property;
pub mod ramp;
pub mod registry;
pub mod resource;
pub mod subgraph;
pub mod template;

pub use context::{CacheEntry, RuntimeContext};
pub use document::{Document, DocumentError};
pub use evaluation::{evaluate, EmptyScene, EnvironmentSample, EvaluationError, OutputSignal, SceneSampler};
pub use graph::{ConnectionError, Frame, FrameId, Graph};
pub use link::{Link, LinkId};
pub use node::{Node, NodeId, NodeKind};
pub use port::{Port, PortDirection, PortId, PortType, PortValue};
pub use property::{PropertyValue, Value};
pub use registry::{evaluate_outputs, list_outputs, record_activity, track_activity, OutputEntry, SceneOutputs};
pub use resource::{ResourceKind, ResourcePools};
pub use template::{import_template, TemplateCatalogue, TemplateError};
