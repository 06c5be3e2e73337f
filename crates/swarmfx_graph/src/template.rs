// SPDX-License-Identifier: MIT OR Apache-2.0
//! Template catalogue and importer.
//!
//! A template is a document file; a directory of them is the catalogue.
//! Importing a template places its nodes to the right of everything already
//! in the graph and groups them under a frame named after the template root.

use crate::document::{self, Document, DocumentError};
use crate::graph::{FrameId, Graph};
use crate::node::NodeId;
use crate::resource::ResourcePools;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Horizontal gap between existing nodes and an imported template
pub const DEFAULT_TEMPLATE_MARGIN: f32 = 100.0;

/// File extension of template documents
pub const TEMPLATE_EXTENSION: &str = "json";

/// A template file in the catalogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    /// File stem, used to look the template up
    pub name: String,
    /// Path to the document
    pub path: PathBuf,
}

/// Directory of template documents
#[derive(Debug, Clone)]
pub struct TemplateCatalogue {
    dir: PathBuf,
}

impl TemplateCatalogue {
    /// Catalogue rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Catalogue directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every template under the directory, sorted by name.
    ///
    /// A missing directory is an empty catalogue.
    pub fn entries(&self) -> Result<Vec<TemplateEntry>, TemplateError> {
        if !self.dir.exists() {
            tracing::debug!("Template directory {:?} does not exist", self.dir);
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(&self.dir).follow_links(true) {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            entries.push(TemplateEntry {
                name: name.to_string(),
                path: path.to_path_buf(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        Ok(entries)
    }

    /// Find a template by name
    pub fn find(&self, name: &str) -> Result<TemplateEntry, TemplateError> {
        self.entries()?
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    /// Load a template by name
    pub fn load(&self, name: &str) -> Result<Document, TemplateError> {
        let entry = self.find(name)?;
        Ok(Document::load(&entry.path)?)
    }

    /// Save a document as `<dir>/<name>.json`, creating the directory
    pub fn save(&self, name: &str, document: &Document) -> Result<PathBuf, TemplateError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{name}.{TEMPLATE_EXTENSION}"));
        document.save(&path)?;
        tracing::info!("Saved template {name} to {path:?}");
        Ok(path)
    }
}

/// Nodes created by a template import
#[derive(Debug, Clone)]
pub struct TemplateImport {
    /// The template's root node
    pub root: NodeId,
    /// Frame grouping the imported nodes
    pub frame: FrameId,
    /// Created nodes keyed by their document names
    pub nodes: IndexMap<String, NodeId>,
}

/// Import `document` into `graph` as a framed group placed `margin` to the
/// right of the existing nodes.
///
/// Nodes keep their relative layout. Importing into an empty graph keeps
/// the document's positions as they are.
pub fn import_template(
    graph: &mut Graph,
    pools: &mut ResourcePools,
    document: &Document,
    margin: f32,
) -> Result<TemplateImport, TemplateError> {
    let existing_edge = graph.rightmost_edge();
    let nodes = document::import(graph, pools, document)?;

    let root = *nodes
        .get(&document.root)
        .ok_or_else(|| TemplateError::MissingRoot(document.root.clone()))?;

    let leftmost = nodes
        .values()
        .filter_map(|id| graph.node(*id))
        .map(|n| n.position[0])
        .reduce(f32::min);
    let shift = match (existing_edge, leftmost) {
        (Some(edge), Some(left)) => edge + margin - left,
        _ => 0.0,
    };

    let frame = graph.add_frame(document.root.clone());
    for id in nodes.values() {
        if let Some(node) = graph.node_mut(*id) {
            node.position[0] += shift;
            node.frame = Some(frame);
        }
    }

    tracing::info!(
        "Imported template {} ({} nodes, shifted by {shift})",
        document.root,
        nodes.len()
    );
    Ok(TemplateImport { root, frame, nodes })
}

/// Error listing, loading or importing templates
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No template with that name in the catalogue
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Catalogue directory could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk failed
    #[error("Failed to scan templates: {0}")]
    Walk(#[from] walkdir::Error),

    /// Template document is malformed
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Imported nodes do not include the declared root
    #[error("Template root '{0}' was not created")]
    MissingRoot(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};

    fn two_node_template(graph: &mut Graph, pools: &ResourcePools) -> Document {
        let value = graph.add_node(Node::new(NodeKind::Value).with_position(-50.0, 0.0));
        let output = graph.add_node(Node::new(NodeKind::Output).with_name("Lamp").with_position(150.0, 20.0));
        graph.connect_by_name(value, "Value", output, "Intensity").unwrap();
        document::export(graph, pools, output).unwrap()
    }

    #[test]
    fn test_import_shifts_right_of_existing_nodes() {
        let mut pools = ResourcePools::new();
        let template = two_node_template(&mut Graph::new("Source"), &pools);

        let mut graph = Graph::new("Dest");
        graph.add_node(Node::new(NodeKind::Math).with_position(400.0, 0.0));

        let import = import_template(&mut graph, &mut pools, &template, DEFAULT_TEMPLATE_MARGIN).unwrap();
        assert_eq!(import.nodes.len(), 2);

        let value = graph.node(import.nodes["Value"]).unwrap();
        let lamp = graph.node(import.root).unwrap();
        assert_eq!(value.position[0], 400.0 + Node::WIDTH + DEFAULT_TEMPLATE_MARGIN);
        // Relative layout is preserved
        assert_eq!(lamp.position[0] - value.position[0], 200.0);
        assert_eq!(lamp.position[1], 20.0);

        assert_eq!(graph.frame(import.frame).unwrap().label, "Lamp");
        assert_eq!(graph.frame_members(import.frame).count(), 2);
    }

    #[test]
    fn test_import_into_empty_graph_keeps_positions() {
        let mut pools = ResourcePools::new();
        let template = two_node_template(&mut Graph::new("Source"), &pools);

        let mut graph = Graph::new("Dest");
        let import = import_template(&mut graph, &mut pools, &template, DEFAULT_TEMPLATE_MARGIN).unwrap();
        assert_eq!(graph.node(import.nodes["Value"]).unwrap().position, [-50.0, 0.0]);
    }

    #[test]
    fn test_missing_catalogue_is_empty() {
        let catalogue = TemplateCatalogue::new("does/not/exist");
        assert!(catalogue.entries().unwrap().is_empty());
        assert!(matches!(catalogue.load("Anything"), Err(TemplateError::NotFound(_))));
    }
}
