// SPDX-License-Identifier: MIT OR Apache-2.0
//! Template catalogue on disk.

use swarmfx_graph::document::{self, Document, DocumentError};
use swarmfx_graph::template::{self, TemplateCatalogue, TemplateError, DEFAULT_TEMPLATE_MARGIN};
use swarmfx_graph::{Graph, Node, NodeKind, ResourcePools, Value};

fn sample_document(root: &str) -> Document {
    let mut graph = Graph::new("Source");
    let value = graph.add_node(Node::new(NodeKind::Value).with_property("value", Value::Float(1.0)));
    let output = graph.add_node(Node::new(NodeKind::Output).with_name(root).with_position(200.0, 0.0));
    graph.connect_by_name(value, "Value", output, "Intensity").unwrap();
    document::export(&graph, &ResourcePools::new(), output).unwrap()
}

#[test]
fn test_catalogue_lists_sorted_recursively() {
    let dir = tempfile::tempdir().unwrap();
    let catalogue = TemplateCatalogue::new(dir.path());

    catalogue.save("Strobe", &sample_document("Strobe")).unwrap();
    catalogue.save("Aurora", &sample_document("Aurora")).unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    sample_document("Comet").save(&dir.path().join("nested").join("Comet.json")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

    let names: Vec<_> = catalogue.entries().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["Aurora", "Comet", "Strobe"]);

    let comet = catalogue.load("Comet").unwrap();
    assert_eq!(comet.root, "Comet");
}

#[test]
fn test_import_from_catalogue() {
    let dir = tempfile::tempdir().unwrap();
    let catalogue = TemplateCatalogue::new(dir.path());
    catalogue.save("Aurora", &sample_document("Aurora")).unwrap();

    let mut graph = Graph::new("Show");
    let mut pools = ResourcePools::new();
    graph.add_node(Node::new(NodeKind::Value).with_position(0.0, 0.0));

    let doc = catalogue.load("Aurora").unwrap();
    let import = template::import_template(&mut graph, &mut pools, &doc, DEFAULT_TEMPLATE_MARGIN).unwrap();

    let root = graph.node(import.root).unwrap();
    assert_eq!(root.kind, NodeKind::Output);
    assert_eq!(root.frame, Some(import.frame));
    // Leftmost imported node sits one margin right of the existing node
    let leftmost = import
        .nodes
        .values()
        .map(|id| graph.node(*id).unwrap().position[0])
        .fold(f32::INFINITY, f32::min);
    assert_eq!(leftmost, Node::WIDTH + DEFAULT_TEMPLATE_MARGIN);
}

#[test]
fn test_malformed_template_is_a_hard_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Broken.json"), "{ \"version\": 1, ").unwrap();
    let mut wrong_type = sample_document("Other");
    wrong_type.tree_type = "ShaderTree".to_string();
    wrong_type.save(&dir.path().join("Other.json")).unwrap();

    let catalogue = TemplateCatalogue::new(dir.path());
    assert!(matches!(
        catalogue.load("Broken"),
        Err(TemplateError::Document(DocumentError::Json(_)))
    ));
    assert!(matches!(
        catalogue.load("Other"),
        Err(TemplateError::Document(DocumentError::TreeTypeMismatch(_)))
    ));
    assert!(matches!(catalogue.load("Missing"), Err(TemplateError::NotFound(_))));
}

#[test]
fn test_bundled_templates_load_and_play() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates");
    let catalogue = TemplateCatalogue::new(dir);
    let doc = catalogue.load("Heartbeat").unwrap();

    let mut graph = Graph::new("Show");
    let mut pools = ResourcePools::new();
    let import = template::import_template(&mut graph, &mut pools, &doc, DEFAULT_TEMPLATE_MARGIN).unwrap();
    let mut ctx = swarmfx_graph::RuntimeContext::new();

    // Pulse is dark at the start of its period and bright halfway through
    let dark = swarmfx_graph::evaluate(&graph, &pools, import.root, 0, &mut ctx, &swarmfx_graph::EmptyScene)
        .unwrap();
    let bright = swarmfx_graph::evaluate(&graph, &pools, import.root, 6, &mut ctx, &swarmfx_graph::EmptyScene)
        .unwrap();
    assert!(!dark.is_active());
    assert!((bright.intensity - 1.0).abs() < 1e-6);
    assert!(bright.color[0] > 0.99);
}
