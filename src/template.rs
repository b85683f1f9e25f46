//! Built-in starter diagram shown when no workspace file is loaded.

#[cfg(test)]
#[path = "template_test.rs"]
mod template_test;

use crate::format::Diagram;
use crate::graph::{Edge, EdgeKind, Graph, Meta, Node, Position};

/// The starter diagram: a three-step walkthrough of the editor itself.
#[must_use]
pub fn default_diagram() -> Diagram {
    let nodes = vec![
        Node::new("start", Position::new(0.0, 0.0))
            .with_label("Start here")
            .with_details(vec!["Connect a folder to list its flows".into(), "Or edit this one in place".into()]),
        Node::new("build", Position::new(0.0, 150.0))
            .with_label("Build the flow")
            .with_details(vec!["Add nodes and drag between handles".into(), "Align a selection from the toolbar".into()]),
        Node::new("play", Position::new(0.0, 300.0))
            .with_label("Play it back")
            .with_details(vec!["Sequence mode reveals one hop at a time".into()]),
    ];
    let edges = vec![
        link("e-start-build", "start", "build"),
        link("e-build-play", "build", "play").with_label("then"),
    ];
    Diagram { meta: Meta::default(), nodes, edges }
}

/// The starter diagram as a clean graph.
#[must_use]
pub fn default_graph() -> Graph {
    let Diagram { meta, nodes, edges } = default_diagram();
    // Fixed ids above are unique and every edge endpoint exists.
    Graph::from_parts(nodes, edges, meta).unwrap_or_default()
}

fn link(id: &str, source: &str, target: &str) -> Edge {
    let mut edge = Edge::new(id, source, target);
    edge.source_handle = Some("bottom-source".into());
    edge.target_handle = Some("top-target".into());
    edge.kind = EdgeKind::SmoothStep;
    edge
}
