use super::*;
use crate::graph::check_integrity;

#[test]
fn default_diagram_is_consistent_and_not_empty() {
    let diagram = default_diagram();
    assert!(!diagram.is_empty());
    check_integrity(&diagram.nodes, &diagram.edges).unwrap();
}

#[test]
fn default_graph_is_clean_and_matches_diagram() {
    let graph = default_graph();
    assert!(!graph.is_dirty());
    assert_eq!(graph.nodes(), default_diagram().nodes.as_slice());
    assert_eq!(graph.meta().name, "Untitled");
}

#[test]
fn default_edges_use_bottom_to_top_smooth_step() {
    let diagram = default_diagram();
    assert_eq!(diagram.edges.len(), 2);
    for edge in &diagram.edges {
        assert_eq!(edge.source_handle.as_deref(), Some("bottom-source"));
        assert_eq!(edge.target_handle.as_deref(), Some("top-target"));
        assert_eq!(edge.kind, EdgeKind::SmoothStep);
    }
}
