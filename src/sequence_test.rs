use super::*;
use crate::graph::{Meta, Position};

fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
    let nodes = nodes.iter().map(|id| Node::new(*id, Position::default())).collect();
    let edges = edges
        .iter()
        .enumerate()
        .map(|(i, (s, t))| Edge::new(format!("e{i}"), *s, *t))
        .collect();
    Graph::from_parts(nodes, edges, Meta::default()).unwrap()
}

fn visible_sorted(engine: &SequenceEngine) -> Vec<String> {
    let SequenceState::Revealing(reveal) = engine.state() else {
        return Vec::new();
    };
    let mut ids: Vec<String> = reveal.visible().iter().cloned().collect();
    ids.sort();
    ids
}

// =============================================================
// Root selection
// =============================================================

#[test]
fn root_is_first_node_without_incoming_edge() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    assert_eq!(visible_sorted(&engine), vec!["a"]);
    assert_eq!(engine.active(), Some("a"));
}

#[test]
fn root_skips_nodes_with_incoming_edges() {
    let g = graph(&["b", "c", "a"], &[("a", "b"), ("b", "c")]);
    assert_eq!(root(&g).map(|n| n.id.as_str()), Some("a"));
}

#[test]
fn root_falls_back_to_first_node_in_cycle() {
    let g = graph(&["b", "a"], &[("a", "b"), ("b", "a")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    assert_eq!(visible_sorted(&engine), vec!["b"]);
    assert_eq!(engine.active(), Some("b"));
}

#[test]
fn entering_an_empty_graph_reveals_nothing() {
    let g = Graph::new();
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    assert!(engine.is_revealing());
    assert!(visible_sorted(&engine).is_empty());
    assert_eq!(engine.active(), None);
    assert!(engine.is_complete(&g));
}

// =============================================================
// Advance
// =============================================================

#[test]
fn advance_is_a_single_hop() {
    let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("a", "d")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);

    assert!(engine.can_advance(&g));
    assert_eq!(engine.advance(&g), 2);
    assert_eq!(visible_sorted(&engine), vec!["a", "b", "d"]);
    assert_eq!(engine.advance(&g), 1);
    assert_eq!(visible_sorted(&engine), vec!["a", "b", "c", "d"]);
}

#[test]
fn advance_until_done_reaches_exactly_the_reachable_set() {
    let g = graph(
        &["a", "b", "c", "island", "d"],
        &[("a", "b"), ("b", "c"), ("c", "a"), ("island", "d"), ("c", "c")],
    );
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    assert_eq!(engine.active(), Some("island"));

    while engine.can_advance(&g) {
        engine.advance(&g);
    }
    assert_eq!(visible_sorted(&engine), vec!["d", "island"]);
    assert_eq!(engine.advance(&g), 0);
    assert_eq!(visible_sorted(&engine), vec!["d", "island"]);
    assert!(engine.is_complete(&g));
}

#[test]
fn advance_does_not_change_active_node() {
    let g = graph(&["a", "b"], &[("a", "b")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    engine.advance(&g);
    assert_eq!(engine.active(), Some("a"));
}

#[test]
fn idle_engine_ignores_transitions() {
    let g = graph(&["a", "b"], &[("a", "b")]);
    let mut engine = SequenceEngine::new();
    assert_eq!(engine.advance(&g), 0);
    assert!(!engine.click(&g, "a"));
    assert!(!engine.can_advance(&g));
    assert!(!engine.is_complete(&g));
    assert_eq!(engine.state(), &SequenceState::Idle);
}

// =============================================================
// Click
// =============================================================

#[test]
fn click_reveals_direct_targets_and_moves_highlight() {
    let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);

    assert!(engine.click(&g, "a"));
    assert_eq!(visible_sorted(&engine), vec!["a", "b", "c"]);
    assert!(engine.click(&g, "b"));
    assert_eq!(visible_sorted(&engine), vec!["a", "b", "c", "d"]);
    assert!(engine.is_highlighted("b"));
    assert!(!engine.is_highlighted("a"));
}

#[test]
fn click_on_hidden_node_is_ignored() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    assert!(!engine.click(&g, "b"));
    assert_eq!(visible_sorted(&engine), vec!["a"]);
    assert_eq!(engine.active(), Some("a"));
}

#[test]
fn click_on_leaf_keeps_active_node() {
    let g = graph(&["a", "b"], &[("a", "b")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    engine.click(&g, "a");
    assert!(!engine.click(&g, "b"));
    assert_eq!(engine.active(), Some("a"));
}

#[test]
fn click_is_idempotent() {
    let g = graph(&["a", "b"], &[("a", "b")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    engine.click(&g, "a");
    let before = engine.state().clone();
    engine.click(&g, "a");
    assert_eq!(engine.state(), &before);
}

// =============================================================
// Reset / exit / visibility
// =============================================================

#[test]
fn reset_returns_to_root_and_exit_goes_idle() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    let mut engine = SequenceEngine::new();
    engine.enter(&g);
    engine.advance(&g);
    engine.click(&g, "b");

    engine.reset(&g);
    assert_eq!(visible_sorted(&engine), vec!["a"]);
    assert_eq!(engine.active(), Some("a"));

    engine.exit();
    assert!(!engine.is_revealing());
    assert_eq!(engine.active(), None);
}

#[test]
fn visibility_in_idle_and_revealing() {
    let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
    let mut engine = SequenceEngine::new();
    assert!(g.nodes().iter().all(|n| engine.node_visible(&n.id)));
    assert!(g.edges().iter().all(|e| engine.edge_visible(e)));
    assert!(!engine.is_highlighted("a"));

    engine.enter(&g);
    engine.advance(&g);
    assert!(engine.node_visible("b"));
    assert!(!engine.node_visible("c"));
    let ab = g.edge("e0").unwrap();
    let bc = g.edge("e1").unwrap();
    assert!(engine.edge_visible(ab));
    assert!(!engine.edge_visible(bc));
}
