//! Sequence playback: which nodes are revealed and which one is active.
//!
//! DESIGN
//! ======
//! Two states. `Idle` shows everything. `Revealing` starts from a single root
//! node and grows the visible set one hop at a time, either in bulk
//! (`advance`) or from a clicked node (`click`). Every transition reads the
//! graph it is given and never mutates it; the reveal state is derived data
//! and is never persisted.
//!
//! Root choice: the first node (graph order) with no incoming edge, else the
//! first node. That keeps cyclic diagrams playable.

#[cfg(test)]
#[path = "sequence_test.rs"]
mod sequence_test;

use std::collections::HashSet;

use tracing::debug;

use crate::graph::{Edge, Graph, Node, NodeId};

/// Visible node set and the node that triggered the latest reveal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealState {
    visible: HashSet<NodeId>,
    active: Option<NodeId>,
}

impl RevealState {
    /// Seed a reveal from the graph's root node.
    #[must_use]
    pub fn start(graph: &Graph) -> Self {
        match root(graph) {
            Some(node) => Self { visible: HashSet::from([node.id.clone()]), active: Some(node.id.clone()) },
            None => Self::default(),
        }
    }

    #[must_use]
    pub fn visible(&self) -> &HashSet<NodeId> {
        &self.visible
    }

    #[must_use]
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    #[must_use]
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.contains(id)
    }

    /// Whether some edge leads from a visible node to a hidden one.
    #[must_use]
    pub fn can_advance(&self, graph: &Graph) -> bool {
        graph
            .edges()
            .iter()
            .any(|e| self.visible.contains(&e.source) && !self.visible.contains(&e.target))
    }

    /// Reveal every target of an edge whose source was visible before this
    /// call. One hop only. Returns the number of newly revealed nodes.
    pub fn advance(&mut self, graph: &Graph) -> usize {
        let frontier: Vec<NodeId> = graph
            .edges()
            .iter()
            .filter(|e| self.visible.contains(&e.source) && !self.visible.contains(&e.target))
            .map(|e| e.target.clone())
            .collect();
        frontier.into_iter().filter(|id| self.visible.insert(id.clone())).count()
    }

    /// Reveal the direct targets of a visible node and make it active.
    ///
    /// Hidden nodes cannot be clicked. A visible node without outgoing edges
    /// reveals nothing and leaves the active node unchanged. Returns whether
    /// the click was accepted.
    pub fn click(&mut self, graph: &Graph, id: &str) -> bool {
        if !self.visible.contains(id) {
            return false;
        }
        let targets: Vec<NodeId> = graph.outgoing(id).map(|e| e.target.clone()).collect();
        if targets.is_empty() {
            return false;
        }
        self.visible.extend(targets);
        self.active = Some(id.to_string());
        true
    }
}

/// First node without an incoming edge, falling back to the first node.
#[must_use]
pub fn root(graph: &Graph) -> Option<&Node> {
    graph
        .nodes()
        .iter()
        .find(|n| !graph.has_incoming(&n.id))
        .or_else(|| graph.nodes().first())
}

/// Playback mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SequenceState {
    #[default]
    Idle,
    Revealing(RevealState),
}

/// Sequence playback state machine.
#[derive(Debug, Clone, Default)]
pub struct SequenceEngine {
    state: SequenceState,
}

impl SequenceEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &SequenceState {
        &self.state
    }

    #[must_use]
    pub fn is_revealing(&self) -> bool {
        matches!(self.state, SequenceState::Revealing(_))
    }

    fn reveal(&self) -> Option<&RevealState> {
        match &self.state {
            SequenceState::Revealing(reveal) => Some(reveal),
            SequenceState::Idle => None,
        }
    }

    fn reveal_mut(&mut self) -> Option<&mut RevealState> {
        match &mut self.state {
            SequenceState::Revealing(reveal) => Some(reveal),
            SequenceState::Idle => None,
        }
    }

    /// Enter sequence mode, seeding the reveal from the root node.
    pub fn enter(&mut self, graph: &Graph) {
        let reveal = RevealState::start(graph);
        debug!(root = ?reveal.active(), "sequence entered");
        self.state = SequenceState::Revealing(reveal);
    }

    /// Restart playback from the root. Same as `enter`.
    pub fn reset(&mut self, graph: &Graph) {
        self.enter(graph);
    }

    /// Leave sequence mode and drop the reveal state.
    pub fn exit(&mut self) {
        if self.is_revealing() {
            debug!("sequence exited");
        }
        self.state = SequenceState::Idle;
    }

    /// One-hop bulk reveal. No-op when idle. Returns newly revealed count.
    pub fn advance(&mut self, graph: &Graph) -> usize {
        let added = self.reveal_mut().map_or(0, |reveal| reveal.advance(graph));
        debug!(added, "sequence advanced");
        added
    }

    /// Reveal from a clicked node. No-op when idle.
    pub fn click(&mut self, graph: &Graph, id: &str) -> bool {
        self.reveal_mut().is_some_and(|reveal| reveal.click(graph, id))
    }

    /// Whether `advance` would reveal anything. Always false when idle.
    #[must_use]
    pub fn can_advance(&self, graph: &Graph) -> bool {
        self.reveal().is_some_and(|reveal| reveal.can_advance(graph))
    }

    /// Revealing with nothing left to reveal.
    #[must_use]
    pub fn is_complete(&self, graph: &Graph) -> bool {
        self.is_revealing() && !self.can_advance(graph)
    }

    #[must_use]
    pub fn active(&self) -> Option<&str> {
        self.reveal().and_then(RevealState::active)
    }

    /// Idle shows every node; Revealing shows the visible set.
    #[must_use]
    pub fn node_visible(&self, id: &str) -> bool {
        self.reveal().is_none_or(|reveal| reveal.is_visible(id))
    }

    /// An edge is shown when both endpoints are.
    #[must_use]
    pub fn edge_visible(&self, edge: &Edge) -> bool {
        self.node_visible(&edge.source) && self.node_visible(&edge.target)
    }

    /// The active node while revealing.
    #[must_use]
    pub fn is_highlighted(&self, id: &str) -> bool {
        self.active() == Some(id)
    }
}
