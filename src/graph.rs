//! Graph model: diagram nodes, edges, metadata and the mutation API.
//!
//! `Graph` is the single source of truth for a diagram. Its fields are private;
//! every change goes through a method that checks the edge-endpoint invariant
//! before touching state, so each call is one atomic transition. Every
//! content-changing method raises the dirty flag through `touch`; hosts read it
//! with [`Graph::is_dirty`] instead of tracking edits themselves.
//!
//! Node and edge order is insertion order. Sequence playback picks its root by
//! that order, so it is preserved across load and save.

#[cfg(test)]
#[path = "graph_test.rs"]
mod graph_test;

use std::collections::HashSet;

use uuid::Uuid;

use crate::consts::{
    DEFAULT_FORMAT_TAG, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_KIND, DEFAULT_NODE_WIDTH, GRID_STEP,
    NEW_NODE_LABEL, UNTITLED_NAME,
};

/// Stable node identifier, unique within a graph.
pub type NodeId = String;

/// Stable edge identifier, unique within a graph.
pub type EdgeId = String;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),
    #[error("duplicate edge id: {0}")]
    DuplicateEdge(EdgeId),
    #[error("edge {edge} references missing node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
}

impl crate::error::ErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NodeNotFound(_) => "E_NODE_NOT_FOUND",
            Self::EdgeNotFound(_) => "E_EDGE_NOT_FOUND",
            Self::DuplicateNode(_) | Self::DuplicateEdge(_) => "E_DUPLICATE_ID",
            Self::DanglingEdge { .. } => "E_DANGLING_EDGE",
        }
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Round a coordinate to the nearest grid multiple. Halves round toward +inf.
#[must_use]
pub fn snap(value: f64) -> f64 {
    (value / GRID_STEP + 0.5).floor() * GRID_STEP
}

/// Top-left corner of a node in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates snapped to the grid.
    #[must_use]
    pub fn snapped(self) -> Self {
        Self { x: snap(self.x), y: snap(self.y) }
    }
}

/// Rendered node size as measured by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self { width: DEFAULT_NODE_WIDTH, height: DEFAULT_NODE_HEIGHT }
    }
}

// =============================================================================
// NODES AND EDGES
// =============================================================================

/// A labeled step in the diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Renderer node type (`custom` for every node the editor creates).
    pub kind: String,
    pub position: Position,
    pub label: String,
    /// Bullet lines shown under the label.
    pub details: Vec<String>,
    /// Host-measured size. Presentation only, never persisted.
    pub measured: Option<Size>,
}

impl Node {
    /// A node with default type, empty label and no details.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: DEFAULT_NODE_KIND.to_string(),
            position,
            label: String::new(),
            details: Vec::new(),
            measured: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Measured size, or the default node size when unmeasured.
    #[must_use]
    pub fn size(&self) -> Size {
        self.measured.unwrap_or_default()
    }
}

/// Routing style hint for an edge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EdgeKind {
    /// Renderer default (no `type` in the file).
    #[default]
    Default,
    /// Orthogonal step route, used between left/right handles.
    Step,
    /// Rounded orthogonal route.
    SmoothStep,
    /// Any other renderer type, preserved verbatim.
    Other(String),
}

impl EdgeKind {
    /// Parse a file `type` tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "" | "default" => Self::Default,
            "step" => Self::Step,
            "smoothstep" => Self::SmoothStep,
            other => Self::Other(other.to_string()),
        }
    }

    /// File `type` tag, `None` for the renderer default.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Step => Some("step"),
            Self::SmoothStep => Some("smoothstep"),
            Self::Other(tag) => Some(tag),
        }
    }

    /// Routing for a new connection: step when both ends attach left/right.
    #[must_use]
    pub fn for_handles(source_handle: Option<&str>, target_handle: Option<&str>) -> Self {
        if is_horizontal_handle(source_handle) && is_horizontal_handle(target_handle) {
            Self::Step
        } else {
            Self::SmoothStep
        }
    }
}

fn is_horizontal_handle(handle: Option<&str>) -> bool {
    handle.is_some_and(|h| h.contains("left") || h.contains("right"))
}

/// A directed, optionally labeled connection between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub kind: EdgeKind,
    pub label: Option<String>,
}

impl Edge {
    #[must_use]
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            kind: EdgeKind::Default,
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn touches(&self, node: &str) -> bool {
        self.source == node || self.target == node
    }
}

/// Diagram metadata stored alongside nodes and edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    pub name: String,
    pub format: String,
    pub notes: String,
}

impl Default for Meta {
    fn default() -> Self {
        Self { name: UNTITLED_NAME.to_string(), format: DEFAULT_FORMAT_TAG.to_string(), notes: String::new() }
    }
}

/// Split a multi-line details editor value into detail lines, dropping blanks.
#[must_use]
pub fn details_from_text(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Check that ids are unique and every edge endpoint names an existing node.
///
/// # Errors
///
/// Returns the first duplicate id or dangling endpoint found, in order.
pub fn check_integrity(nodes: &[Node], edges: &[Edge]) -> Result<(), GraphError> {
    let mut node_ids: HashSet<&str> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(GraphError::DuplicateNode(node.id.clone()));
        }
    }
    let mut edge_ids: HashSet<&str> = HashSet::with_capacity(edges.len());
    for edge in edges {
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(GraphError::DuplicateEdge(edge.id.clone()));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(GraphError::DanglingEdge { edge: edge.id.clone(), node: endpoint.clone() });
            }
        }
    }
    Ok(())
}

// =============================================================================
// GRAPH
// =============================================================================

/// Nodes, edges and metadata of one diagram plus its dirty flag.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    meta: Meta,
    dirty: bool,
}

impl Graph {
    /// An empty, clean graph with default metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clean graph from loaded parts.
    ///
    /// # Errors
    ///
    /// Fails if ids collide or an edge references a missing node.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, meta: Meta) -> Result<Self, GraphError> {
        check_integrity(&nodes, &edges)?;
        Ok(Self { nodes, edges, meta, dirty: false })
    }

    // --- Queries ---

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Whether any edge points at `id`.
    #[must_use]
    pub fn has_incoming(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.target == id)
    }

    /// Edges leaving `id`, in edge order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Whether the graph changed since it was last loaded or saved.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful load or save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, GraphError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    fn edge_mut(&mut self, id: &str) -> Result<&mut Edge, GraphError> {
        self.edges
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.to_string()))
    }

    fn require_node(&self, id: &str) -> Result<(), GraphError> {
        if self.contains_node(id) { Ok(()) } else { Err(GraphError::NodeNotFound(id.to_string())) }
    }

    // --- Nodes ---

    /// Add a "New Node" at `position` (snapped). Returns the new id.
    pub fn add_node(&mut self, position: Position) -> NodeId {
        let id = format!("node_{}", Uuid::new_v4().simple());
        let node = Node::new(id.clone(), position.snapped()).with_label(NEW_NODE_LABEL);
        self.nodes.push(node);
        self.touch();
        id
    }

    /// Remove a node and every edge touching it. Returns the removed edges.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node has this id; the graph is unchanged.
    pub fn remove_node(&mut self, id: &str) -> Result<Vec<Edge>, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        self.nodes.remove(index);
        let (removed, kept): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.touches(id));
        self.edges = kept;
        self.touch();
        Ok(removed)
    }

    /// Move a node to `position`, snapped to the grid.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node has this id.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), GraphError> {
        self.node_mut(id)?.position = position.snapped();
        self.touch();
        Ok(())
    }

    /// Record the host-measured size of a node. Does not mark the graph dirty.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node has this id.
    pub fn set_node_size(&mut self, id: &str, size: Size) -> Result<(), GraphError> {
        self.node_mut(id)?.measured = Some(size);
        Ok(())
    }

    /// # Errors
    ///
    /// `NodeNotFound` if no node has this id.
    pub fn update_node_label(&mut self, id: &str, text: &str) -> Result<(), GraphError> {
        self.node_mut(id)?.label = text.to_string();
        self.touch();
        Ok(())
    }

    /// Replace a node's detail lines. Blank lines are dropped.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if no node has this id.
    pub fn update_node_details(&mut self, id: &str, lines: Vec<String>) -> Result<(), GraphError> {
        let details = lines.into_iter().filter(|l| !l.trim().is_empty()).collect();
        self.node_mut(id)?.details = details;
        self.touch();
        Ok(())
    }

    /// Apply computed placements. All ids are checked before any node moves.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` for the first unknown id; no position is changed.
    pub fn apply_positions(&mut self, placements: &[(NodeId, Position)]) -> Result<(), GraphError> {
        for (id, _) in placements {
            self.require_node(id)?;
        }
        if placements.is_empty() {
            return Ok(());
        }
        for (id, position) in placements {
            self.node_mut(id)?.position = *position;
        }
        self.touch();
        Ok(())
    }

    // --- Edges ---

    /// Connect `source` to `target`. Parallel edges and self-loops are allowed.
    /// The routing kind is derived from the handles.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if either endpoint is missing; the graph is unchanged.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<EdgeId, GraphError> {
        self.require_node(source)?;
        self.require_node(target)?;
        let id = format!("edge_{}", Uuid::new_v4().simple());
        self.edges.push(Edge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: source_handle.map(str::to_string),
            target_handle: target_handle.map(str::to_string),
            kind: EdgeKind::for_handles(source_handle, target_handle),
            label: None,
        });
        self.touch();
        Ok(id)
    }

    /// Point an existing edge at new endpoints and handles.
    ///
    /// # Errors
    ///
    /// `EdgeNotFound` or `NodeNotFound`; the edge is unchanged on failure.
    pub fn reconnect_edge(
        &mut self,
        id: &str,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<(), GraphError> {
        self.require_node(source)?;
        self.require_node(target)?;
        let edge = self.edge_mut(id)?;
        edge.source = source.to_string();
        edge.target = target.to_string();
        edge.source_handle = source_handle.map(str::to_string);
        edge.target_handle = target_handle.map(str::to_string);
        edge.kind = EdgeKind::for_handles(source_handle, target_handle);
        self.touch();
        Ok(())
    }

    /// # Errors
    ///
    /// `EdgeNotFound` if no edge has this id.
    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| GraphError::EdgeNotFound(id.to_string()))?;
        let edge = self.edges.remove(index);
        self.touch();
        Ok(edge)
    }

    /// Set an edge label. An empty string clears it.
    ///
    /// # Errors
    ///
    /// `EdgeNotFound` if no edge has this id.
    pub fn update_edge_label(&mut self, id: &str, text: &str) -> Result<(), GraphError> {
        let label = if text.is_empty() { None } else { Some(text.to_string()) };
        self.edge_mut(id)?.label = label;
        self.touch();
        Ok(())
    }

    /// Delete a selection: the listed nodes, the listed edges, and every edge
    /// touching a deleted node. Unknown ids are ignored. Returns the number of
    /// nodes and edges removed.
    pub fn remove_selection(&mut self, node_ids: &[NodeId], edge_ids: &[EdgeId]) -> (usize, usize) {
        let nodes_before = self.nodes.len();
        let edges_before = self.edges.len();
        self.nodes.retain(|n| !node_ids.contains(&n.id));
        self.edges
            .retain(|e| !edge_ids.contains(&e.id) && !node_ids.contains(&e.source) && !node_ids.contains(&e.target));
        let removed = (nodes_before - self.nodes.len(), edges_before - self.edges.len());
        if removed != (0, 0) {
            self.touch();
        }
        removed
    }

    // --- Whole graph ---

    /// Swap in a complete new diagram. Validated first; on error nothing changes.
    ///
    /// # Errors
    ///
    /// Duplicate ids or dangling edges in the incoming parts.
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>, meta: Meta) -> Result<(), GraphError> {
        check_integrity(&nodes, &edges)?;
        self.nodes = nodes;
        self.edges = edges;
        self.meta = meta;
        self.touch();
        Ok(())
    }

    /// Rename the diagram (`meta.name`).
    pub fn set_name(&mut self, name: &str) {
        if self.meta.name != name {
            self.meta.name = name.to_string();
            self.touch();
        }
    }

    pub fn set_notes(&mut self, notes: &str) {
        if self.meta.notes != notes {
            self.meta.notes = notes.to_string();
            self.touch();
        }
    }
}
