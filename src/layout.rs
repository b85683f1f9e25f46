//! Align and distribute placement for a node selection.
//!
//! DESIGN
//! ======
//! Pure functions over a graph snapshot. The caller passes the selection in
//! selection order; the first selected node is the anchor and never moves.
//! The result is a list of new positions for the other selected nodes. The
//! caller applies them with [`Graph::apply_positions`], which is where the
//! dirty flag is raised.
//!
//! Every result is grid-snapped except `AlignYCenter`, which places nodes at
//! the exact vertical center of the anchor. Existing diagrams depend on that
//! placement, so it is kept.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use std::str::FromStr;

use tracing::debug;

use crate::graph::{Graph, Node, NodeId, Position, snap};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("select 2+ nodes (got {0})")]
    InsufficientSelection(usize),
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("unknown layout mode: {0}")]
    UnknownMode(String),
}

impl crate::error::ErrorCode for LayoutError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientSelection(_) => "E_INSUFFICIENT_SELECTION",
            Self::NodeNotFound(_) => "E_NODE_NOT_FOUND",
            Self::UnknownMode(_) => "E_UNKNOWN_LAYOUT_MODE",
        }
    }
}

/// Alignment / distribution operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    AlignLeft,
    AlignRight,
    AlignXCenter,
    AlignYCenter,
    DistributeHorizontal,
    DistributeVertical,
}

impl LayoutMode {
    pub const ALL: [Self; 6] = [
        Self::AlignLeft,
        Self::AlignRight,
        Self::AlignXCenter,
        Self::AlignYCenter,
        Self::DistributeHorizontal,
        Self::DistributeVertical,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlignLeft => "align-left",
            Self::AlignRight => "align-right",
            Self::AlignXCenter => "align-x-center",
            Self::AlignYCenter => "align-y-center",
            Self::DistributeHorizontal => "distribute-h",
            Self::DistributeVertical => "distribute-v",
        }
    }
}

impl FromStr for LayoutMode {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "align-left" => Ok(Self::AlignLeft),
            "align-right" => Ok(Self::AlignRight),
            "align-x-center" => Ok(Self::AlignXCenter),
            "align-y-center" => Ok(Self::AlignYCenter),
            "distribute-h" | "distribute-horizontal" => Ok(Self::DistributeHorizontal),
            "distribute-v" | "distribute-vertical" => Ok(Self::DistributeVertical),
            other => Err(LayoutError::UnknownMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute new positions for every non-anchor node in `selection`.
///
/// Duplicate ids in the selection are ignored after their first occurrence.
///
/// # Errors
///
/// `InsufficientSelection` for fewer than two distinct nodes, `NodeNotFound`
/// if a selected id is not in the graph.
pub fn compute(graph: &Graph, selection: &[NodeId], mode: LayoutMode) -> Result<Vec<(NodeId, Position)>, LayoutError> {
    let selected = resolve_selection(graph, selection)?;
    let [anchor, rest @ ..] = selected.as_slice() else {
        return Err(LayoutError::InsufficientSelection(0));
    };

    let placements = match mode {
        LayoutMode::AlignLeft
        | LayoutMode::AlignRight
        | LayoutMode::AlignXCenter
        | LayoutMode::AlignYCenter => rest
            .iter()
            .map(|node| (node.id.clone(), align(anchor, node, mode)))
            .collect(),
        LayoutMode::DistributeHorizontal => distribute(&selected, anchor, |p| p.x, |p, v| Position { x: v, ..p }),
        LayoutMode::DistributeVertical => distribute(&selected, anchor, |p| p.y, |p, v| Position { y: v, ..p }),
    };

    debug!(mode = %mode, anchor = %anchor.id, moved = rest.len(), "layout computed");
    Ok(placements)
}

fn resolve_selection<'g>(graph: &'g Graph, selection: &[NodeId]) -> Result<Vec<&'g Node>, LayoutError> {
    let mut selected: Vec<&Node> = Vec::with_capacity(selection.len());
    for id in selection {
        let node = graph.node(id).ok_or_else(|| LayoutError::NodeNotFound(id.clone()))?;
        if !selected.iter().any(|n| n.id == node.id) {
            selected.push(node);
        }
    }
    if selected.len() < 2 {
        return Err(LayoutError::InsufficientSelection(selected.len()));
    }
    Ok(selected)
}

fn align(anchor: &Node, node: &Node, mode: LayoutMode) -> Position {
    let a = anchor.size();
    let s = node.size();
    let mut position = node.position;
    match mode {
        LayoutMode::AlignLeft => position.x = snap(anchor.position.x),
        LayoutMode::AlignRight => position.x = snap(anchor.position.x + a.width - s.width),
        LayoutMode::AlignXCenter => position.x = snap(anchor.position.x + a.width / 2.0 - s.width / 2.0),
        LayoutMode::AlignYCenter => position.y = anchor.position.y + a.height / 2.0 - s.height / 2.0,
        LayoutMode::DistributeHorizontal | LayoutMode::DistributeVertical => {}
    }
    position
}

/// Spread nodes evenly between the lowest and highest coordinate on one axis.
#[allow(clippy::cast_precision_loss)]
fn distribute(
    selected: &[&Node],
    anchor: &Node,
    axis: impl Fn(Position) -> f64,
    with_axis: impl Fn(Position, f64) -> Position,
) -> Vec<(NodeId, Position)> {
    let mut sorted: Vec<&Node> = selected.to_vec();
    sorted.sort_by(|a, b| axis(a.position).total_cmp(&axis(b.position)));

    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let start = axis(first.position);
    let end = axis(last.position);
    let step = (end - start) / (sorted.len() - 1) as f64;

    sorted
        .iter()
        .enumerate()
        .filter(|(_, node)| node.id != anchor.id)
        .map(|(index, node)| (node.id.clone(), with_axis(node.position, snap(start + index as f64 * step))))
        .collect()
}
