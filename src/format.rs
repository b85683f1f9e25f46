//! Diagram file format: validation, normalization and serialization.
//!
//! DESIGN
//! ======
//! Reading is three steps, all fail-closed: structural validation of the raw
//! JSON (`validate`), normalization into graph types with defaults filled in
//! (`normalize`), then an integrity pass that rejects duplicate ids and edges
//! whose endpoints are not in the node list. A document that fails any step
//! is rejected as a whole; nothing is partially loaded.
//!
//! Writing always goes through [`DiagramFile`], which mirrors the on-disk
//! layout field for field.

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, UtcOffset};

use crate::consts::{
    DEFAULT_FORMAT_TAG, DEFAULT_NODE_KIND, DIAGRAM_EXTENSION, FORMAT_VERSION, NOTES_STAMP_PREFIX, UNTITLED_NAME,
};
use crate::graph::{Edge, EdgeKind, Graph, GraphError, Meta, Node, Position, check_integrity};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document is missing `nodes` or `edges` arrays")]
    MissingCollections,
    #[error("node #{index} needs a string id and numeric position.x / position.y")]
    InvalidNode { index: usize },
    #[error("edge #{index} needs string id, source and target")]
    InvalidEdge { index: usize },
    #[error("inconsistent diagram: {0}")]
    Integrity(#[from] GraphError),
}

impl crate::error::ErrorCode for FormatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Json(_) => "E_INVALID_JSON",
            Self::MissingCollections | Self::InvalidNode { .. } | Self::InvalidEdge { .. } => "E_INVALID_DIAGRAM",
            Self::Integrity(_) => "E_INCONSISTENT_DIAGRAM",
        }
    }
}

// =============================================================================
// ON-DISK TYPES
// =============================================================================

/// A diagram document exactly as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramFile {
    pub version: u64,
    pub meta: FileMeta,
    pub nodes: Vec<FileNode>,
    pub edges: Vec<FileEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub format: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNodeData {
    pub label: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: FilePosition,
    pub data: FileNodeData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A validated, normalized diagram ready to become a [`Graph`].
#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub meta: Meta,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Diagram {
    /// Whether the diagram has neither nodes nor edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Build a clean graph from this diagram.
    ///
    /// # Errors
    ///
    /// Integrity errors; unreachable for diagrams produced by [`parse`].
    pub fn into_graph(self) -> Result<Graph, GraphError> {
        Graph::from_parts(self.nodes, self.edges, self.meta)
    }
}

// =============================================================================
// READ
// =============================================================================

/// Parse, validate and normalize a diagram document.
///
/// # Errors
///
/// Any JSON, structural or integrity failure; the document is rejected whole.
pub fn parse(text: &str) -> Result<Diagram, FormatError> {
    let value: Value = serde_json::from_str(text)?;
    validate(&value)?;
    let diagram = normalize(&value);
    check_integrity(&diagram.nodes, &diagram.edges)?;
    Ok(diagram)
}

/// Structural checks: `nodes` and `edges` arrays, node ids and numeric
/// positions, edge ids and endpoints as strings.
///
/// # Errors
///
/// The first violation found.
pub fn validate(value: &Value) -> Result<(), FormatError> {
    let (Some(nodes), Some(edges)) = (
        value.get("nodes").and_then(Value::as_array),
        value.get("edges").and_then(Value::as_array),
    ) else {
        return Err(FormatError::MissingCollections);
    };

    for (index, node) in nodes.iter().enumerate() {
        let has_id = node.get("id").is_some_and(Value::is_string);
        let position = node.get("position");
        let has_xy = ["x", "y"]
            .iter()
            .all(|axis| position.and_then(|p| p.get(axis)).is_some_and(Value::is_number));
        if !has_id || !has_xy {
            return Err(FormatError::InvalidNode { index });
        }
    }

    for (index, edge) in edges.iter().enumerate() {
        let ok = ["id", "source", "target"]
            .iter()
            .all(|key| edge.get(key).is_some_and(Value::is_string));
        if !ok {
            return Err(FormatError::InvalidEdge { index });
        }
    }
    Ok(())
}

/// Fill defaults on a document that passed [`validate`]. Empty ids become
/// `node_<index>` / `edge_<index>`; a missing or empty meta field takes its
/// default; missing details become an empty list.
#[must_use]
pub fn normalize(value: &Value) -> Diagram {
    let meta = match value.get("meta") {
        Some(meta) if meta.is_object() => Meta {
            name: non_empty_str(meta.get("name")).unwrap_or(UNTITLED_NAME).to_string(),
            format: non_empty_str(meta.get("format")).unwrap_or(DEFAULT_FORMAT_TAG).to_string(),
            notes: non_empty_str(meta.get("notes")).unwrap_or_default().to_string(),
        },
        _ => Meta::default(),
    };

    let empty = Vec::new();
    let nodes = value
        .get("nodes")
        .and_then(Value::as_array)
        .unwrap_or(&empty)
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_node(index, raw))
        .collect();
    let edges = value
        .get("edges")
        .and_then(Value::as_array)
        .unwrap_or(&empty)
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_edge(index, raw))
        .collect();

    Diagram { meta, nodes, edges }
}

fn normalize_node(index: usize, raw: &Value) -> Node {
    let id = non_empty_str(raw.get("id")).map_or_else(|| format!("node_{index}"), str::to_string);
    let position = raw.get("position");
    let coord = |axis: &str| position.and_then(|p| p.get(axis)).and_then(Value::as_f64).unwrap_or(0.0);
    let data = raw.get("data");
    let details = data
        .and_then(|d| d.get("details"))
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Node {
        id,
        kind: non_empty_str(raw.get("type")).unwrap_or(DEFAULT_NODE_KIND).to_string(),
        position: Position::new(coord("x"), coord("y")),
        label: data.and_then(|d| d.get("label")).map(label_text).unwrap_or_default(),
        details,
        measured: None,
    }
}

fn normalize_edge(index: usize, raw: &Value) -> Edge {
    let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
    Edge {
        id: non_empty_str(raw.get("id")).map_or_else(|| format!("edge_{index}"), str::to_string),
        source: text("source").unwrap_or_default(),
        target: text("target").unwrap_or_default(),
        source_handle: text("sourceHandle"),
        target_handle: text("targetHandle"),
        kind: raw.get("type").and_then(Value::as_str).map(EdgeKind::from_tag).unwrap_or_default(),
        label: raw.get("label").and_then(|l| if l.is_null() { None } else { Some(label_text(l)) }),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Labels are usually strings; numbers and booleans are kept as their text.
fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// WRITE
// =============================================================================

impl DiagramFile {
    /// Snapshot a graph under `name` with the given notes.
    #[must_use]
    pub fn from_graph(graph: &Graph, name: &str, notes: &str) -> Self {
        let meta = graph.meta();
        Self {
            version: FORMAT_VERSION,
            meta: FileMeta { name: name.to_string(), format: meta.format.clone(), notes: notes.to_string() },
            nodes: graph
                .nodes()
                .iter()
                .map(|n| FileNode {
                    id: n.id.clone(),
                    kind: if n.kind.is_empty() { DEFAULT_NODE_KIND.to_string() } else { n.kind.clone() },
                    position: FilePosition { x: n.position.x, y: n.position.y },
                    data: FileNodeData { label: n.label.clone(), details: n.details.clone() },
                })
                .collect(),
            edges: graph
                .edges()
                .iter()
                .map(|e| FileEdge {
                    id: e.id.clone(),
                    source: e.source.clone(),
                    target: e.target.clone(),
                    source_handle: e.source_handle.clone(),
                    target_handle: e.target_handle.clone(),
                    kind: e.kind.tag().map(str::to_string),
                    label: e.label.clone(),
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON, two-space indent.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `YYYY-MM-DD HH:MM:SS UTC`.
#[must_use]
pub fn timestamp(now: OffsetDateTime) -> String {
    let utc = now.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} UTC",
        utc.year(),
        u8::from(utc.month()),
        utc.day(),
        utc.hour(),
        utc.minute(),
        utc.second()
    )
}

/// Notes written on save. User notes are kept; empty notes and an earlier
/// save stamp are replaced with a fresh `Last updated:` stamp.
#[must_use]
pub fn notes_for_save(current: &str, now: OffsetDateTime) -> String {
    if current.trim().is_empty() || current.starts_with(NOTES_STAMP_PREFIX) {
        format!("{NOTES_STAMP_PREFIX}{}", timestamp(now))
    } else {
        current.to_string()
    }
}

// =============================================================================
// FILE NAMES
// =============================================================================

/// Display name for a storage file name: the diagram extension is stripped
/// case-insensitively.
#[must_use]
pub fn display_name(file_name: &str) -> &str {
    let cut = file_name.len().saturating_sub(DIAGRAM_EXTENSION.len());
    match (file_name.get(..cut), file_name.get(cut..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(DIAGRAM_EXTENSION) => stem,
        _ => file_name,
    }
}

/// Whether a file name carries the diagram extension (any case).
#[must_use]
pub fn has_diagram_extension(file_name: &str) -> bool {
    display_name(file_name).len() != file_name.len()
}

/// Storage file name for user input: trimmed, path separators removed, the
/// diagram extension appended when missing. `None` if nothing remains.
#[must_use]
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let safe: String = raw.trim().chars().filter(|c| !matches!(c, '/' | '\\')).collect();
    if safe.is_empty() {
        return None;
    }
    if has_diagram_extension(&safe) {
        Some(safe)
    } else {
        Some(format!("{safe}{DIAGRAM_EXTENSION}"))
    }
}
