//! Portable viewer export: one HTML file with the diagram frozen inside.
//!
//! The viewer is a static page with Reader and Sequence modes that applies the
//! same reveal rules as [`crate::sequence`]. The snapshot and accent color are
//! embedded as script literals; every `<` in them is written as `\u003c` so
//! no value can close the script element.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::path::{Path, PathBuf};

use time::{Date, OffsetDateTime};
use tracing::info;

use crate::color::normalize_hex_color;
use crate::consts::{DEFAULT_THEME_COLOR, EXPORT_FALLBACK_NAME};
use crate::format::{self, DiagramFile};
use crate::graph::Graph;

const VIEWER_TEMPLATE: &str = include_str!("viewer.html");
const DATA_SLOT: &str = "__FLOWSTEP_DATA__";
const THEME_SLOT: &str = "__FLOWSTEP_THEME__";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("snapshot serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl crate::error::ErrorCode for ExportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Json(_) => "E_EXPORT_SERIALIZE",
            Self::Io { .. } => "E_EXPORT_IO",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Frozen copy of a graph for export, named after the flow (or a generic
/// export name) and stamped with the snapshot time.
#[must_use]
pub fn snapshot(graph: &Graph, flow_name: Option<&str>, now: OffsetDateTime) -> DiagramFile {
    let name = flow_name.unwrap_or(EXPORT_FALLBACK_NAME);
    let notes = format!("Snapshot: {}", format::timestamp(now));
    DiagramFile::from_graph(graph, name, &notes)
}

/// `flowstep-viewer-YYYY-MM-DD.html`
#[must_use]
pub fn export_file_name(date: Date) -> String {
    format!("flowstep-viewer-{:04}-{:02}-{:02}.html", date.year(), u8::from(date.month()), date.day())
}

fn script_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ExportError> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

/// Render the viewer page for a snapshot. An unusable accent color falls back
/// to the default.
///
/// # Errors
///
/// Serialization failure of the snapshot.
pub fn build_viewer_html(snapshot: &DiagramFile, theme_color: &str) -> Result<String, ExportError> {
    let theme = normalize_hex_color(theme_color, DEFAULT_THEME_COLOR);
    let theme_literal = script_literal(&theme)?;
    let data_literal = script_literal(snapshot)?;
    // Data goes in last so text inside the diagram is never treated as a slot.
    Ok(VIEWER_TEMPLATE.replace(THEME_SLOT, &theme_literal).replace(DATA_SLOT, &data_literal))
}

/// Write the viewer page into `dir` under the dated export name.
///
/// # Errors
///
/// Serialization or write failure.
pub async fn write_viewer(
    dir: &Path,
    snapshot: &DiagramFile,
    theme_color: &str,
    date: Date,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(export_file_name(date));
    write_viewer_to(&path, snapshot, theme_color).await?;
    Ok(path)
}

/// Write the viewer page to an explicit path.
///
/// # Errors
///
/// Serialization or write failure.
pub async fn write_viewer_to(path: &Path, snapshot: &DiagramFile, theme_color: &str) -> Result<(), ExportError> {
    let html = build_viewer_html(snapshot, theme_color)?;
    tokio::fs::write(path, html)
        .await
        .map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;
    info!(path = %path.display(), nodes = snapshot.nodes.len(), "viewer exported");
    Ok(())
}
