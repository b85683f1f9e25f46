use time::macros::{date, datetime};

use super::*;
use crate::graph::{Meta, Node, Position};

fn graph_with_label(label: &str) -> Graph {
    let node = Node::new("a", Position::new(0.0, 0.0)).with_label(label);
    Graph::from_parts(vec![node], vec![], Meta::default()).unwrap()
}

#[test]
fn export_file_name_is_dated() {
    assert_eq!(export_file_name(date!(2025 - 02 - 03)), "flowstep-viewer-2025-02-03.html");
}

#[test]
fn snapshot_uses_flow_name_or_fallback() {
    let graph = graph_with_label("A");
    let now = datetime!(2025-06-01 12:30:00 UTC);

    let named = snapshot(&graph, Some("Checkout"), now);
    assert_eq!(named.meta.name, "Checkout");
    assert_eq!(named.meta.notes, "Snapshot: 2025-06-01 12:30:00 UTC");

    let unnamed = snapshot(&graph, None, now);
    assert_eq!(unnamed.meta.name, "FlowStep export");
}

#[test]
fn viewer_embeds_data_and_theme() {
    let snap = snapshot(&graph_with_label("Hello"), Some("Demo"), datetime!(2025-01-01 00:00:00 UTC));
    let html = build_viewer_html(&snap, "#ABC").unwrap();

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("const THEME_COLOR = \"#aabbcc\";"));
    assert!(html.contains("\"label\":\"Hello\""));
    assert!(!html.contains(DATA_SLOT));
    assert!(!html.contains(THEME_SLOT));
}

#[test]
fn viewer_escapes_angle_brackets_in_data() {
    let snap = snapshot(&graph_with_label("</script><b>x"), None, datetime!(2025-01-01 00:00:00 UTC));
    let html = build_viewer_html(&snap, "#6366f1").unwrap();

    assert!(html.contains("\\u003c/script>\\u003cb>x"));
    assert_eq!(html.matches("</script>").count(), VIEWER_TEMPLATE.matches("</script>").count());
}

#[test]
fn viewer_falls_back_to_default_theme() {
    let snap = snapshot(&graph_with_label("A"), None, datetime!(2025-01-01 00:00:00 UTC));
    let html = build_viewer_html(&snap, "not-a-color").unwrap();
    assert!(html.contains("const THEME_COLOR = \"#6366f1\";"));
}

#[test]
fn slot_text_inside_labels_is_left_alone() {
    let snap = snapshot(&graph_with_label(THEME_SLOT), None, datetime!(2025-01-01 00:00:00 UTC));
    let html = build_viewer_html(&snap, "#6366f1").unwrap();
    assert!(html.contains(&format!("\"label\":\"{THEME_SLOT}\"")));
}

#[tokio::test]
async fn write_viewer_creates_dated_file() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot(&graph_with_label("A"), None, datetime!(2025-01-01 00:00:00 UTC));

    let path = write_viewer(dir.path(), &snap, "#6366f1", date!(2025 - 01 - 01)).await.unwrap();
    assert_eq!(path, dir.path().join("flowstep-viewer-2025-01-01.html"));
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("FlowStep Viewer"));
}

#[tokio::test]
async fn write_viewer_reports_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let snap = snapshot(&graph_with_label("A"), None, datetime!(2025-01-01 00:00:00 UTC));
    let err = write_viewer(&dir.path().join("missing"), &snap, "#6366f1", date!(2025 - 01 - 01))
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Io { .. }));
}
