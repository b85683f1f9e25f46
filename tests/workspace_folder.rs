//! Workspace operations against a real folder on disk.

use std::path::Path;

use serde_json::json;

use flowstep::export;
use flowstep::graph::Position;
use flowstep::storage::FsStorage;
use flowstep::workspace::{Confirmation, Outcome, Workspace, WorkspaceState};

fn flow_text(label: &str) -> String {
    json!({
        "meta": { "name": label, "format": "reactflow-compatible", "notes": "" },
        "nodes": [{ "id": "n1", "position": { "x": 0, "y": 0 }, "data": { "label": label } }],
        "edges": []
    })
    .to_string()
}

fn seed(dir: &Path) {
    std::fs::write(dir.join("alpha.json"), flow_text("Alpha")).unwrap();
    std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
    std::fs::write(dir.join("empty.json"), r#"{"nodes":[],"edges":[]}"#).unwrap();
    std::fs::write(dir.join("default.json"), flow_text("Reserved")).unwrap();
    std::fs::write(dir.join("notes.txt"), "hello").unwrap();
    std::fs::create_dir(dir.join("nested.json")).unwrap();
}

async fn connect(dir: &Path) -> Workspace<FsStorage> {
    let mut ws = Workspace::new();
    ws.connect(FsStorage::open(dir).await.unwrap()).await.unwrap();
    ws
}

fn listed(ws: &Workspace<FsStorage>) -> Vec<&str> {
    ws.listing().iter().map(|e| e.file_name.as_str()).collect()
}

#[tokio::test]
async fn connect_lists_only_valid_flows_and_loads_first() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let ws = connect(dir.path()).await;
    assert_eq!(listed(&ws), vec!["alpha.json"]);
    assert_eq!(ws.selected().unwrap().name, "alpha");
    assert_eq!(ws.graph().nodes()[0].label, "Alpha");
    assert_eq!(ws.state(), WorkspaceState::FlowLoaded { dirty: false });
}

#[tokio::test]
async fn saved_edits_survive_a_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let mut ws = connect(dir.path()).await;
    let id = ws.graph_mut().add_node(Position::new(30.0, 45.0));
    ws.graph_mut().update_node_label(&id, "Second").unwrap();
    assert!(ws.graph().is_dirty());
    ws.save().await.unwrap();
    assert!(!ws.graph().is_dirty());

    let reopened = connect(dir.path()).await;
    let labels: Vec<&str> = reopened.graph().nodes().iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["Alpha", "Second"]);
    assert!(reopened.graph().meta().notes.starts_with("Last updated: "));
}

#[tokio::test]
async fn create_rename_delete_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let mut ws = connect(dir.path()).await;

    let created = ws.create_entry("Checkout").await.unwrap();
    assert_eq!(created.file_name, "Checkout.json");
    assert!(dir.path().join("Checkout.json").exists());
    assert_eq!(listed(&ws), vec!["alpha.json", "Checkout.json"]);
    assert_eq!(ws.graph().nodes().len(), 3);

    let outcome = ws.rename_entry("Checkout.json", "Payments").await.unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert!(!dir.path().join("Checkout.json").exists());
    assert!(dir.path().join("Payments.json").exists());
    assert_eq!(ws.selected().unwrap().file_name, "Payments.json");
    assert_eq!(ws.graph().meta().name, "Payments");

    let kept = ws.delete_entry("Payments.json", Confirmation::Declined).await.unwrap();
    assert_eq!(kept, Outcome::Cancelled);
    assert!(dir.path().join("Payments.json").exists());

    ws.delete_entry("Payments.json", Confirmation::Confirmed).await.unwrap();
    assert!(!dir.path().join("Payments.json").exists());
    assert_eq!(ws.selected().unwrap().file_name, "alpha.json");
}

#[tokio::test]
async fn create_refuses_existing_unlisted_file() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let mut ws = connect(dir.path()).await;

    let err = ws.create_entry("broken").await.unwrap_err();
    assert_eq!(err.to_string(), "a flow named broken.json already exists");
    assert_eq!(std::fs::read_to_string(dir.path().join("broken.json")).unwrap(), "{ not json");
}

#[tokio::test]
async fn export_writes_viewer_for_selected_flow() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());
    let ws = connect(dir.path()).await;
    let out = tempfile::tempdir().unwrap();

    let snapshot = ws.export_snapshot();
    assert_eq!(snapshot.meta.name, "alpha");
    let path = out.path().join("alpha.html");
    export::write_viewer_to(&path, &snapshot, "#6366f1").await.unwrap();

    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("\"label\":\"Alpha\""));
}
