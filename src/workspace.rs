//! Workspace synchronizer: one in-memory graph kept in step with a folder of
//! diagram files.
//!
//! DESIGN
//! ======
//! A [`Workspace`] owns the folder capability, the listing, the selected
//! entry, the graph and the sequence engine. It moves between three states:
//!
//! - `Disconnected`: no folder; the graph is free-standing.
//! - `Connected`: a folder and its listing, nothing selected.
//! - `FlowLoaded`: an entry is selected and the graph mirrors its file,
//!   plus whatever unsaved edits the dirty flag reports.
//!
//! Every operation takes `&mut self`, so graph edits cannot interleave with
//! an in-flight storage call. Operations that swap the graph return the
//! sequence engine to idle.
//!
//! Prompts are parameters. Anything the editor would ask the user about takes
//! a [`Confirmation`]; a declined confirmation is [`Outcome::Cancelled`], never
//! an error.
//!
//! ERROR HANDLING
//! ==============
//! Storage and validation failures leave the graph exactly as it was. The
//! folder scan is the exception to fail-fast: an unreadable or invalid file is
//! logged and skipped so one bad file cannot hide the rest.

#[cfg(test)]
#[path = "workspace_test.rs"]
mod workspace_test;

use std::collections::HashSet;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::consts::RESERVED_FILE_NAME;
use crate::error::ErrorCode;
use crate::export;
use crate::format::{self, DiagramFile, FormatError};
use crate::graph::{Graph, GraphError};
use crate::sequence::SequenceEngine;
use crate::storage::{CreateMode, EntryKind, Storage, StorageError};
use crate::template;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Validation(#[from] FormatError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("a flow named {0} already exists")]
    DuplicateName(String),
    #[error("flow name cannot be empty")]
    EmptyName,
    #[error("{0} is reserved")]
    ReservedName(String),
    #[error("connect a workspace folder first")]
    NoWorkspace,
    #[error("select a flow first")]
    NoSelection,
    #[error("select {0} before changing it")]
    NotSelected(String),
    #[error("no flow named {0} in this workspace")]
    UnknownEntry(String),
}

impl ErrorCode for WorkspaceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::DuplicateName(_) => "E_DUPLICATE_NAME",
            Self::EmptyName => "E_EMPTY_NAME",
            Self::ReservedName(_) => "E_RESERVED_NAME",
            Self::NoWorkspace => "E_NO_WORKSPACE",
            Self::NoSelection => "E_NO_SELECTION",
            Self::NotSelected(_) => "E_NOT_SELECTED",
            Self::UnknownEntry(_) => "E_UNKNOWN_ENTRY",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// One diagram file in the connected folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEntry {
    /// File name without the diagram extension.
    pub name: String,
    /// File name in storage.
    pub file_name: String,
}

impl WorkspaceEntry {
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Self {
        Self { name: format::display_name(file_name).to_string(), file_name: file_name.to_string() }
    }
}

/// The user's answer to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Result of an operation that may be declined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Cancelled,
    /// Applied, but the named old file could not be removed.
    OrphanedFile(String),
}

/// Which of the three workspace states is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    Disconnected,
    Connected,
    FlowLoaded { dirty: bool },
}

// =============================================================================
// SCAN
// =============================================================================

/// Whether a listed file name is a diagram candidate.
#[must_use]
pub fn is_candidate(file_name: &str) -> bool {
    format::has_diagram_extension(file_name) && !file_name.eq_ignore_ascii_case(RESERVED_FILE_NAME)
}

/// Display-name ordering: case-insensitive, raw text breaks ties.
fn compare_entries(a: &WorkspaceEntry, b: &WorkspaceEntry) -> std::cmp::Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.name.cmp(&b.name))
}

/// List the diagram files in a folder that parse, validate and hold content.
///
/// # Errors
///
/// Only a failure to list the folder. Per-file read or validation failures
/// are logged and the file is skipped.
pub async fn scan<S: Storage + ?Sized>(storage: &S) -> Result<Vec<WorkspaceEntry>, StorageError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for item in storage.list().await? {
        if item.kind != EntryKind::File || !is_candidate(&item.name) || !seen.insert(item.name.clone()) {
            continue;
        }
        let text = match storage.read_text(&item.name).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %item.name, error = %e, "skipping unreadable flow file");
                continue;
            }
        };
        match format::parse(&text) {
            Ok(diagram) if diagram.is_empty() => debug!(file = %item.name, "skipping empty flow file"),
            Ok(_) => entries.push(WorkspaceEntry::from_file_name(&item.name)),
            Err(e) => warn!(file = %item.name, error = %e, "skipping invalid flow file"),
        }
    }
    entries.sort_by(compare_entries);
    Ok(entries)
}

async fn load_graph<S: Storage + ?Sized>(storage: &S, file_name: &str) -> Result<Graph, WorkspaceError> {
    let text = storage.read_text(file_name).await?;
    let graph = format::parse(&text)?.into_graph()?;
    Ok(graph)
}

// =============================================================================
// WORKSPACE
// =============================================================================

/// A graph synchronized with a folder of diagram files.
pub struct Workspace<S: Storage> {
    storage: Option<S>,
    listing: Vec<WorkspaceEntry>,
    selected: Option<WorkspaceEntry>,
    graph: Graph,
    sequence: SequenceEngine,
}

impl<S: Storage> Default for Workspace<S> {
    fn default() -> Self {
        Self {
            storage: None,
            listing: Vec::new(),
            selected: None,
            graph: template::default_graph(),
            sequence: SequenceEngine::new(),
        }
    }
}

impl<S: Storage> Workspace<S> {
    /// A disconnected workspace showing the starter diagram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Accessors ---

    #[must_use]
    pub fn state(&self) -> WorkspaceState {
        match (&self.storage, &self.selected) {
            (None, _) => WorkspaceState::Disconnected,
            (Some(_), None) => WorkspaceState::Connected,
            (Some(_), Some(_)) => WorkspaceState::FlowLoaded { dirty: self.graph.is_dirty() },
        }
    }

    #[must_use]
    pub fn storage(&self) -> Option<&S> {
        self.storage.as_ref()
    }

    #[must_use]
    pub fn listing(&self) -> &[WorkspaceEntry] {
        &self.listing
    }

    #[must_use]
    pub fn selected(&self) -> Option<&WorkspaceEntry> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct access to the graph's mutation API.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    #[must_use]
    pub fn sequence(&self) -> &SequenceEngine {
        &self.sequence
    }

    /// Listing entry by storage file name.
    #[must_use]
    pub fn entry(&self, file_name: &str) -> Option<&WorkspaceEntry> {
        self.listing.iter().find(|e| e.file_name == file_name)
    }

    /// Listing entry by display name or file name, ignoring case.
    #[must_use]
    pub fn find_entry(&self, name: &str) -> Option<&WorkspaceEntry> {
        self.entry(name).or_else(|| {
            self.listing
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name) || e.file_name.eq_ignore_ascii_case(name))
        })
    }

    fn is_selected(&self, file_name: &str) -> bool {
        self.selected.as_ref().is_some_and(|s| s.file_name == file_name)
    }

    fn name_taken(&self, file_name: &str) -> bool {
        self.listing.iter().any(|e| e.file_name.eq_ignore_ascii_case(file_name))
    }

    fn connected(&self) -> Result<&S, WorkspaceError> {
        self.storage.as_ref().ok_or(WorkspaceError::NoWorkspace)
    }

    fn swap_graph(&mut self, graph: Graph) {
        self.graph = graph;
        self.sequence.exit();
    }

    fn show_default(&mut self) {
        self.selected = None;
        self.swap_graph(template::default_graph());
    }

    /// Select the first listing entry, or fall back to the starter diagram.
    async fn select_first_or_default(&mut self) -> Result<(), WorkspaceError> {
        let Some(first) = self.listing.first().cloned() else {
            self.show_default();
            return Ok(());
        };
        let graph = load_graph(self.connected()?, &first.file_name).await?;
        self.selected = Some(first);
        self.swap_graph(graph);
        Ok(())
    }

    // --- Folder ---

    /// Attach a folder. The previous selection is kept and reloaded if the
    /// folder still holds it; otherwise the first flow is loaded, or the
    /// starter diagram if the folder has none.
    ///
    /// # Errors
    ///
    /// Listing failure (nothing changes) or failure to load the chosen flow
    /// (the folder stays connected, nothing is selected).
    pub async fn connect(&mut self, storage: S) -> Result<(), WorkspaceError> {
        let listing = scan(&storage).await?;
        info!(flows = listing.len(), "workspace connected");
        self.storage = Some(storage);
        self.listing = listing;

        let keep = self.selected.as_ref().and_then(|s| self.entry(&s.file_name)).cloned();
        let result = match keep {
            Some(entry) => {
                let loaded = load_graph(self.connected()?, &entry.file_name).await;
                loaded.map(|graph| {
                    self.selected = Some(entry);
                    self.swap_graph(graph);
                })
            }
            None => self.select_first_or_default().await,
        };
        if result.is_err() {
            self.selected = None;
        }
        result
    }

    /// Drop the folder. The graph stays as it is.
    pub fn disconnect(&mut self) -> Option<S> {
        self.listing.clear();
        self.selected = None;
        let storage = self.storage.take();
        if storage.is_some() {
            info!("workspace disconnected");
        }
        storage
    }

    /// Re-scan the folder. The selection survives while its file can still be
    /// read, and stays listed even if the scan skipped it (an emptied flow).
    /// A selection whose file is gone is dropped; the graph is left as is.
    ///
    /// # Errors
    ///
    /// `NoWorkspace`, or listing failure (the old listing is kept).
    pub async fn refresh(&mut self) -> Result<(), WorkspaceError> {
        self.listing = scan(self.connected()?).await?;
        let Some(selected) = self.selected.clone() else {
            return Ok(());
        };
        if self.entry(&selected.file_name).is_some() {
            return Ok(());
        }
        let still_there = self.connected()?.read_text(&selected.file_name).await;
        match still_there {
            Ok(_) => self.keep_listed(&selected),
            Err(e) => {
                warn!(file = %selected.file_name, error = %e, "selected flow is no longer in the workspace");
                self.selected = None;
            }
        }
        Ok(())
    }

    /// Refresh after a change that already reached storage. A failed scan
    /// keeps the old listing; the caller patches it.
    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "workspace listing not refreshed");
        }
    }

    fn keep_listed(&mut self, entry: &WorkspaceEntry) {
        if self.entry(&entry.file_name).is_none() {
            self.listing.push(entry.clone());
            self.listing.sort_by(compare_entries);
        }
    }

    // --- Flows ---

    /// Load a flow from the listing. Unsaved edits to a different flow need a
    /// `Confirmed` answer; `Declined` leaves everything as it was.
    ///
    /// # Errors
    ///
    /// `NoWorkspace`, `UnknownEntry`, or read and validation failures. The
    /// graph is unchanged on error.
    pub async fn select_entry(
        &mut self,
        file_name: &str,
        confirmation: Confirmation,
    ) -> Result<Outcome, WorkspaceError> {
        let storage = self.connected()?;
        let entry = self.entry(file_name).cloned().ok_or_else(|| WorkspaceError::UnknownEntry(file_name.to_string()))?;
        if self.graph.is_dirty() && !self.is_selected(file_name) && confirmation == Confirmation::Declined {
            debug!(file = %file_name, "switch cancelled, unsaved changes kept");
            return Ok(Outcome::Cancelled);
        }

        let graph = load_graph(storage, file_name).await?;
        info!(file = %file_name, nodes = graph.nodes().len(), edges = graph.edges().len(), "flow loaded");
        self.selected = Some(entry);
        self.swap_graph(graph);
        Ok(Outcome::Applied)
    }

    /// Create a flow from the starter diagram and select it. Unsaved edits to
    /// the current flow are discarded.
    ///
    /// # Errors
    ///
    /// `NoWorkspace`, `EmptyName`, `ReservedName`, `DuplicateName` (also when
    /// a file by that name exists but is not listed), or storage failures.
    pub async fn create_entry(&mut self, raw_name: &str) -> Result<WorkspaceEntry, WorkspaceError> {
        let storage = self.connected()?;
        let file_name = self.checked_new_name(raw_name)?;

        let starter = template::default_graph();
        let name = format::display_name(&file_name);
        let notes = format::notes_for_save("", OffsetDateTime::now_utc());
        let text = DiagramFile::from_graph(&starter, name, &notes).to_json()?;
        write_new(storage, &file_name, &text).await?;
        info!(file = %file_name, "flow created");

        self.refresh().await?;
        self.select_entry(&file_name, Confirmation::Confirmed).await?;
        self.entry(&file_name).cloned().ok_or(WorkspaceError::UnknownEntry(file_name))
    }

    /// Save the current graph under a new name, then delete the old file.
    /// Only the selected flow can be renamed. If the old file cannot be
    /// deleted the rename still stands and the orphan is reported. The new
    /// entry stays selected and listed even if the re-scan afterwards fails
    /// or skips it.
    ///
    /// # Errors
    ///
    /// `NoWorkspace`, `NotSelected`, name errors, or failure to write the new
    /// file (the old file and the graph are untouched).
    pub async fn rename_entry(&mut self, file_name: &str, raw_name: &str) -> Result<Outcome, WorkspaceError> {
        let storage = self.connected()?;
        if !self.is_selected(file_name) {
            return Err(WorkspaceError::NotSelected(file_name.to_string()));
        }
        let new_file_name = self.checked_new_name(raw_name)?;

        let name = format::display_name(&new_file_name).to_string();
        let notes = format::notes_for_save(&self.graph.meta().notes, OffsetDateTime::now_utc());
        let text = DiagramFile::from_graph(&self.graph, &name, &notes).to_json()?;
        write_new(storage, &new_file_name, &text).await?;

        let outcome = match storage.remove(file_name).await {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                warn!(file = %file_name, error = %e, "renamed flow, old file could not be deleted");
                Outcome::OrphanedFile(file_name.to_string())
            }
        };
        info!(from = %file_name, to = %new_file_name, "flow renamed");

        self.graph.set_name(&name);
        self.graph.set_notes(&notes);
        self.graph.mark_clean();
        let entry = WorkspaceEntry::from_file_name(&new_file_name);
        self.selected = Some(entry.clone());
        self.refresh_after_write().await;
        if outcome == Outcome::Applied {
            self.listing.retain(|e| e.file_name != file_name);
        }
        self.keep_listed(&entry);
        self.selected = Some(entry);
        Ok(outcome)
    }

    /// Replace the selected flow's graph with a pasted document. The file is
    /// not written; the graph is left dirty until saved.
    ///
    /// # Errors
    ///
    /// `NotSelected`, or validation failure (the graph is unchanged).
    pub fn replace_content(&mut self, file_name: &str, text: &str) -> Result<(), WorkspaceError> {
        if !self.is_selected(file_name) {
            return Err(WorkspaceError::NotSelected(file_name.to_string()));
        }
        let diagram = format::parse(text)?;
        self.graph.replace_all(diagram.nodes, diagram.edges, diagram.meta)?;
        self.sequence.exit();
        info!(file = %file_name, "flow content replaced, unsaved");
        Ok(())
    }

    /// Delete a flow's file. Deleting the selected flow selects the first
    /// remaining one, or shows the starter diagram. A failed re-scan after
    /// the file is gone is logged and the old listing minus the entry is kept.
    ///
    /// # Errors
    ///
    /// `NoWorkspace`, `UnknownEntry`, or storage failures.
    pub async fn delete_entry(&mut self, file_name: &str, confirmation: Confirmation) -> Result<Outcome, WorkspaceError> {
        let storage = self.connected()?;
        if self.entry(file_name).is_none() {
            return Err(WorkspaceError::UnknownEntry(file_name.to_string()));
        }
        if confirmation == Confirmation::Declined {
            return Ok(Outcome::Cancelled);
        }

        storage.remove(file_name).await?;
        info!(file = %file_name, "flow deleted");

        let was_selected = self.is_selected(file_name);
        if was_selected {
            self.selected = None;
        }
        self.refresh_after_write().await;
        self.listing.retain(|e| e.file_name != file_name);
        if was_selected {
            self.select_first_or_default().await?;
        }
        Ok(Outcome::Applied)
    }

    /// Write the graph to the selected flow's file and clear the dirty flag.
    ///
    /// # Errors
    ///
    /// `NoWorkspace`, `NoSelection`, or storage failure (the graph stays
    /// dirty).
    pub async fn save(&mut self) -> Result<(), WorkspaceError> {
        let storage = self.connected()?;
        let selected = self.selected.as_ref().ok_or(WorkspaceError::NoSelection)?;

        let notes = format::notes_for_save(&self.graph.meta().notes, OffsetDateTime::now_utc());
        let text = DiagramFile::from_graph(&self.graph, &selected.name, &notes).to_json()?;
        storage.write_text(&selected.file_name, &text).await?;
        info!(file = %selected.file_name, "flow saved");

        let name = selected.name.clone();
        self.graph.set_name(&name);
        self.graph.set_notes(&notes);
        self.graph.mark_clean();
        Ok(())
    }

    /// Replace the graph with the starter diagram. The result is dirty when a
    /// flow is selected, since it now differs from that flow's file.
    ///
    /// # Errors
    ///
    /// None in practice; the starter diagram always passes integrity checks.
    pub fn reset_to_default(&mut self, confirmation: Confirmation) -> Result<Outcome, WorkspaceError> {
        if confirmation == Confirmation::Declined {
            return Ok(Outcome::Cancelled);
        }
        let starter = template::default_diagram();
        self.graph.replace_all(starter.nodes, starter.edges, starter.meta)?;
        if self.selected.is_none() {
            self.graph.mark_clean();
        }
        self.sequence.exit();
        info!("graph reset to starter diagram");
        Ok(Outcome::Applied)
    }

    /// Frozen copy of the current graph for the portable viewer. A dirty graph
    /// is exported as it stands.
    #[must_use]
    pub fn export_snapshot(&self) -> DiagramFile {
        if self.graph.is_dirty() {
            warn!("exporting unsaved changes");
        }
        export::snapshot(&self.graph, self.selected.as_ref().map(|s| s.name.as_str()), OffsetDateTime::now_utc())
    }

    fn checked_new_name(&self, raw_name: &str) -> Result<String, WorkspaceError> {
        let file_name = format::sanitize_file_name(raw_name).ok_or(WorkspaceError::EmptyName)?;
        if file_name.eq_ignore_ascii_case(RESERVED_FILE_NAME) {
            return Err(WorkspaceError::ReservedName(file_name));
        }
        if self.name_taken(&file_name) {
            return Err(WorkspaceError::DuplicateName(file_name));
        }
        Ok(file_name)
    }

    // --- Sequence ---

    pub fn enter_sequence(&mut self) {
        self.sequence.enter(&self.graph);
    }

    pub fn advance_sequence(&mut self) -> usize {
        self.sequence.advance(&self.graph)
    }

    pub fn click_node(&mut self, id: &str) -> bool {
        self.sequence.click(&self.graph, id)
    }

    pub fn reset_sequence(&mut self) {
        self.sequence.reset(&self.graph);
    }

    pub fn exit_sequence(&mut self) {
        self.sequence.exit();
    }
}

/// Create `file_name` without clobbering and fill it. A half-created file is
/// removed again when the write fails.
async fn write_new<S: Storage + ?Sized>(storage: &S, file_name: &str, text: &str) -> Result<(), WorkspaceError> {
    match storage.create(file_name, CreateMode::New).await {
        Ok(()) => {}
        Err(StorageError::AlreadyExists(_)) => return Err(WorkspaceError::DuplicateName(file_name.to_string())),
        Err(e) => return Err(e.into()),
    }
    if let Err(e) = storage.write_text(file_name, text).await {
        if let Err(cleanup) = storage.remove(file_name).await {
            warn!(file = %file_name, error = %cleanup, "could not remove partially created flow");
        }
        return Err(e.into());
    }
    Ok(())
}
