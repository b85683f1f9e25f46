//! Shared constants for the diagram engine.

// ── Geometry ────────────────────────────────────────────────────

/// Grid step in world units. Node positions snap to multiples of this.
pub const GRID_STEP: f64 = 15.0;

/// Width assumed for a node the host has not measured yet.
pub const DEFAULT_NODE_WIDTH: f64 = 256.0;

/// Height assumed for a node the host has not measured yet.
pub const DEFAULT_NODE_HEIGHT: f64 = 60.0;

/// Unsnapped insertion point for nodes created with "add node".
pub const NEW_NODE_X: f64 = 120.0;

/// See [`NEW_NODE_X`].
pub const NEW_NODE_Y: f64 = 200.0;

// ── Diagram content ─────────────────────────────────────────────

/// Label given to freshly added nodes.
pub const NEW_NODE_LABEL: &str = "New Node";

/// Node type written when a node carries none.
pub const DEFAULT_NODE_KIND: &str = "custom";

/// Schema version written to every diagram file.
pub const FORMAT_VERSION: u64 = 1;

/// Format tag written to `meta.format` when a document carries none.
pub const DEFAULT_FORMAT_TAG: &str = "reactflow-compatible";

/// Diagram name used when `meta.name` is absent.
pub const UNTITLED_NAME: &str = "Untitled";

/// Diagram name used for viewer exports with no selected entry.
pub const EXPORT_FALLBACK_NAME: &str = "FlowStep export";

/// Prefix of the auto-generated `meta.notes` stamp.
pub const NOTES_STAMP_PREFIX: &str = "Last updated: ";

// ── Workspace ───────────────────────────────────────────────────

/// Extension (lowercase, with dot) of diagram files.
pub const DIAGRAM_EXTENSION: &str = ".json";

/// Bootstrap file name that is never listed as a diagram (compared lowercase).
pub const RESERVED_FILE_NAME: &str = "default.json";

// ── Theme ───────────────────────────────────────────────────────

/// Accent color used when none is configured.
pub const DEFAULT_THEME_COLOR: &str = "#6366f1";
