//! Diagram engine for FlowStep: labeled steps joined by labeled transitions,
//! stored as one JSON file per diagram in a user-chosen folder, and replayed
//! as a guided step-by-step reveal.
//!
//! The crate holds no rendering code. A host UI (or the bundled CLI) calls
//! into the [`workspace::Workspace`] synchronizer and the [`graph::Graph`]
//! mutation API; layout and sequence playback are pure computations over a
//! graph snapshot.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`graph`] | Nodes, edges, metadata and the invariant-preserving mutation API |
//! | [`layout`] | Align / distribute placement for a node selection |
//! | [`sequence`] | Reveal state machine for sequence playback |
//! | [`format`] | Diagram file validation, normalization and serialization |
//! | [`template`] | Built-in default diagram |
//! | [`storage`] | Folder capability trait plus filesystem and in-memory backends |
//! | [`workspace`] | Folder ↔ graph synchronization, selection and dirty tracking |
//! | [`export`] | Self-contained HTML viewer export |
//! | [`color`] | Theme accent color normalization |
//! | [`config`] | Environment-driven settings |
//! | [`error`] | Error-code trait shared by every module error |
//! | [`consts`] | Shared constants (grid step, default sizes, file names) |

pub mod color;
pub mod config;
pub mod consts;
pub mod error;
pub mod export;
pub mod format;
pub mod graph;
pub mod layout;
pub mod sequence;
pub mod storage;
pub mod template;
pub mod workspace;
