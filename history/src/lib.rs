//! Versioning engines for the trellis canvas document.
//!
//! Two orthogonal history axes over the same project document:
//!
//! - [`delta`]: per-node, delta-compressed history of a generated text
//!   field. Patch chains anchored at a base snapshot, replayable to any
//!   recorded state.
//! - [`undo`]: project-level undo/redo over structural graph edits
//!   (node/edge add and remove), using full-object snapshots.
//!
//! Both engines are pure: they take a document value and return a new one,
//! never mutating in place and never performing I/O. Expected failures
//! (empty stack, unknown version id) come back as outcome flags with the
//! document unchanged; recoverable degradations are logged via `tracing`.

mod delta;
mod error;
mod migrate;
mod undo;

pub use delta::DisplayEntry;
pub use delta::MemoryStats;
pub use delta::SwitchOutcome;
pub use delta::VersionTarget;
pub use delta::current_content;
pub use delta::current_version_description;
pub use delta::describe_version;
pub use delta::has_history;
pub use delta::history_count;
pub use delta::history_for_display;
pub use delta::is_showing_historical_version;
pub use delta::memory_stats;
pub use delta::reconstruct;
pub use delta::record_version;
pub use delta::switch_version;
pub use error::HistoryError;
pub use migrate::HistoryFootprint;
pub use migrate::MigrationStats;
pub use migrate::history_footprint;
pub use migrate::migrate_node;
pub use migrate::migrate_project;
pub use migrate::needs_migration;
pub use migrate::prepare_for_save;
pub use undo::MAX_UNDO_ENTRIES;
pub use undo::UndoOutcome;
pub use undo::can_redo;
pub use undo::can_undo;
pub use undo::push_undo;
pub use undo::redo;
pub use undo::redo_description;
pub use undo::undo;
pub use undo::undo_description;
