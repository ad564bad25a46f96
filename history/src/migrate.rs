//! Explicit schema migration and the save-size guard.
//!
//! Schema 1 is the retired full-snapshot era: version entries carried a
//! `data` payload holding whole node states. Schema 2 stores delta chains.
//! Documents are migrated once, up front, instead of field-sniffing on
//! every engine call.

use tracing::debug;
use tracing::warn;
use trellis_protocol::DeltaVersion;
use trellis_protocol::Node;
use trellis_protocol::ProjectContent;
use trellis_protocol::SCHEMA_VERSION;
use trellis_protocol::VersionedText;

use crate::error::HistoryError;

/// Serialized version bytes above which [`prepare_for_save`] clears history.
const MAX_HISTORY_BYTES: usize = 500 * 1024;

/// Counters reported by a migration pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// Nodes that carried content or history.
    pub nodes_processed: usize,
    /// Version entries dropped.
    pub versions_cleared: usize,
    /// Estimated serialized bytes freed by the dropped entries.
    pub bytes_freed: usize,
}

impl MigrationStats {
    fn absorb(&mut self, other: MigrationStats) {
        self.nodes_processed += other.nodes_processed;
        self.versions_cleared += other.versions_cleared;
        self.bytes_freed += other.bytes_freed;
    }
}

/// Whether the document predates the current schema.
pub fn needs_migration(project: &ProjectContent) -> bool {
    project.schema_version < SCHEMA_VERSION
}

/// Migrate one node's content: drop retired full-snapshot entries, keep
/// usable delta entries, and unpin if the pointer dangles afterwards.
pub fn migrate_node(
    content: &VersionedText,
) -> Result<(VersionedText, MigrationStats), HistoryError> {
    let (kept, dropped): (Vec<DeltaVersion>, Vec<DeltaVersion>) = content
        .versions
        .iter()
        .cloned()
        .partition(|v| v.is_valid_delta());

    let mut stats = MigrationStats {
        nodes_processed: usize::from(!content.versions.is_empty() || !content.text.is_empty()),
        versions_cleared: dropped.len(),
        bytes_freed: 0,
    };
    if !dropped.is_empty() {
        stats.bytes_freed = serde_json::to_string(&dropped)?.len();
    }

    let pointer_dangles = content
        .current_version_pointer
        .as_deref()
        .is_some_and(|id| !kept.iter().any(|v| v.id == id));

    let migrated = if pointer_dangles {
        // The displayed version no longer exists; fall back to the real
        // latest text before dropping the stash.
        VersionedText {
            text: content
                .latest_stash
                .clone()
                .unwrap_or_else(|| content.text.clone()),
            versions: kept,
            current_version_pointer: None,
            latest_stash: None,
        }
    } else {
        VersionedText {
            text: content.text.clone(),
            versions: kept,
            current_version_pointer: content.current_version_pointer.clone(),
            latest_stash: content.latest_stash.clone(),
        }
    };
    Ok((migrated, stats))
}

/// One-time migration of a whole project document to the current schema.
///
/// A document already at the current schema comes back unchanged with
/// empty stats.
pub fn migrate_project(
    project: &ProjectContent,
) -> Result<(ProjectContent, MigrationStats), HistoryError> {
    if !needs_migration(project) {
        return Ok((project.clone(), MigrationStats::default()));
    }

    let mut stats = MigrationStats::default();
    let mut nodes = Vec::with_capacity(project.nodes.len());
    for node in &project.nodes {
        let (migrated, node_stats) = migrate_node(node.body.content())?;
        stats.absorb(node_stats);
        let mut node = node.clone();
        *node.body.content_mut() = migrated;
        nodes.push(node);
    }

    if stats.versions_cleared > 0 {
        debug!(
            nodes = stats.nodes_processed,
            versions = stats.versions_cleared,
            bytes = stats.bytes_freed,
            "dropped retired full-snapshot version entries during migration"
        );
    }

    Ok((
        ProjectContent {
            schema_version: SCHEMA_VERSION,
            nodes,
            ..project.clone()
        },
        stats,
    ))
}

/// Serialized footprint of all version chains in a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFootprint {
    pub total_versions: usize,
    pub estimated_bytes: usize,
}

impl HistoryFootprint {
    /// Whether the footprint exceeds the save budget.
    pub fn is_oversize(&self) -> bool {
        self.estimated_bytes > MAX_HISTORY_BYTES
    }
}

/// Total up the serialized size of every node's version chain.
pub fn history_footprint(project: &ProjectContent) -> Result<HistoryFootprint, HistoryError> {
    let mut footprint = HistoryFootprint::default();
    for node in &project.nodes {
        let versions = &node.body.content().versions;
        if versions.is_empty() {
            continue;
        }
        footprint.total_versions += versions.len();
        footprint.estimated_bytes += serde_json::to_string(versions)?.len();
    }
    Ok(footprint)
}

/// Guard a document against blowing the persistence size budget.
///
/// Below the budget the project comes back unchanged. Above it, every
/// node's version chain is cleared and pinned nodes are returned to their
/// stashed latest text, keeping only the live content.
pub fn prepare_for_save(project: &ProjectContent) -> Result<ProjectContent, HistoryError> {
    let footprint = history_footprint(project)?;
    if !footprint.is_oversize() {
        return Ok(project.clone());
    }

    warn!(
        total_versions = footprint.total_versions,
        estimated_bytes = footprint.estimated_bytes,
        "version history exceeds save budget; clearing all chains"
    );

    let nodes: Vec<Node> = project
        .nodes
        .iter()
        .map(|node| {
            let content = node.body.content();
            let cleared = VersionedText {
                // Unpin before dropping the stash so the latest text wins.
                text: content
                    .latest_stash
                    .clone()
                    .unwrap_or_else(|| content.text.clone()),
                versions: Vec::new(),
                current_version_pointer: None,
                latest_stash: None,
            };
            let mut node = node.clone();
            *node.body.content_mut() = cleared;
            node
        })
        .collect();

    Ok(ProjectContent {
        nodes,
        ..project.clone()
    })
}
