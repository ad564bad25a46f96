//! Structural undo/redo for the project graph.
//!
//! Entries snapshot whole nodes and edges, never diffs. The engine only
//! rearranges the graph's node/edge arrays; a node's content-version chain
//! travels inside its snapshot untouched, keeping the two history axes
//! orthogonal.

use chrono::Utc;
use trellis_protocol::Edge;
use trellis_protocol::IdGenerator;
use trellis_protocol::Node;
use trellis_protocol::ProjectContent;
use trellis_protocol::UndoAction;
use trellis_protocol::UndoEntry;
use trellis_protocol::UndoKind;
use trellis_protocol::UndoPayload;

/// Bound on each stack; the oldest entry is evicted beyond this.
pub const MAX_UNDO_ENTRIES: usize = 20;

/// Record a structural edit about to be applied.
///
/// Called with the full before-state of the affected entities. Prepends to
/// the undo stack and clears the redo stack: any direct structural
/// mutation invalidates previously undone futures.
pub fn push_undo(
    project: &ProjectContent,
    kind: UndoKind,
    action: UndoAction,
    payload: UndoPayload,
    ids: &mut dyn IdGenerator,
) -> ProjectContent {
    let entry = UndoEntry {
        id: ids.next_id(),
        timestamp: Utc::now(),
        kind,
        action,
        payload,
    };
    ProjectContent {
        undo_stack: bounded_push(entry, &project.undo_stack),
        redo_stack: Vec::new(),
        ..project.clone()
    }
}

/// Result of an undo or redo.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoOutcome {
    pub project: ProjectContent,
    /// `false` iff the relevant stack was empty; the project is returned
    /// unchanged in that case.
    pub ok: bool,
    /// Description of the edit that was reversed or re-applied.
    pub description: Option<String>,
}

impl UndoOutcome {
    fn unchanged(project: &ProjectContent) -> Self {
        Self {
            project: project.clone(),
            ok: false,
            description: None,
        }
    }
}

/// Reverse the most recent structural edit.
pub fn undo(project: &ProjectContent, ids: &mut dyn IdGenerator) -> UndoOutcome {
    let Some((entry, remaining)) = project.undo_stack.split_first() else {
        return UndoOutcome::unchanged(project);
    };
    let (nodes, edges, counter) = apply_inverse(project, entry, ids);
    UndoOutcome {
        project: ProjectContent {
            schema_version: project.schema_version,
            nodes,
            edges,
            undo_stack: remaining.to_vec(),
            redo_stack: bounded_push(counter, &project.redo_stack),
        },
        ok: true,
        description: Some(entry.payload.description.clone()),
    }
}

/// Re-apply the most recently undone structural edit.
pub fn redo(project: &ProjectContent, ids: &mut dyn IdGenerator) -> UndoOutcome {
    let Some((entry, remaining)) = project.redo_stack.split_first() else {
        return UndoOutcome::unchanged(project);
    };
    let (nodes, edges, counter) = apply_inverse(project, entry, ids);
    UndoOutcome {
        project: ProjectContent {
            schema_version: project.schema_version,
            nodes,
            edges,
            // The counter-entry snapshots what this redo removed, so the
            // next undo can restore it again.
            undo_stack: bounded_push(counter, &project.undo_stack),
            redo_stack: remaining.to_vec(),
        },
        ok: true,
        description: Some(entry.payload.description.clone()),
    }
}

pub fn can_undo(project: &ProjectContent) -> bool {
    !project.undo_stack.is_empty()
}

pub fn can_redo(project: &ProjectContent) -> bool {
    !project.redo_stack.is_empty()
}

/// Description of the edit the next `undo` would reverse.
pub fn undo_description(project: &ProjectContent) -> Option<&str> {
    project
        .undo_stack
        .first()
        .map(|entry| entry.payload.description.as_str())
}

/// Description of the edit the next `redo` would re-apply.
pub fn redo_description(project: &ProjectContent) -> Option<&str> {
    project
        .redo_stack
        .first()
        .map(|entry| entry.payload.description.as_str())
}

/// Prepend `entry`, evicting the oldest entries past the bound.
fn bounded_push(entry: UndoEntry, stack: &[UndoEntry]) -> Vec<UndoEntry> {
    let mut out = Vec::with_capacity((stack.len() + 1).min(MAX_UNDO_ENTRIES));
    out.push(entry);
    out.extend(stack.iter().cloned());
    out.truncate(MAX_UNDO_ENTRIES);
    out
}

/// Apply the inverse of `entry` to the graph, returning the updated arrays
/// and the counter-entry that reverses this reversal.
fn apply_inverse(
    project: &ProjectContent,
    entry: &UndoEntry,
    ids: &mut dyn IdGenerator,
) -> (Vec<Node>, Vec<Edge>, UndoEntry) {
    let mut nodes = project.nodes.clone();
    let mut edges = project.edges.clone();

    let counter_payload = match entry.action {
        UndoAction::Delete => {
            // Reversal: re-insert the snapshots. The counter is an `add`
            // of the same ids.
            nodes.extend(entry.payload.nodes.iter().cloned());
            edges.extend(entry.payload.edges.iter().cloned());
            UndoPayload {
                nodes: Vec::new(),
                edges: Vec::new(),
                affected_ids: affected_ids(entry),
                description: entry.payload.description.clone(),
            }
        }
        UndoAction::Add => {
            // Reversal: remove the affected entities and any edge touching
            // them. The counter snapshots what was removed.
            let affected = affected_ids(entry);
            let removed_nodes: Vec<Node> = nodes
                .iter()
                .filter(|n| affected.contains(&n.id))
                .cloned()
                .collect();
            let removed_edges: Vec<Edge> = edges
                .iter()
                .filter(|e| edge_touches(e, &affected))
                .cloned()
                .collect();
            nodes.retain(|n| !affected.contains(&n.id));
            edges.retain(|e| !edge_touches(e, &affected));
            UndoPayload {
                nodes: removed_nodes,
                edges: removed_edges,
                affected_ids: affected,
                description: entry.payload.description.clone(),
            }
        }
        UndoAction::Modify => {
            // No caller records `modify` today; restore the payload
            // snapshots in place and counter with the displaced state.
            let displaced_nodes: Vec<Node> = entry
                .payload
                .nodes
                .iter()
                .filter_map(|snapshot| project.nodes.iter().find(|n| n.id == snapshot.id))
                .cloned()
                .collect();
            let displaced_edges: Vec<Edge> = entry
                .payload
                .edges
                .iter()
                .filter_map(|snapshot| project.edges.iter().find(|e| e.id == snapshot.id))
                .cloned()
                .collect();
            for snapshot in &entry.payload.nodes {
                if let Some(slot) = nodes.iter_mut().find(|n| n.id == snapshot.id) {
                    *slot = snapshot.clone();
                }
            }
            for snapshot in &entry.payload.edges {
                if let Some(slot) = edges.iter_mut().find(|e| e.id == snapshot.id) {
                    *slot = snapshot.clone();
                }
            }
            UndoPayload {
                nodes: displaced_nodes,
                edges: displaced_edges,
                affected_ids: entry.payload.affected_ids.clone(),
                description: entry.payload.description.clone(),
            }
        }
    };

    let counter = UndoEntry {
        id: ids.next_id(),
        timestamp: Utc::now(),
        kind: entry.kind,
        action: inverse_action(entry.action),
        payload: counter_payload,
    };
    (nodes, edges, counter)
}

fn inverse_action(action: UndoAction) -> UndoAction {
    match action {
        UndoAction::Delete => UndoAction::Add,
        UndoAction::Add => UndoAction::Delete,
        UndoAction::Modify => UndoAction::Modify,
    }
}

/// Ids the entry affects: the explicit list when present, otherwise the
/// ids of the snapshotted entities.
fn affected_ids(entry: &UndoEntry) -> Vec<String> {
    if !entry.payload.affected_ids.is_empty() {
        return entry.payload.affected_ids.clone();
    }
    entry
        .payload
        .nodes
        .iter()
        .map(|n| n.id.clone())
        .chain(entry.payload.edges.iter().map(|e| e.id.clone()))
        .collect()
}

fn edge_touches(edge: &Edge, ids: &[String]) -> bool {
    ids.contains(&edge.id) || ids.contains(&edge.source) || ids.contains(&edge.target)
}
