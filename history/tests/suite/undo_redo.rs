use pretty_assertions::assert_eq;
use trellis_history::MAX_UNDO_ENTRIES;
use trellis_history::VersionTarget;
use trellis_history::can_redo;
use trellis_history::can_undo;
use trellis_history::push_undo;
use trellis_history::redo;
use trellis_history::redo_description;
use trellis_history::switch_version;
use trellis_history::undo;
use trellis_history::undo_description;
use trellis_protocol::Edge;
use trellis_protocol::Node;
use trellis_protocol::ProjectContent;
use trellis_protocol::SequentialIdGenerator;
use trellis_protocol::UndoAction;
use trellis_protocol::UndoKind;
use trellis_protocol::UndoPayload;
use trellis_protocol::VersionedText;

/// Build a small canvas: four nodes in a chain.
fn canvas() -> ProjectContent {
    ProjectContent {
        nodes: vec![
            Node::text("n1", VersionedText::new()),
            Node::text("n2", VersionedText::new()),
            Node::text("n3", VersionedText::new()),
            Node::text("n4", VersionedText::new()),
        ],
        edges: vec![
            Edge::new("e1", "n1", "n2"),
            Edge::new("e2", "n2", "n3"),
            Edge::new("e3", "n3", "n4"),
        ],
        ..ProjectContent::new()
    }
}

/// Delete the given nodes plus every edge touching them, recording the
/// operation the way the canvas does: record first, then mutate.
fn bulk_delete(
    project: &ProjectContent,
    node_ids: &[&str],
    description: &str,
    ids: &mut SequentialIdGenerator,
) -> ProjectContent {
    let removed_nodes: Vec<Node> = project
        .nodes
        .iter()
        .filter(|n| node_ids.contains(&n.id.as_str()))
        .cloned()
        .collect();
    let removed_edges: Vec<Edge> = project
        .edges
        .iter()
        .filter(|e| node_ids.contains(&e.source.as_str()) || node_ids.contains(&e.target.as_str()))
        .cloned()
        .collect();

    let recorded = push_undo(
        project,
        UndoKind::BulkOperation,
        UndoAction::Delete,
        UndoPayload {
            nodes: removed_nodes,
            edges: removed_edges,
            affected_ids: node_ids.iter().map(|id| (*id).to_string()).collect(),
            description: description.to_string(),
        },
        ids,
    );
    ProjectContent {
        nodes: recorded
            .nodes
            .iter()
            .filter(|n| !node_ids.contains(&n.id.as_str()))
            .cloned()
            .collect(),
        edges: recorded
            .edges
            .iter()
            .filter(|e| {
                !node_ids.contains(&e.source.as_str()) && !node_ids.contains(&e.target.as_str())
            })
            .cloned()
            .collect(),
        ..recorded
    }
}

fn sorted_ids<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut ids: Vec<&str> = items.collect();
    ids.sort_unstable();
    ids
}

#[test]
fn bulk_delete_round_trips_through_undo_and_redo() {
    let mut ids = SequentialIdGenerator::new("u");
    let original = canvas();

    // Delete three nodes and the two edges connecting them.
    let deleted = bulk_delete(&original, &["n2", "n3", "n4"], "Deleted 3 nodes", &mut ids);
    assert_eq!(deleted.nodes.len(), 1);
    assert!(deleted.edges.is_empty());
    assert_eq!(undo_description(&deleted), Some("Deleted 3 nodes"));

    let undone = undo(&deleted, &mut ids);
    assert!(undone.ok);
    assert_eq!(undone.description.as_deref(), Some("Deleted 3 nodes"));
    assert_eq!(
        sorted_ids(undone.project.nodes.iter().map(|n| n.id.as_str())),
        vec!["n1", "n2", "n3", "n4"]
    );
    assert_eq!(
        sorted_ids(undone.project.edges.iter().map(|e| e.id.as_str())),
        vec!["e1", "e2", "e3"]
    );
    assert!(can_redo(&undone.project));
    assert_eq!(redo_description(&undone.project), Some("Deleted 3 nodes"));

    let redone = redo(&undone.project, &mut ids);
    assert!(redone.ok);
    assert_eq!(
        sorted_ids(redone.project.nodes.iter().map(|n| n.id.as_str())),
        vec!["n1"]
    );
    assert!(redone.project.edges.is_empty());
}

#[test]
fn undo_redo_cycles_are_stable() {
    let mut ids = SequentialIdGenerator::new("u");
    let original = canvas();
    let deleted = bulk_delete(&original, &["n1"], "Deleted 1 node", &mut ids);

    let mut project = deleted.clone();
    for _ in 0..3 {
        let undone = undo(&project, &mut ids);
        assert!(undone.ok);
        assert_eq!(undone.project.nodes.len(), 4);
        assert_eq!(undone.project.edges.len(), 3);

        let redone = redo(&undone.project, &mut ids);
        assert!(redone.ok);
        assert_eq!(redone.project.nodes.len(), 3);
        assert_eq!(redone.project.edges.len(), 2);
        project = redone.project;
    }
}

#[test]
fn new_structural_edit_invalidates_redo() {
    let mut ids = SequentialIdGenerator::new("u");
    let original = canvas();
    let deleted = bulk_delete(&original, &["n4"], "Deleted n4", &mut ids);
    let undone = undo(&deleted, &mut ids);
    assert!(can_redo(&undone.project));

    let edited = bulk_delete(&undone.project, &["n1"], "Deleted n1", &mut ids);
    assert!(!can_redo(&edited));
    let outcome = redo(&edited, &mut ids);
    assert!(!outcome.ok);
    assert_eq!(outcome.project, edited);
}

#[test]
fn redo_on_empty_stack_fails_soft() {
    let mut ids = SequentialIdGenerator::new("u");
    let project = canvas();
    let outcome = redo(&project, &mut ids);
    assert!(!outcome.ok);
    assert_eq!(outcome.project, project);
    assert_eq!(outcome.description, None);
}

#[test]
fn both_stacks_stay_bounded() {
    let mut ids = SequentialIdGenerator::new("u");
    let mut project = canvas();
    for i in 0..MAX_UNDO_ENTRIES + 10 {
        project = push_undo(
            &project,
            UndoKind::NodeDeletion,
            UndoAction::Delete,
            UndoPayload {
                description: format!("edit {i}"),
                ..UndoPayload::default()
            },
            &mut ids,
        );
    }
    assert_eq!(project.undo_stack.len(), MAX_UNDO_ENTRIES);

    // Drain everything back through undo; the redo stack obeys the same
    // bound (here it simply never exceeds it).
    let mut current = project;
    for _ in 0..MAX_UNDO_ENTRIES {
        let outcome = undo(&current, &mut ids);
        assert!(outcome.ok);
        current = outcome.project;
        assert!(current.redo_stack.len() <= MAX_UNDO_ENTRIES);
    }
    assert!(!can_undo(&current));
    assert_eq!(current.redo_stack.len(), MAX_UNDO_ENTRIES);
}

#[test]
fn structural_undo_leaves_content_history_intact() {
    let mut undo_ids = SequentialIdGenerator::new("u");
    let mut version_ids = SequentialIdGenerator::new("v");

    let content = VersionedText::with_base("versioned text", &mut version_ids);
    let base_id = content.versions[0].id.clone();
    let project = ProjectContent {
        nodes: vec![Node::text("n1", content)],
        ..ProjectContent::new()
    };

    let deleted = bulk_delete(&project, &["n1"], "Deleted node", &mut undo_ids);
    let undone = undo(&deleted, &mut undo_ids);

    let restored = undone.project.find_node("n1").expect("restored node");
    let outcome = switch_version(restored.body.content(), VersionTarget::Id(&base_id));
    assert!(outcome.ok);
    assert_eq!(outcome.text, "versioned text");
}
