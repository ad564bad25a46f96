//! Project graph document: nodes, edges, and the structural undo stacks.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::version::VersionedText;

/// Current document schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// The retired full-snapshot era. Documents without a `schemaVersion` tag
/// are treated as this and must be migrated before the engines touch them.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

fn legacy_schema_version() -> u32 {
    LEGACY_SCHEMA_VERSION
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Text-generation node payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBody {
    /// The generated text channel, with its version chain.
    #[serde(default)]
    pub content: VersionedText,
}

/// Media node payload (image, audio, video).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBody {
    /// Prompt text channel; versioned like any generated text.
    #[serde(default)]
    pub prompt: VersionedText,
    /// Generated asset location, once generation has completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
}

/// Node payload, tagged by node kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeBody {
    Text(TextBody),
    Image(MediaBody),
    Audio(MediaBody),
    Video(MediaBody),
}

impl NodeBody {
    /// The versioned text channel of this node, regardless of kind.
    pub fn content(&self) -> &VersionedText {
        match self {
            NodeBody::Text(body) => &body.content,
            NodeBody::Image(body) | NodeBody::Audio(body) | NodeBody::Video(body) => &body.prompt,
        }
    }

    pub fn content_mut(&mut self) -> &mut VersionedText {
        match self {
            NodeBody::Text(body) => &mut body.content,
            NodeBody::Image(body) | NodeBody::Audio(body) | NodeBody::Video(body) => {
                &mut body.prompt
            }
        }
    }
}

/// One node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(flatten)]
    pub body: NodeBody,
}

impl Node {
    pub fn new(id: impl Into<String>, body: NodeBody) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            body,
        }
    }

    /// Convenience constructor for a text node.
    pub fn text(id: impl Into<String>, content: VersionedText) -> Self {
        Self::new(id, NodeBody::Text(TextBody { content }))
    }
}

/// Directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Category of a structural edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoKind {
    NodeDeletion,
    EdgeDeletion,
    BulkOperation,
    NodeCreation,
}

/// What the recorded edit did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoAction {
    Delete,
    Add,
    Modify,
}

/// Full snapshots of the entities touched by a structural edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_ids: Vec<String>,
    /// Human-readable description of the edit, e.g. "Deleted 3 nodes".
    #[serde(default)]
    pub description: String,
}

/// One entry on a structural undo or redo stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: UndoKind,
    pub action: UndoAction,
    pub payload: UndoPayload,
}

/// The whole project document as persisted inside the project blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContent {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Structural undo entries, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undo_stack: Vec<UndoEntry>,
    /// Structural redo entries, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redo_stack: Vec<UndoEntry>,
}

impl Default for ProjectContent {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            nodes: Vec::new(),
            edges: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }
}

impl ProjectContent {
    /// Empty document at the current schema version.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
