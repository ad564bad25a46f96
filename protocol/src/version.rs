//! Delta-compressed version chains for generated text.
//!
//! A chain is `[base, p1, p2, ...]`: one full-text base snapshot followed by
//! serialized patches, each describing the transformation from the previous
//! reconstructed state. The live text is not a member of the chain; it is
//! implicitly the state after the newest patch.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::id::IdGenerator;

/// What produced a stored version entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    /// Full-text snapshot anchoring the patch chain.
    Base,
    /// A model generation completed.
    Generation,
    /// A refinement pass over existing text.
    Refinement,
    /// The user edited the text by hand.
    ManualEdit,
}

impl std::fmt::Display for VersionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionKind::Base => write!(f, "base"),
            VersionKind::Generation => write!(f, "generation"),
            VersionKind::Refinement => write!(f, "refinement"),
            VersionKind::ManualEdit => write!(f, "manual_edit"),
        }
    }
}

/// Kinds a caller may record. Base entries are synthesized by the engine
/// and can never be recorded directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Generation,
    Refinement,
    ManualEdit,
}

impl From<ChangeKind> for VersionKind {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Generation => VersionKind::Generation,
            ChangeKind::Refinement => VersionKind::Refinement,
            ChangeKind::ManualEdit => VersionKind::ManualEdit,
        }
    }
}

/// Free-form annotation attached to a version.
///
/// Informational only; never consulted during reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMetadata {
    /// Model that produced the text, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Prompt that drove the change, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// UI action tag, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_action: Option<String>,
}

impl ChangeMetadata {
    /// Metadata tagging a generation with the model that produced it.
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            model_id: Some(model_id.into()),
            ..Self::default()
        }
    }

    /// Metadata tagging a refinement with its prompt.
    pub fn for_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }
}

/// One entry in a node's patch chain.
///
/// Exactly one of `base_text` (kind [`VersionKind::Base`]) or `patches`
/// (every other kind) is present. The retired full-snapshot format stored a
/// `data` payload instead; such entries are carried through deserialization
/// so migration can account for them, but every engine operation ignores
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaVersion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChangeMetadata>,
    /// Serialized edit script from the previous reconstructed state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patches: Option<String>,
    /// Full text; present only on base entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_text: Option<String>,
    /// Character count of the text at this version, cached for display.
    #[serde(default)]
    pub text_length: usize,
    /// Payload of the retired full-snapshot format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl DeltaVersion {
    /// Synthesize a base entry holding `text` verbatim.
    pub fn base(text: impl Into<String>, ids: &mut dyn IdGenerator) -> Self {
        let text = text.into();
        Self {
            id: ids.next_id(),
            kind: VersionKind::Base,
            timestamp: Utc::now(),
            metadata: None,
            patches: None,
            base_text: Some(text.clone()),
            text_length: text.chars().count(),
            data: None,
        }
    }

    pub fn is_base(&self) -> bool {
        self.kind == VersionKind::Base
    }

    /// Whether this entry is usable by the delta engine: it carries a patch
    /// or a base snapshot and is not in the retired full-snapshot shape.
    pub fn is_valid_delta(&self) -> bool {
        self.data.is_none() && (self.base_text.is_some() || self.patches.is_some())
    }
}

/// A live text field plus its delta-compressed history.
///
/// Embedded by composition into every node body that carries generated
/// text. The live `text` is owned by the caller and decoupled from the
/// chain; `versions` and the pointer are owned exclusively by the engine
/// operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedText {
    /// Current live text (or, while pinned, the reconstructed historical
    /// text being displayed).
    #[serde(default)]
    pub text: String,
    /// Patch chain in chronological order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<DeltaVersion>,
    /// Id of the version being displayed; `None` means "viewing latest".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version_pointer: Option<String>,
    /// Live text stashed while pinned to a historical version, so that
    /// returning to latest is lossless.
    #[serde(rename = "__latestText", skip_serializing_if = "Option::is_none")]
    pub latest_stash: Option<String>,
}

impl VersionedText {
    /// Empty content with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Content whose base snapshot is captured eagerly at creation time.
    ///
    /// Blank text gets no base; the chain stays empty until the first
    /// meaningful recording.
    pub fn with_base(text: impl Into<String>, ids: &mut dyn IdGenerator) -> Self {
        let text = text.into();
        let versions = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![DeltaVersion::base(text.clone(), ids)]
        };
        Self {
            text,
            versions,
            current_version_pointer: None,
            latest_stash: None,
        }
    }

    pub fn find_version(&self, id: &str) -> Option<&DeltaVersion> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn base_version(&self) -> Option<&DeltaVersion> {
        self.versions.iter().find(|v| v.is_base())
    }

    /// Whether a historical version is being displayed.
    pub fn is_pinned(&self) -> bool {
        self.current_version_pointer.is_some()
    }
}
