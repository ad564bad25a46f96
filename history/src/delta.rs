//! Delta-compressed content history for a node's generated text.
//!
//! Recording diffs the caller-supplied previous text against the live text
//! and appends a serialized patch; viewing replays the chain from the base
//! snapshot. Reconstruction favors availability over strictness: it always
//! terminates with some text, logging any patch that no longer applies.

use chrono::DateTime;
use chrono::Utc;
use diffy::Patch;
use tracing::warn;
use trellis_protocol::ChangeKind;
use trellis_protocol::ChangeMetadata;
use trellis_protocol::DeltaVersion;
use trellis_protocol::IdGenerator;
use trellis_protocol::VersionKind;
use trellis_protocol::VersionedText;

/// Hard cap on stored patch entries: one base plus this many patches.
const MAX_PATCH_VERSIONS: usize = 30;

/// Record a new version after a content change.
///
/// `previous_text` is the text as it was immediately before the change; the
/// live text is read from `content.text`. When the diff between the two is
/// empty no version is recorded and the content comes back unchanged.
pub fn record_version(
    content: &VersionedText,
    kind: ChangeKind,
    previous_text: &str,
    metadata: Option<ChangeMetadata>,
    ids: &mut dyn IdGenerator,
) -> VersionedText {
    let mut versions = if content.versions.iter().all(DeltaVersion::is_valid_delta) {
        content.versions.clone()
    } else {
        // Retired full-snapshot entries cannot anchor a patch chain; the
        // document should have gone through migration first.
        warn!("dropping retired full-snapshot version entries; run migration before recording");
        content
            .versions
            .iter()
            .filter(|v| v.is_valid_delta())
            .cloned()
            .collect()
    };

    // Lazy base backfill for documents that predate eager base capture.
    if versions.is_empty() && !previous_text.trim().is_empty() {
        versions.push(DeltaVersion::base(previous_text, ids));
    }

    let patch = diffy::create_patch(previous_text, &content.text);
    if patch.hunks().is_empty() {
        return content.clone();
    }

    versions.push(DeltaVersion {
        id: ids.next_id(),
        kind: kind.into(),
        timestamp: Utc::now(),
        metadata,
        patches: Some(patch.to_string()),
        base_text: None,
        text_length: content.text.chars().count(),
        data: None,
    });

    VersionedText {
        text: content.text.clone(),
        versions: prune(versions),
        // New content is implicitly the latest.
        current_version_pointer: None,
        latest_stash: content.latest_stash.clone(),
    }
}

/// Keep the base plus the most recent [`MAX_PATCH_VERSIONS`] patch entries.
fn prune(versions: Vec<DeltaVersion>) -> Vec<DeltaVersion> {
    if versions.len() <= MAX_PATCH_VERSIONS + 1 {
        return versions;
    }
    let base = versions.iter().find(|v| v.is_base()).cloned();
    let recent = versions[versions.len() - MAX_PATCH_VERSIONS..].to_vec();
    match base {
        Some(base) => {
            let mut pruned = vec![base];
            pruned.extend(recent.into_iter().filter(|v| !v.is_base()));
            pruned
        }
        None => recent,
    }
}

/// Target of a version switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionTarget<'a> {
    /// The live text (leave or stay out of pinned mode).
    Latest,
    /// A recorded version by id.
    Id(&'a str),
}

/// Result of a version switch.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchOutcome {
    pub content: VersionedText,
    /// The text now being displayed.
    pub text: String,
    /// `false` iff the requested version id does not exist; the content is
    /// returned unchanged in that case.
    pub ok: bool,
}

/// Switch the displayed text to a historical version or back to latest.
///
/// Switching away from latest stashes the live text so that a later switch
/// back is lossless. History is never rewritten by a switch.
pub fn switch_version(content: &VersionedText, target: VersionTarget<'_>) -> SwitchOutcome {
    match target {
        VersionTarget::Latest => {
            let text = content
                .latest_stash
                .clone()
                .unwrap_or_else(|| content.text.clone());
            SwitchOutcome {
                content: VersionedText {
                    text: text.clone(),
                    versions: content.versions.clone(),
                    current_version_pointer: None,
                    latest_stash: None,
                },
                text,
                ok: true,
            }
        }
        VersionTarget::Id(version_id) => {
            if content.find_version(version_id).is_none() {
                return SwitchOutcome {
                    content: content.clone(),
                    text: content.text.clone(),
                    ok: false,
                };
            }
            let reconstructed = reconstruct(content, version_id);
            let latest_stash = if content.is_pinned() {
                content.latest_stash.clone()
            } else {
                Some(content.text.clone())
            };
            SwitchOutcome {
                content: VersionedText {
                    text: reconstructed.clone(),
                    versions: content.versions.clone(),
                    current_version_pointer: Some(version_id.to_string()),
                    latest_stash,
                },
                text: reconstructed,
                ok: true,
            }
        }
    }
}

/// Reconstruct the text at `version_id` by replaying the patch chain.
///
/// Degraded paths never abort: a missing base falls back to the live text,
/// and a patch that fails to parse or apply is skipped with a warning while
/// the replay continues on the running text.
pub fn reconstruct(content: &VersionedText, version_id: &str) -> String {
    let versions = &content.versions;
    let Some(target_index) = versions.iter().position(|v| v.id == version_id) else {
        warn!(version_id, "version not found; returning live text");
        return content.text.clone();
    };
    let Some(base) = versions.iter().find(|v| v.is_base()) else {
        warn!(version_id, "no base version to anchor reconstruction; returning live text");
        return content.text.clone();
    };

    let mut text = base.base_text.clone().unwrap_or_default();
    for version in versions
        .iter()
        .take(target_index + 1)
        .skip(1)
        .filter(|v| !v.is_base())
    {
        let Some(patch_text) = version.patches.as_deref() else {
            continue;
        };
        match Patch::from_str(patch_text) {
            Ok(patch) => match diffy::apply(&text, &patch) {
                Ok(next) => text = next,
                Err(error) => {
                    warn!(version_id = %version.id, %error, "patch failed to apply; continuing with partial result");
                }
            },
            Err(error) => {
                warn!(version_id = %version.id, %error, "malformed patch skipped");
            }
        }
    }
    text
}

/// The text that should be displayed right now: the live text when
/// unpinned, otherwise the reconstruction for the pinned version.
pub fn current_content(content: &VersionedText) -> String {
    match content.current_version_pointer.as_deref() {
        None => content.text.clone(),
        Some(version_id) => reconstruct(content, version_id),
    }
}

/// Whether the chain holds at least one usable entry.
pub fn has_history(content: &VersionedText) -> bool {
    content.versions.iter().any(DeltaVersion::is_valid_delta)
}

/// Count of usable entries; retired-format entries are excluded.
pub fn history_count(content: &VersionedText) -> usize {
    content
        .versions
        .iter()
        .filter(|v| v.is_valid_delta())
        .count()
}

/// Whether a historical version is pinned for display.
pub fn is_showing_historical_version(content: &VersionedText) -> bool {
    content.is_pinned()
}

/// One row in the history picker.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayEntry {
    /// `None` for the synthetic leading "latest" row.
    pub version_id: Option<String>,
    pub kind: Option<VersionKind>,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub metadata: Option<ChangeMetadata>,
    pub is_current: bool,
    pub is_latest: bool,
}

/// Reverse-chronological history rows, always led by a synthetic "latest"
/// entry. Retired-format entries are filtered out.
pub fn history_for_display(content: &VersionedText) -> Vec<DisplayEntry> {
    let mut entries = vec![DisplayEntry {
        version_id: None,
        kind: None,
        timestamp: Utc::now(),
        description: "Current version".to_string(),
        metadata: None,
        is_current: !content.is_pinned(),
        is_latest: true,
    }];
    for version in content.versions.iter().rev().filter(|v| v.is_valid_delta()) {
        entries.push(DisplayEntry {
            version_id: Some(version.id.clone()),
            kind: Some(version.kind),
            timestamp: version.timestamp,
            description: describe_version(version),
            metadata: version.metadata.clone(),
            is_current: content.current_version_pointer.as_deref() == Some(version.id.as_str()),
            is_latest: false,
        });
    }
    entries
}

/// Human description of a version entry.
pub fn describe_version(version: &DeltaVersion) -> String {
    let metadata = version.metadata.as_ref();
    match version.kind {
        VersionKind::Generation => match metadata.and_then(|m| m.model_id.as_deref()) {
            Some(model_id) => format!("Generated with {model_id}"),
            None => "AI generated content".to_string(),
        },
        VersionKind::Refinement => match metadata.and_then(|m| m.prompt.as_deref()) {
            Some(prompt) => format!("Refined: \"{}\"", shorten(prompt, 50)),
            None => "Content refined".to_string(),
        },
        VersionKind::ManualEdit => "Manual edit".to_string(),
        VersionKind::Base => "Content updated".to_string(),
    }
}

/// Description of what is currently displayed.
pub fn current_version_description(content: &VersionedText) -> String {
    match content.current_version_pointer.as_deref() {
        None => "Latest version".to_string(),
        Some(version_id) => content
            .find_version(version_id)
            .map(describe_version)
            .unwrap_or_else(|| "Unknown version".to_string()),
    }
}

/// Truncate to `max_chars` characters, appending an ellipsis when cut.
fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

/// Space accounting for a node's version chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryStats {
    pub versions_count: usize,
    pub total_patches_bytes: usize,
    pub current_text_bytes: usize,
    /// Percentage saved versus storing one full snapshot per version.
    pub estimated_savings_percent: f64,
}

/// Estimate how much the patch chain saves over full snapshots.
pub fn memory_stats(content: &VersionedText) -> MemoryStats {
    let total_patches_bytes: usize = content
        .versions
        .iter()
        .filter_map(|v| v.patches.as_deref())
        .map(str::len)
        .sum();
    let current_text_bytes = content.text.len();
    let snapshot_cost = content.versions.len() * current_text_bytes;
    let estimated_savings_percent = if snapshot_cost > 0 {
        (snapshot_cost.saturating_sub(total_patches_bytes) as f64 / snapshot_cost as f64) * 100.0
    } else {
        0.0
    };
    MemoryStats {
        versions_count: content.versions.len(),
        total_patches_bytes,
        current_text_bytes,
        estimated_savings_percent,
    }
}
