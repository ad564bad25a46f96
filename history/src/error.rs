//! Error types for the history engines.

use thiserror::Error;

/// Errors surfaced to the caller.
///
/// Expected conditions — empty stacks, unknown version ids, legacy
/// entries — are reported through outcome flags on the operation results,
/// never as errors. Only genuinely unexpected conditions land here.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Document serialization failed while estimating history size.
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}
