//! Id generation capability.
//!
//! The engines never reach for ambient randomness. Callers hand them an
//! [`IdGenerator`] so that every document mutation is deterministic under
//! test and the production path stays a one-liner over UUID v4.

use uuid::Uuid;

/// Source of unique identifiers for versions, undo entries, and nodes.
pub trait IdGenerator {
    /// Produce the next unique id.
    fn next_id(&mut self) -> String;
}

/// Production generator backed by UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic generator producing `<prefix>-1`, `<prefix>-2`, ...
///
/// Intended for tests and replay tooling where stable ids matter.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: u64,
}

impl SequentialIdGenerator {
    /// Create a generator with the given id prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}-{}", self.prefix, self.counter)
    }
}
