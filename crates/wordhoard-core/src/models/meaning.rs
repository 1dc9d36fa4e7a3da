//! Meaning model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::util::push_unique;

/// Identifier of a meaning, unique within its word.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeaningId(String);

impl MeaningId {
    /// Create a new unique meaning ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an existing identifier (e.g. one received from a remote document).
    #[must_use]
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MeaningId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MeaningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One sense of a word. Owned by exactly one [`Word`](super::Word).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meaning {
    pub id: MeaningId,
    pub definition: String,
    /// Usage examples, in display order, without duplicates
    pub examples: Vec<String>,
    /// Position among the word's meanings
    pub order: i32,
    /// Last time the definition text changed (Unix ms)
    pub timestamp: i64,
}

impl Meaning {
    #[must_use]
    pub fn new(definition: impl Into<String>, order: i32, timestamp: i64) -> Self {
        Self {
            id: MeaningId::new(),
            definition: definition.into(),
            examples: Vec::new(),
            order,
            timestamp,
        }
    }

    /// Append an example unless it is already listed. Does not touch `timestamp`.
    pub fn add_example(&mut self, example: &str) -> bool {
        let example = example.trim();
        if example.is_empty() {
            return false;
        }
        push_unique(&mut self.examples, example)
    }

    /// Replace the definition text and stamp the edit time.
    pub fn set_definition(&mut self, definition: impl Into<String>, now: i64) {
        self.definition = definition.into();
        self.timestamp = now.max(self.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_example_deduplicates_and_keeps_timestamp() {
        let mut meaning = Meaning::new("a feeling", 0, 10);
        assert!(meaning.add_example("I felt it"));
        assert!(!meaning.add_example("  I felt it "));
        assert!(!meaning.add_example("   "));
        assert_eq!(meaning.examples, vec!["I felt it"]);
        assert_eq!(meaning.timestamp, 10);
    }

    #[test]
    fn set_definition_never_moves_clock_backwards() {
        let mut meaning = Meaning::new("old", 0, 50);
        meaning.set_definition("new", 40);
        assert_eq!(meaning.definition, "new");
        assert_eq!(meaning.timestamp, 50);
    }
}
