//! Word model

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

use super::meaning::Meaning;

/// Stable identifier of a word, shared by its local row and remote document.
///
/// Locally created words get a UUID v7; ids arriving from remote documents are
/// kept verbatim as long as they are usable as a document path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordId(String);

impl WordId {
    /// Create a new unique word ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(Error::InvalidInput(format!("invalid word id: {s:?}")));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Who added a word to a shared dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub added_by_email: String,
    pub added_by_display_name: Option<String>,
    /// Unix ms
    pub added_at: i64,
}

/// A vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    /// Shared dictionary this word belongs to; `None` for the private dictionary
    pub dictionary_id: Option<String>,
    pub headword: String,
    /// Ordered senses of the word
    pub meanings: Vec<Meaning>,
    pub part_of_speech: String,
    pub phonetic: Option<String>,
    /// Tag names (lowercase)
    pub tags: BTreeSet<String>,
    /// Global difficulty score used by the private dictionary
    pub difficulty: i32,
    /// BCP 47 language code
    pub language: String,
    pub is_favorite: bool,
    /// Creation timestamp (Unix ms), never changes
    pub created_at: i64,
    /// Last modification timestamp (Unix ms)
    pub updated_at: i64,
    /// Whether the current state is reflected in the remote store (local only)
    pub synced: bool,
    /// Per-collaborator likes, keyed by email (shared dictionaries only)
    pub likes: BTreeMap<String, bool>,
    /// Per-collaborator difficulty scores, keyed by email (shared dictionaries only)
    pub difficulties: BTreeMap<String, i32>,
    pub attribution: Option<Attribution>,
}

impl Word {
    /// Create a new, unsynced private word.
    #[must_use]
    pub fn new(headword: impl Into<String>, language: impl Into<String>, now: i64) -> Self {
        Self {
            id: WordId::new(),
            dictionary_id: None,
            headword: headword.into(),
            meanings: Vec::new(),
            part_of_speech: String::new(),
            phonetic: None,
            tags: BTreeSet::new(),
            difficulty: 0,
            language: language.into(),
            is_favorite: false,
            created_at: now,
            updated_at: now,
            synced: false,
            likes: BTreeMap::new(),
            difficulties: BTreeMap::new(),
            attribution: None,
        }
    }

    /// Whether this word lives in a shared dictionary.
    pub const fn is_shared(&self) -> bool {
        self.dictionary_id.is_some()
    }

    /// Definition of the first meaning, if any.
    #[must_use]
    pub fn primary_definition(&self) -> Option<&str> {
        self.meanings
            .iter()
            .min_by_key(|meaning| meaning.order)
            .map(|meaning| meaning.definition.as_str())
    }

    /// Number of collaborators who currently like this word.
    #[must_use]
    pub fn like_count(&self) -> usize {
        self.likes.values().filter(|liked| **liked).count()
    }

    /// Record a local edit: bump `updated_at` (never backwards) and mark unsynced.
    pub fn touch(&mut self, now: i64) {
        self.updated_at = self.updated_at.max(now);
        self.synced = false;
    }
}

/// User-supplied fields for creating a word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordDraft {
    pub headword: String,
    pub definition: Option<String>,
    pub examples: Vec<String>,
    pub part_of_speech: Option<String>,
    pub phonetic: Option<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
}
