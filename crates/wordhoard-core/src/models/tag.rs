//! Tag model

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

/// Color assigned to tags created without an explicit one.
pub const DEFAULT_TAG_COLOR: &str = "#8E8E93";

/// A unique identifier for a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagId(Uuid);

impl TagId {
    /// Create a new unique tag ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for TagId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TagId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A tag for grouping words
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: TagId,
    /// Tag name (stored in lowercase, unique in the local store)
    pub name: String,
    /// Display color as a `#RRGGBB` string
    pub color: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl Tag {
    /// Create a new tag with the given name and the default color
    ///
    /// The name is automatically converted to lowercase.
    #[must_use]
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: TagId::new(),
            name: name.into().trim().to_lowercase(),
            color: DEFAULT_TAG_COLOR.to_string(),
            created_at,
        }
    }
}

fn tag_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9 _-]*$").expect("Invalid regex"))
}

/// Normalize a tag name: trim, lowercase, and validate the character set.
///
/// Returns `None` for names that cannot be stored.
///
/// # Examples
///
/// ```
/// use wordhoard_core::models::normalize_tag_name;
///
/// assert_eq!(normalize_tag_name("  Verbs "), Some("verbs".to_string()));
/// assert_eq!(normalize_tag_name("#nope"), None);
/// ```
#[must_use]
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    if tag_name_pattern().is_match(&name) {
        Some(name)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new_lowercase() {
        let tag = Tag::new("Hello", 1);
        assert_eq!(tag.name, "hello");
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
    }

    #[test]
    fn test_tag_id_unique() {
        let id1 = TagId::new();
        let id2 = TagId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_normalize_tag_name() {
        assert_eq!(normalize_tag_name("Phrasal Verbs"), Some("phrasal verbs".into()));
        assert_eq!(normalize_tag_name("b2-level"), Some("b2-level".into()));
        assert_eq!(normalize_tag_name(""), None);
        assert_eq!(normalize_tag_name("-leading"), None);
        assert_eq!(normalize_tag_name("with/slash"), None);
    }
}
