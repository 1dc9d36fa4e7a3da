//! Slash-separated document and collection paths

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RemoteError;

/// Path of a document (even segment count) or collection (odd segment count).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocPath(Vec<String>);

impl DocPath {
    /// Build a path from segments, rejecting empty segments and embedded slashes.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, RemoteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(RemoteError::InvalidPath("empty path".into()));
        }
        if let Some(bad) = segments
            .iter()
            .find(|segment| segment.trim().is_empty() || segment.contains('/'))
        {
            return Err(RemoteError::InvalidPath(format!(
                "invalid path segment {bad:?}"
            )));
        }
        Ok(Self(segments))
    }

    /// `users/{user_id}/words`
    pub fn user_words(user_id: &str) -> Result<Self, RemoteError> {
        Self::from_segments(["users", user_id, "words"])
    }

    /// `users/{user_id}/words/{word_id}`
    pub fn user_word(user_id: &str, word_id: &str) -> Result<Self, RemoteError> {
        Self::from_segments(["users", user_id, "words", word_id])
    }

    /// `dictionaries`
    pub fn dictionaries() -> Self {
        Self(vec!["dictionaries".to_string()])
    }

    /// `dictionaries/{dictionary_id}`
    pub fn dictionary(dictionary_id: &str) -> Result<Self, RemoteError> {
        Self::from_segments(["dictionaries", dictionary_id])
    }

    /// `dictionaries/{dictionary_id}/words`
    pub fn dictionary_words(dictionary_id: &str) -> Result<Self, RemoteError> {
        Self::from_segments(["dictionaries", dictionary_id, "words"])
    }

    /// `dictionaries/{dictionary_id}/words/{word_id}`
    pub fn dictionary_word(dictionary_id: &str, word_id: &str) -> Result<Self, RemoteError> {
        Self::from_segments(["dictionaries", dictionary_id, "words", word_id])
    }

    /// `dictionaries/{dictionary_id}/collaborators`
    pub fn collaborators(dictionary_id: &str) -> Result<Self, RemoteError> {
        Self::from_segments(["dictionaries", dictionary_id, "collaborators"])
    }

    /// `dictionaries/{dictionary_id}/collaborators/{user_id}`
    pub fn collaborator(dictionary_id: &str, user_id: &str) -> Result<Self, RemoteError> {
        Self::from_segments(["dictionaries", dictionary_id, "collaborators", user_id])
    }

    pub fn is_document(&self) -> bool {
        self.0.len() % 2 == 0
    }

    pub fn is_collection(&self) -> bool {
        !self.is_document()
    }

    /// Last segment: the document id for document paths.
    pub fn id(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Enclosing collection (for documents) or document (for sub-collections).
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> Result<Self, RemoteError> {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self::from_segments(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for DocPath {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_segments(s.trim_matches('/').split('/'))
    }
}

impl TryFrom<String> for DocPath {
    type Error = RemoteError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocPath> for String {
    fn from(value: DocPath) -> Self {
        value.to_string()
    }
}

/// Path to a (possibly nested) field inside a document.
///
/// Segments are kept separate so map keys containing dots (emails) stay intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// A top-level field.
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self
            .0
            .iter()
            .map(|segment| {
                if segment.contains('.') {
                    format!("`{segment}`")
                } else {
                    segment.clone()
                }
            })
            .collect();
        f.write_str(&quoted.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_well_known_paths() {
        let path = DocPath::dictionary_word("d1", "w1").unwrap();
        assert_eq!(path.to_string(), "dictionaries/d1/words/w1");
        assert!(path.is_document());
        assert_eq!(path.id(), "w1");
        assert_eq!(
            path.parent().unwrap(),
            DocPath::dictionary_words("d1").unwrap()
        );
        assert!(DocPath::user_words("u1").unwrap().is_collection());
    }

    #[test]
    fn rejects_bad_segments() {
        assert!(DocPath::user_word("", "w").is_err());
        assert!(DocPath::user_word("u/1", "w").is_err());
        assert!("".parse::<DocPath>().is_err());
    }

    #[test]
    fn parse_roundtrips_display() {
        let path: DocPath = "users/u1/words/w1".parse().unwrap();
        assert_eq!(path, DocPath::user_word("u1", "w1").unwrap());
    }

    #[test]
    fn field_path_quotes_dotted_keys() {
        let path = FieldPath::new(["likes", "a.b@example.com"]);
        assert_eq!(path.to_string(), "likes.`a.b@example.com`");
    }
}
