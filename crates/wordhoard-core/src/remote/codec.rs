//! Conversion between local models and remote documents
//!
//! Remote documents use camelCase field names and Unix-millisecond timestamps.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DocPath, Document, RemoteError};
use crate::error::{Error, Result};
use crate::models::{
    normalize_tag_name, Attribution, Collaborator, Meaning, MeaningId, Role, SharedDictionary,
    Word,
};

/// Per-collaborator maps that plain word pushes never overwrite.
pub const COLLABORATIVE_FIELDS: [&str; 2] = ["likes", "difficulties"];

const DEFAULT_LANGUAGE: &str = "en";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeaningDocument {
    pub id: String,
    pub definition: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub timestamp: i64,
}

/// Wire form of a word under `users/{uid}/words` or `dictionaries/{id}/words`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDocument {
    #[serde(default)]
    pub id: String,
    pub headword: String,
    #[serde(default)]
    pub meanings: Vec<MeaningDocument>,
    #[serde(default)]
    pub part_of_speech: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: i32,
    #[serde(default = "default_language")]
    pub language_code: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub likes: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub difficulties: BTreeMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<i64>,
}

impl From<&Word> for WordDocument {
    fn from(word: &Word) -> Self {
        let attribution = word.attribution.as_ref();
        Self {
            id: word.id.to_string(),
            headword: word.headword.clone(),
            meanings: word
                .meanings
                .iter()
                .map(|meaning| MeaningDocument {
                    id: meaning.id.to_string(),
                    definition: meaning.definition.clone(),
                    examples: meaning.examples.clone(),
                    order: meaning.order,
                    timestamp: meaning.timestamp,
                })
                .collect(),
            part_of_speech: word.part_of_speech.clone(),
            phonetic: word.phonetic.clone(),
            tags: word.tags.iter().cloned().collect(),
            difficulty: word.difficulty,
            language_code: word.language.clone(),
            is_favorite: word.is_favorite,
            created_at: word.created_at,
            updated_at: word.updated_at,
            likes: word.likes.clone(),
            difficulties: word.difficulties.clone(),
            added_by_email: attribution.map(|a| a.added_by_email.clone()),
            added_by_display_name: attribution.and_then(|a| a.added_by_display_name.clone()),
            added_at: attribution.map(|a| a.added_at),
        }
    }
}

impl WordDocument {
    /// Convert into a local word of the given scope, marked synced.
    ///
    /// `id` is the document id from the path; the body's `id` field is ignored.
    pub fn into_word(self, id: &str, dictionary_id: Option<&str>) -> Result<Word> {
        if self.headword.trim().is_empty() {
            return Err(Error::InvalidInput(format!("word {id} has no headword")));
        }

        let mut tags = BTreeSet::new();
        for raw in &self.tags {
            match normalize_tag_name(raw) {
                Some(tag) => {
                    tags.insert(tag);
                }
                None => tracing::warn!(word_id = id, tag = %raw, "Skipping invalid remote tag"),
            }
        }

        let attribution = self.added_by_email.map(|email| Attribution {
            added_by_email: email,
            added_by_display_name: self.added_by_display_name,
            added_at: self.added_at.unwrap_or(self.created_at),
        });

        Ok(Word {
            id: id.parse()?,
            dictionary_id: dictionary_id.map(str::to_string),
            headword: self.headword,
            meanings: self
                .meanings
                .into_iter()
                .map(|meaning| Meaning {
                    id: MeaningId::from_raw(meaning.id),
                    definition: meaning.definition,
                    examples: meaning.examples,
                    order: meaning.order,
                    timestamp: meaning.timestamp,
                })
                .collect(),
            part_of_speech: self.part_of_speech,
            phonetic: self.phonetic,
            tags,
            difficulty: self.difficulty,
            language: self.language_code,
            is_favorite: self.is_favorite,
            created_at: self.created_at,
            updated_at: self.updated_at,
            synced: true,
            likes: self.likes,
            difficulties: self.difficulties,
            attribution,
        })
    }
}

/// Serialize a word into its document body.
pub fn encode_word(word: &Word) -> Result<Value> {
    Ok(serde_json::to_value(WordDocument::from(word))?)
}

/// Decode a remote document into a local word of the given scope.
pub fn decode_word(document: &Document, dictionary_id: Option<&str>) -> Result<Word> {
    let body: WordDocument = serde_json::from_value(document.data.clone())?;
    body.into_word(document.id(), dictionary_id)
}

/// Remote path of `word`: the user's private collection or its shared dictionary.
pub fn word_document_path(user_id: &str, word: &Word) -> std::result::Result<DocPath, RemoteError> {
    match &word.dictionary_id {
        Some(dictionary_id) => DocPath::dictionary_word(dictionary_id, word.id.as_str()),
        None => DocPath::user_word(user_id, word.id.as_str()),
    }
}

/// Wire form of `dictionaries/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryDocument {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub collaborators: BTreeMap<String, Role>,
    #[serde(default)]
    pub created_at: i64,
}

pub fn encode_dictionary(dictionary: &SharedDictionary) -> Result<Value> {
    Ok(serde_json::to_value(DictionaryDocument {
        name: dictionary.name.clone(),
        owner: dictionary.owner.clone(),
        collaborators: dictionary.collaborators.clone(),
        created_at: dictionary.created_at,
    })?)
}

pub fn decode_dictionary(document: &Document) -> Result<SharedDictionary> {
    let body: DictionaryDocument = serde_json::from_value(document.data.clone())?;
    Ok(SharedDictionary {
        id: document.id().to_string(),
        name: body.name,
        owner: body.owner,
        collaborators: body.collaborators,
        created_at: body.created_at,
    })
}

/// Wire form of `dictionaries/{id}/collaborators/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorDocument {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub added_at: i64,
}

pub fn encode_collaborator(collaborator: &Collaborator) -> Result<Value> {
    Ok(serde_json::to_value(CollaboratorDocument {
        user_id: collaborator.user_id.clone(),
        email: collaborator.email.clone(),
        display_name: collaborator.display_name.clone(),
        role: collaborator.role,
        added_at: collaborator.added_at,
    })?)
}

pub fn decode_collaborator(document: &Document) -> Result<Collaborator> {
    let body: CollaboratorDocument = serde_json::from_value(document.data.clone())?;
    Ok(Collaborator {
        user_id: body.user_id,
        email: body.email,
        display_name: body.display_name,
        role: body.role,
        added_at: body.added_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document(path: &str, data: Value) -> Document {
        Document {
            path: path.parse().unwrap(),
            data,
        }
    }

    #[test]
    fn private_word_omits_collaborative_fields() {
        let mut word = Word::new("serene", "en", 10);
        word.meanings.push(Meaning::new("calm", 0, 10));
        let value = encode_word(&word).unwrap();

        assert_eq!(value["headword"], json!("serene"));
        assert_eq!(value["languageCode"], json!("en"));
        assert_eq!(value["meanings"][0]["definition"], json!("calm"));
        assert!(value.get("likes").is_none());
        assert!(value.get("synced").is_none());
    }

    #[test]
    fn decode_uses_path_id_and_marks_synced() {
        let doc = document(
            "dictionaries/d1/words/w-1",
            json!({
                "id": "something-else",
                "headword": "Haus",
                "tags": ["A1", "not valid!"],
                "updatedAt": 20,
                "likes": {"a@x.com": true},
                "addedByEmail": "a@x.com"
            }),
        );

        let word = decode_word(&doc, Some("d1")).unwrap();
        assert_eq!(word.id.as_str(), "w-1");
        assert_eq!(word.dictionary_id.as_deref(), Some("d1"));
        assert!(word.synced);
        assert_eq!(word.tags, BTreeSet::from(["a1".to_string()]));
        assert_eq!(word.like_count(), 1);
        assert_eq!(word.language, "en");
        assert_eq!(
            word.attribution.map(|a| a.added_by_email),
            Some("a@x.com".to_string())
        );
    }

    #[test]
    fn decode_rejects_malformed_documents() {
        let missing_updated = document("users/u/words/w", json!({"headword": "x"}));
        assert!(decode_word(&missing_updated, None).is_err());

        let blank = document("users/u/words/w", json!({"headword": " ", "updatedAt": 1}));
        assert!(decode_word(&blank, None).is_err());
    }

    #[test]
    fn dictionary_document_roundtrip() {
        let dictionary = SharedDictionary {
            id: "d1".into(),
            name: "German".into(),
            owner: "u1".into(),
            collaborators: BTreeMap::from([("u1".to_string(), Role::Owner)]),
            created_at: 3,
        };
        let value = encode_dictionary(&dictionary).unwrap();
        assert_eq!(value["collaborators"]["u1"], json!("owner"));

        let decoded = decode_dictionary(&document("dictionaries/d1", value)).unwrap();
        assert_eq!(decoded, dictionary);
    }

    #[test]
    fn word_paths_follow_scope() {
        let mut word = Word::new("x", "en", 1);
        let private = word_document_path("u1", &word).unwrap();
        assert_eq!(private.to_string(), format!("users/u1/words/{}", word.id));

        word.dictionary_id = Some("d9".into());
        let shared = word_document_path("u1", &word).unwrap();
        assert_eq!(shared.to_string(), format!("dictionaries/d9/words/{}", word.id));
    }
}
