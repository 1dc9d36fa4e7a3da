//! Local edits of words
//!
//! Every change stamps `updated_at` from the clock and marks the word unsynced
//! so the next push picks it up.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::models::{normalize_tag_name, Meaning, Word, WordDraft, WordId};
use crate::sync::{update_score, Answer, Clock};
use crate::util::normalize_text_option;
use crate::{Error, Result};

use super::LocalStore;

const DEFAULT_LANGUAGE: &str = "en";

/// Partial update of a word's scalar fields; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordUpdate {
    pub headword: Option<String>,
    pub part_of_speech: Option<String>,
    /// `Some("")` clears the phonetic spelling
    pub phonetic: Option<String>,
    pub language: Option<String>,
    /// Replaces the whole tag set
    pub tags: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct WordService {
    store: LocalStore,
    clock: Arc<dyn Clock>,
}

impl WordService {
    pub fn new(store: LocalStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub async fn create_word(&self, draft: WordDraft) -> Result<Word> {
        let word = self.build_word(draft)?;
        self.store.upsert_word(&word).await?;
        tracing::debug!(word_id = %word.id, headword = %word.headword, "Created word");
        Ok(word)
    }

    /// Validate a draft into a new private word without storing it.
    pub fn build_word(&self, draft: WordDraft) -> Result<Word> {
        let headword = normalize_text_option(Some(draft.headword))
            .ok_or_else(|| Error::InvalidInput("Headword cannot be empty".into()))?;
        let language = normalize_text_option(draft.language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let now = self.clock.now_millis();

        let mut word = Word::new(headword, language, now);
        word.part_of_speech = normalize_text_option(draft.part_of_speech).unwrap_or_default();
        word.phonetic = normalize_text_option(draft.phonetic);
        word.tags = normalize_tags(&draft.tags)?;

        if let Some(definition) = normalize_text_option(draft.definition) {
            let mut meaning = Meaning::new(definition, 0, now);
            for example in &draft.examples {
                meaning.add_example(example);
            }
            word.meanings.push(meaning);
        } else if !draft.examples.is_empty() {
            return Err(Error::InvalidInput(
                "Examples need a definition to attach to".into(),
            ));
        }
        Ok(word)
    }

    pub async fn update_word(&self, id: &WordId, update: WordUpdate) -> Result<Word> {
        self.edit(id, |word, _| {
            if let Some(headword) = update.headword {
                word.headword = normalize_text_option(Some(headword))
                    .ok_or_else(|| Error::InvalidInput("Headword cannot be empty".into()))?;
            }
            if let Some(part_of_speech) = update.part_of_speech {
                word.part_of_speech = part_of_speech.trim().to_string();
            }
            if let Some(phonetic) = update.phonetic {
                word.phonetic = normalize_text_option(Some(phonetic));
            }
            if let Some(language) = update.language {
                word.language = normalize_text_option(Some(language))
                    .ok_or_else(|| Error::InvalidInput("Language cannot be empty".into()))?;
            }
            if let Some(tags) = update.tags {
                word.tags = normalize_tags(&tags)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn set_favorite(&self, id: &WordId, is_favorite: bool) -> Result<Word> {
        self.edit(id, |word, _| {
            word.is_favorite = is_favorite;
            Ok(())
        })
        .await
    }

    /// Append an example to the meaning at `meaning_index` (in display order).
    pub async fn add_example(&self, id: &WordId, meaning_index: usize, example: &str) -> Result<Word> {
        self.edit(id, |word, _| {
            let meaning = meaning_at(word, meaning_index)?;
            if !meaning.add_example(example) {
                return Err(Error::InvalidInput(format!(
                    "Example is empty or already listed: {example:?}"
                )));
            }
            Ok(())
        })
        .await
    }

    /// Replace a meaning's definition, or add a new meaning when
    /// `meaning_index` is one past the last.
    pub async fn edit_definition(
        &self,
        id: &WordId,
        meaning_index: usize,
        definition: &str,
    ) -> Result<Word> {
        let definition = definition.trim();
        if definition.is_empty() {
            return Err(Error::InvalidInput("Definition cannot be empty".into()));
        }

        self.edit(id, |word, now| {
            if meaning_index == word.meanings.len() {
                let order = word
                    .meanings
                    .iter()
                    .map(|meaning| meaning.order + 1)
                    .max()
                    .unwrap_or_default();
                word.meanings.push(Meaning::new(definition, order, now));
            } else {
                meaning_at(word, meaning_index)?.set_definition(definition, now);
            }
            Ok(())
        })
        .await
    }

    /// Delete locally and queue the remote delete. Returns `false` if missing.
    pub async fn delete_word(&self, id: &WordId) -> Result<bool> {
        let deleted = self.store.delete_word(id, self.clock.now_millis()).await?;
        if deleted {
            tracing::debug!(word_id = %id, "Deleted word");
        }
        Ok(deleted)
    }

    /// Apply a quiz answer to a private word's difficulty; returns the new score.
    ///
    /// Shared words keep one score per collaborator and are scored through the
    /// sharing service instead.
    pub async fn record_answer(&self, id: &WordId, answer: Answer) -> Result<i32> {
        let word = self
            .edit(id, |word, _| {
                if word.is_shared() {
                    return Err(Error::InvalidInput(
                        "Shared words are scored per collaborator".into(),
                    ));
                }
                word.difficulty = update_score(word.difficulty, answer.delta());
                Ok(())
            })
            .await?;
        Ok(word.difficulty)
    }

    async fn edit<F>(&self, id: &WordId, change: F) -> Result<Word>
    where
        F: FnOnce(&mut Word, i64) -> Result<()>,
    {
        let mut word = self
            .store
            .get_word(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("word {id}")))?;

        let now = self.clock.now_millis();
        change(&mut word, now)?;
        word.touch(now);
        self.store.upsert_word(&word).await?;
        Ok(word)
    }
}

fn normalize_tags(raw: &[String]) -> Result<BTreeSet<String>> {
    raw.iter()
        .filter(|tag| !tag.trim().is_empty())
        .map(|tag| {
            normalize_tag_name(tag)
                .ok_or_else(|| Error::InvalidInput(format!("Invalid tag name: {tag:?}")))
        })
        .collect()
}

fn meaning_at(word: &mut Word, index: usize) -> Result<&mut Meaning> {
    word.meanings.sort_by_key(|meaning| meaning.order);
    let count = word.meanings.len();
    word.meanings.get_mut(index).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Meaning {} does not exist ({count} meaning(s))",
            index + 1
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ManualClock;
    use pretty_assertions::assert_eq;

    async fn service() -> (WordService, Arc<ManualClock>) {
        let store = LocalStore::open_in_memory().await.unwrap();
        let clock = Arc::new(ManualClock::new(1_000));
        (WordService::new(store, clock.clone()), clock)
    }

    fn draft(headword: &str) -> WordDraft {
        WordDraft {
            headword: headword.to_string(),
            definition: Some("a definition".to_string()),
            examples: vec!["an example".to_string()],
            tags: vec![" B2 ".to_string()],
            ..WordDraft::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_word_normalizes_input() {
        let (words, _) = service().await;
        let word = words.create_word(draft("  sonder ")).await.unwrap();

        assert_eq!(word.headword, "sonder");
        assert_eq!(word.language, "en");
        assert_eq!(word.tags.iter().collect::<Vec<_>>(), vec!["b2"]);
        assert_eq!(word.meanings[0].examples, vec!["an example"]);
        assert!(!word.synced);
        assert_eq!(words.store().get_word(&word.id).await.unwrap(), Some(word));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn build_word_does_not_store() {
        let (words, _) = service().await;
        let word = words.build_word(draft("ephemeral")).unwrap();
        assert_eq!(word.created_at, 1_000);
        assert_eq!(words.store().get_word(&word.id).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_word_rejects_bad_input() {
        let (words, _) = service().await;
        assert!(words.create_word(draft("   ")).await.is_err());

        let mut bad_tag = draft("x");
        bad_tag.tags = vec!["#nope".to_string()];
        assert!(matches!(
            words.create_word(bad_tag).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edits_mark_unsynced_and_never_move_time_backwards() {
        let (words, clock) = service().await;
        let word = words.create_word(draft("x")).await.unwrap();
        words.store().set_synced(&[word.id.clone()], true).await.unwrap();

        clock.set(500);
        let updated = words.set_favorite(&word.id, true).await.unwrap();
        assert!(updated.is_favorite);
        assert!(!updated.synced);
        assert_eq!(updated.updated_at, 1_000);

        clock.set(2_000);
        let updated = words
            .update_word(
                &word.id,
                WordUpdate {
                    phonetic: Some("/eks/".into()),
                    tags: Some(vec!["letters".into()]),
                    ..WordUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.updated_at, 2_000);
        assert_eq!(updated.phonetic.as_deref(), Some("/eks/"));
        assert!(updated.tags.contains("letters"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn example_append_keeps_definition_clock() {
        let (words, clock) = service().await;
        let word = words.create_word(draft("x")).await.unwrap();

        clock.set(3_000);
        let updated = words.add_example(&word.id, 0, "another").await.unwrap();
        assert_eq!(updated.meanings[0].examples, vec!["an example", "another"]);
        assert_eq!(updated.meanings[0].timestamp, 1_000);
        assert_eq!(updated.updated_at, 3_000);

        assert!(words.add_example(&word.id, 0, "another").await.is_err());
        assert!(words.add_example(&word.id, 4, "nowhere").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn edit_definition_stamps_meaning_or_appends() {
        let (words, clock) = service().await;
        let word = words.create_word(draft("x")).await.unwrap();

        clock.set(4_000);
        let updated = words.edit_definition(&word.id, 0, "better").await.unwrap();
        assert_eq!(updated.meanings[0].definition, "better");
        assert_eq!(updated.meanings[0].timestamp, 4_000);

        let updated = words.edit_definition(&word.id, 1, "second sense").await.unwrap();
        assert_eq!(updated.meanings.len(), 2);
        assert_eq!(updated.meanings[1].order, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_word_queues_remote_delete() {
        let (words, _) = service().await;
        let word = words.create_word(draft("x")).await.unwrap();

        assert!(words.delete_word(&word.id).await.unwrap());
        assert!(!words.delete_word(&word.id).await.unwrap());
        assert_eq!(words.store().pending_deletions().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn record_answer_applies_score_rule() {
        let (words, _) = service().await;
        let mut word = words.create_word(draft("known")).await.unwrap();
        word.difficulty = 55;
        words.store().upsert_word(&word).await.unwrap();

        assert_eq!(words.record_answer(&word.id, Answer::Correct).await.unwrap(), 60);
        assert_eq!(words.record_answer(&word.id, Answer::Wrong).await.unwrap(), 25);
        assert_eq!(words.record_answer(&word.id, Answer::Correct).await.unwrap(), 30);

        word.dictionary_id = Some("d1".into());
        words.store().upsert_word(&word).await.unwrap();
        assert!(words.record_answer(&word.id, Answer::Wrong).await.is_err());
    }
}
