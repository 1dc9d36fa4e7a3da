//! Shared local store service used by the sync engine, listeners and CLI.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::{
    Database, DictionaryRepository, LibSqlDictionaryRepository, LibSqlSettingsRepository,
    LibSqlSyncRepository, LibSqlWordRepository, PendingDeletion, ScopeFilter, SettingsRepository,
    SyncRepository, WordFilter, WordRepository,
};
use crate::models::{
    Scope, SharedDictionary, SyncConflict, Tag, Word, WordId, STRATEGY_LOCAL_NEWER,
};
use crate::remote::{codec, Document};
use crate::sync::merge::merge_with_outcome;
use crate::Result;

/// Counts from merging a batch of remote documents into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Malformed documents, queued deletes and rows of another scope
    pub skipped: usize,
    pub deleted: usize,
    /// Remote copies ignored because the local row was newer
    pub conflicts: usize,
}

impl ReconcileReport {
    /// Whether the local store changed.
    pub const fn has_changes(&self) -> bool {
        self.inserted + self.updated + self.deleted > 0
    }
}

/// Thread-safe handle to the local word store.
///
/// Every mutation goes through one `Mutex<Database>`, so a snapshot is
/// reconciled as a unit relative to foreground edits.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open a store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store.
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    pub async fn get_word(&self, id: &WordId) -> Result<Option<Word>> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection()).get(id).await
    }

    pub async fn list_words(
        &self,
        filter: &WordFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Word>> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection())
            .list(filter, limit, offset)
            .await
    }

    /// Every word stored for one scope column value.
    pub async fn words_in_scope(&self, dictionary_id: Option<&str>) -> Result<Vec<Word>> {
        let filter = WordFilter {
            scope: ScopeFilter::for_dictionary(dictionary_id),
            ..WordFilter::default()
        };
        self.list_words(&filter, usize::MAX, 0).await
    }

    pub async fn list_unsynced(&self) -> Result<Vec<Word>> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection())
            .list_unsynced()
            .await
    }

    pub async fn upsert_word(&self, word: &Word) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection())
            .upsert(word)
            .await
    }

    /// Delete a word locally and queue its remote delete.
    ///
    /// Returns `false` when the word did not exist.
    pub async fn delete_word(&self, id: &WordId, deleted_at: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let words = LibSqlWordRepository::new(db.connection());
        let Some(word) = words.get(id).await? else {
            return Ok(false);
        };

        words.delete(id).await?;
        LibSqlSyncRepository::new(db.connection())
            .enqueue_deletion(&PendingDeletion {
                word_id: word.id,
                dictionary_id: word.dictionary_id,
                deleted_at,
            })
            .await?;
        Ok(true)
    }

    pub async fn set_synced(&self, ids: &[WordId], synced: bool) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection())
            .set_synced(ids, synced)
            .await
    }

    /// Mark words synced that still carry the `updated_at` they were pushed with.
    pub async fn mark_pushed(&self, pushed: &[(WordId, i64)]) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection())
            .mark_pushed(pushed)
            .await
    }

    pub async fn mark_all_unsynced(&self) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection())
            .mark_all_unsynced()
            .await
    }

    /// Move words to another scope and mark them synced there.
    pub async fn reassign_dictionary(
        &self,
        ids: &[WordId],
        dictionary_id: Option<&str>,
    ) -> Result<usize> {
        let db = self.db.lock().await;
        let words = LibSqlWordRepository::new(db.connection());
        let moved = words.reassign_dictionary(ids, dictionary_id).await?;
        words.set_synced(ids, true).await?;
        Ok(moved)
    }

    pub async fn list_tags(&self) -> Result<Vec<(Tag, usize)>> {
        let db = self.db.lock().await;
        LibSqlWordRepository::new(db.connection()).list_tags().await
    }

    pub async fn pending_deletions(&self) -> Result<Vec<PendingDeletion>> {
        let db = self.db.lock().await;
        LibSqlSyncRepository::new(db.connection())
            .pending_deletions()
            .await
    }

    pub async fn clear_deletions(&self, ids: &[WordId]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSyncRepository::new(db.connection())
            .clear_deletions(ids)
            .await
    }

    /// List recently rejected remote versions.
    pub async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let db = self.db.lock().await;
        LibSqlSyncRepository::new(db.connection())
            .list_conflicts(limit)
            .await
    }

    pub async fn setting(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection()).get(key).await
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection())
            .set(key, value)
            .await
    }

    pub async fn remove_setting(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlSettingsRepository::new(db.connection())
            .remove(key)
            .await
    }

    pub async fn save_dictionary(&self, dictionary: &SharedDictionary) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlDictionaryRepository::new(db.connection())
            .save(dictionary)
            .await
    }

    pub async fn get_dictionary(&self, id: &str) -> Result<Option<SharedDictionary>> {
        let db = self.db.lock().await;
        LibSqlDictionaryRepository::new(db.connection())
            .get(id)
            .await
    }

    pub async fn list_dictionaries(&self) -> Result<Vec<SharedDictionary>> {
        let db = self.db.lock().await;
        LibSqlDictionaryRepository::new(db.connection())
            .list()
            .await
    }

    pub async fn replace_dictionaries(&self, dictionaries: &[SharedDictionary]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlDictionaryRepository::new(db.connection())
            .replace_all(dictionaries)
            .await
    }

    /// Merge remote documents of `scope` into the store as create-or-update.
    ///
    /// When `infer_deletions` is set, synced rows of the scope that are absent
    /// from `documents` are deleted as well. Unsynced rows are never deleted.
    pub async fn reconcile(
        &self,
        scope: &Scope,
        documents: &[Document],
        infer_deletions: bool,
        now: i64,
    ) -> Result<ReconcileReport> {
        let db = self.db.lock().await;
        let words = LibSqlWordRepository::new(db.connection());
        let bookkeeping = LibSqlSyncRepository::new(db.connection());
        let queued = bookkeeping.pending_deletion_ids().await?;
        let mut report = ReconcileReport::default();

        for document in documents {
            let remote = match codec::decode_word(document, scope.dictionary_id()) {
                Ok(word) => word,
                Err(error) => {
                    tracing::warn!(
                        scope = %scope,
                        document = %document.path,
                        error = %error,
                        "Skipping malformed remote document"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            if queued.contains(&remote.id) {
                report.skipped += 1;
                continue;
            }

            let Some(local) = words.get(&remote.id).await? else {
                words.upsert(&remote).await?;
                report.inserted += 1;
                continue;
            };

            if local.dictionary_id != remote.dictionary_id {
                tracing::debug!(
                    scope = %scope,
                    word_id = %remote.id,
                    "Skipping remote copy of a word stored in another scope"
                );
                report.skipped += 1;
                continue;
            }

            let outcome = merge_with_outcome(&local, &remote);
            if outcome.stale_remote {
                bookkeeping
                    .record_conflict(
                        &local.id,
                        &scope.to_string(),
                        local.updated_at,
                        remote.updated_at,
                        now,
                        STRATEGY_LOCAL_NEWER,
                    )
                    .await?;
                report.conflicts += 1;
            }

            if outcome.changed {
                words.upsert(&outcome.word).await?;
                report.updated += 1;
            } else {
                report.unchanged += 1;
            }
        }

        if infer_deletions {
            let present: HashSet<&str> = documents.iter().map(Document::id).collect();
            let absent: Vec<WordId> = words
                .refs_in_scope(scope.dictionary_id())
                .await?
                .into_iter()
                .filter(|stored| stored.synced && !present.contains(stored.id.as_str()))
                .map(|stored| stored.id)
                .collect();

            for id in &absent {
                if words.delete(id).await? {
                    report.deleted += 1;
                }
            }
        }

        tracing::debug!(
            scope = %scope,
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            skipped = report.skipped,
            "Reconciled remote documents"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Meaning;
    use crate::remote::DocPath;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn remote_doc(user: &str, id: &str, headword: &str, updated_at: i64) -> Document {
        Document {
            path: DocPath::user_word(user, id).unwrap(),
            data: json!({
                "headword": headword,
                "createdAt": 1,
                "updatedAt": updated_at,
                "meanings": [{"id": "m1", "definition": "d", "examples": ["y"], "order": 0, "timestamp": 1}]
            }),
        }
    }

    fn synced_word(id: &str, updated_at: i64) -> Word {
        let mut word = Word::new(id, "en", updated_at);
        word.id = id.parse().unwrap();
        word.synced = true;
        word
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_upsert_and_get_roundtrip() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let word = Word::new("hello", "en", 1);
        store.upsert_word(&word).await.unwrap();

        assert_eq!(store.get_word(&word.id).await.unwrap(), Some(word));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reconcile_inserts_and_merges() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let scope = Scope::private("u1");

        let mut local = synced_word("w1", 5);
        let mut meaning = Meaning::new("d", 0, 1);
        meaning.id = crate::models::MeaningId::from_raw("m1");
        meaning.add_example("x");
        local.meanings.push(meaning);
        local.touch(6);
        store.upsert_word(&local).await.unwrap();

        let docs = vec![
            remote_doc("u1", "w1", "w1", 10),
            remote_doc("u1", "w2", "two", 10),
        ];
        let report = store.reconcile(&scope, &docs, false, 100).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 1);

        let merged = store.get_word(&local.id).await.unwrap().unwrap();
        assert_eq!(merged.meanings[0].examples, vec!["x", "y"]);
        // local example still has to reach the remote
        assert!(!merged.synced);

        let inserted = store.get_word(&"w2".parse().unwrap()).await.unwrap().unwrap();
        assert!(inserted.synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reconcile_twice_is_idempotent() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let scope = Scope::private("u1");
        let docs = vec![remote_doc("u1", "w1", "one", 10)];

        store.reconcile(&scope, &docs, false, 100).await.unwrap();
        let before = store.get_word(&"w1".parse().unwrap()).await.unwrap();
        let report = store.reconcile(&scope, &docs, false, 100).await.unwrap();

        assert_eq!(report.unchanged, 1);
        assert!(!report.has_changes());
        assert_eq!(store.get_word(&"w1".parse().unwrap()).await.unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_remote_is_logged_as_conflict() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let scope = Scope::private("u1");
        let mut local = synced_word("w1", 50);
        local.touch(50);
        store.upsert_word(&local).await.unwrap();

        let report = store
            .reconcile(&scope, &[remote_doc("u1", "w1", "old", 10)], false, 99)
            .await
            .unwrap();
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.unchanged, 1);

        let conflicts = store.list_conflicts(10).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].scope, "private:u1");
        assert_eq!(conflicts[0].local_updated_at, 50);
        assert_eq!(conflicts[0].incoming_updated_at, 10);
        assert_eq!(conflicts[0].resolved_at, 99);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stale_remote_over_synced_row_queues_local_copy() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let scope = Scope::private("u1");
        let local = synced_word("w1", 50);
        store.upsert_word(&local).await.unwrap();

        let report = store
            .reconcile(&scope, &[remote_doc("u1", "w1", "old", 10)], false, 99)
            .await
            .unwrap();
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.updated, 1);

        let stored = store.get_word(&local.id).await.unwrap().unwrap();
        assert_eq!(stored.headword, "w1");
        assert_eq!(stored.updated_at, 50);
        assert!(!stored.synced);
        assert_eq!(store.list_unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_and_queued_documents_are_skipped() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let scope = Scope::private("u1");
        let word = synced_word("gone", 1);
        store.upsert_word(&word).await.unwrap();
        store.delete_word(&word.id, 2).await.unwrap();

        let broken = Document {
            path: DocPath::user_word("u1", "bad").unwrap(),
            data: json!({"headword": 42}),
        };
        let docs = vec![broken, remote_doc("u1", "gone", "gone", 5)];
        let report = store.reconcile(&scope, &docs, true, 10).await.unwrap();

        assert_eq!(report.skipped, 2);
        assert!(store.get_word(&word.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deletion_inference_spares_unsynced_and_other_scopes() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let scope = Scope::private("u1");

        let kept = synced_word("kept", 1);
        let removed = synced_word("removed", 1);
        let pending = Word::new("pending", "en", 1);
        let mut shared = synced_word("shared", 1);
        shared.dictionary_id = Some("d1".into());
        for word in [&kept, &removed, &pending, &shared] {
            store.upsert_word(word).await.unwrap();
        }

        let report = store
            .reconcile(&scope, &[remote_doc("u1", "kept", "kept", 1)], true, 10)
            .await
            .unwrap();

        assert_eq!(report.deleted, 1);
        assert!(store.get_word(&removed.id).await.unwrap().is_none());
        assert!(store.get_word(&pending.id).await.unwrap().is_some());
        assert!(store.get_word(&shared.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_word_queues_remote_delete() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut word = Word::new("x", "en", 1);
        word.dictionary_id = Some("d1".into());
        store.upsert_word(&word).await.unwrap();

        assert!(store.delete_word(&word.id, 7).await.unwrap());
        assert!(!store.delete_word(&word.id, 8).await.unwrap());

        let queued = store.pending_deletions().await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].dictionary_id.as_deref(), Some("d1"));
        assert_eq!(queued[0].deleted_at, 7);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reassign_dictionary_marks_rows_synced() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let word = Word::new("x", "en", 1);
        store.upsert_word(&word).await.unwrap();

        store
            .reassign_dictionary(&[word.id.clone()], Some("d1"))
            .await
            .unwrap();
        let moved = store.get_word(&word.id).await.unwrap().unwrap();
        assert_eq!(moved.dictionary_id.as_deref(), Some("d1"));
        assert!(moved.synced);
    }
}
