//! In-process document store, optionally persisted to a JSON file

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use super::write::apply_field;
use super::{
    DocPath, Document, RemoteError, RemoteResult, RemoteStore, Snapshot, Subscription, WriteOp,
};

/// On-disk layout of a persisted store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    documents: BTreeMap<String, Value>,
}

#[derive(Debug)]
struct Subscriber {
    collection: DocPath,
    sender: mpsc::UnboundedSender<RemoteResult<Snapshot>>,
}

/// Scripted commit failures
#[derive(Debug, Default)]
struct FaultPlan {
    /// Commits still allowed to succeed before later ones fail
    successes_left: Option<usize>,
    /// Failures once `successes_left` runs out; `None` fails forever
    burst: Option<usize>,
    /// Commits that fail before normal behavior resumes
    fail_next: usize,
    unavailable: bool,
}

impl FaultPlan {
    /// Decide the outcome of one commit attempt.
    fn next_commit_fails(&mut self) -> bool {
        if self.unavailable {
            return true;
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return true;
        }
        match self.successes_left.as_mut() {
            Some(0) => match self.burst.as_mut() {
                None => true,
                Some(0) => {
                    self.successes_left = None;
                    self.burst = None;
                    false
                }
                Some(failures) => {
                    *failures -= 1;
                    true
                }
            },
            Some(left) => {
                *left -= 1;
                false
            }
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    documents: BTreeMap<DocPath, Value>,
    subscribers: Vec<Subscriber>,
    faults: FaultPlan,
}

impl StoreState {
    fn snapshot(&self, collection: &DocPath) -> Snapshot {
        let documents = self
            .documents
            .iter()
            .filter(|(path, _)| path.parent().as_ref() == Some(collection))
            .map(|(path, data)| Document {
                path: path.clone(),
                data: data.clone(),
            })
            .collect();
        Snapshot {
            collection: collection.clone(),
            documents,
        }
    }

    /// Push a fresh snapshot to subscribers of the given collections.
    fn notify(&mut self, collections: &BTreeSet<DocPath>) {
        let snapshots: BTreeMap<DocPath, Snapshot> = collections
            .iter()
            .map(|collection| (collection.clone(), self.snapshot(collection)))
            .collect();

        self.subscribers
            .retain(|subscriber| match snapshots.get(&subscriber.collection) {
                Some(snapshot) => subscriber.sender.send(Ok(snapshot.clone())).is_ok(),
                None => !subscriber.sender.is_closed(),
            });
    }
}

/// A [`RemoteStore`] holding documents in memory.
///
/// When opened on a file, every successful commit rewrites the file, and
/// [`reload`](Self::reload) picks up changes made by other processes.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: Mutex<StoreState>,
    file: Option<PathBuf>,
    commit_attempts: AtomicUsize,
}

impl MemoryDocumentStore {
    /// Create an empty, non-persistent store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, starting empty when the file is missing.
    pub fn open(path: impl AsRef<Path>) -> RemoteResult<Self> {
        let path = path.as_ref().to_path_buf();
        let documents = read_store_file(&path)?;
        Ok(Self {
            state: Mutex::new(StoreState {
                documents,
                ..StoreState::default()
            }),
            file: Some(path),
            commit_attempts: AtomicUsize::new(0),
        })
    }

    /// Backing file, if any
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Re-read the backing file and notify subscribers whose collection changed.
    ///
    /// Returns whether anything changed.
    pub async fn reload(&self) -> RemoteResult<bool> {
        let Some(path) = &self.file else {
            return Ok(false);
        };
        let documents = read_store_file(path)?;

        let mut state = self.state.lock().await;
        if state.documents == documents {
            return Ok(false);
        }

        let mut touched: BTreeSet<DocPath> = BTreeSet::new();
        for path in state.documents.keys().chain(documents.keys()) {
            if state.documents.get(path) != documents.get(path) {
                if let Some(parent) = path.parent() {
                    touched.insert(parent);
                }
            }
        }
        state.documents = documents;
        state.notify(&touched);
        Ok(true)
    }

    /// Let the next `successes` commits through, then fail every later one.
    pub async fn fail_commits_after(&self, successes: usize) {
        let mut state = self.state.lock().await;
        state.faults.successes_left = Some(successes);
        state.faults.burst = None;
    }

    /// Let `successes` commits through, fail the next `failures`, then recover.
    pub async fn fail_burst_after(&self, successes: usize, failures: usize) {
        let mut state = self.state.lock().await;
        state.faults.successes_left = Some(successes);
        state.faults.burst = Some(failures);
    }

    /// Fail the next `count` commits, then behave normally.
    pub async fn fail_next_commits(&self, count: usize) {
        self.state.lock().await.faults.fail_next = count;
    }

    /// Simulate loss of connectivity for every operation.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.faults.unavailable = unavailable;
    }

    /// Clear all scripted failures.
    pub async fn clear_faults(&self) {
        self.state.lock().await.faults = FaultPlan::default();
    }

    /// Deliver a stream error to every subscriber of `collection`.
    pub async fn inject_stream_error(&self, collection: &DocPath, message: &str) {
        let state = self.state.lock().await;
        for subscriber in state
            .subscribers
            .iter()
            .filter(|subscriber| &subscriber.collection == collection)
        {
            let _ = subscriber
                .sender
                .send(Err(RemoteError::Unavailable(message.to_string())));
        }
    }

    /// Number of commit calls seen so far, failed ones included.
    pub fn commit_attempts(&self) -> usize {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    /// Number of stored documents
    pub async fn document_count(&self) -> usize {
        self.state.lock().await.documents.len()
    }

    fn persist(&self, documents: &BTreeMap<DocPath, Value>) -> RemoteResult<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let file = StoreFile {
            documents: documents
                .iter()
                .map(|(path, data)| (path.to_string(), data.clone()))
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|error| RemoteError::Storage(error.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| RemoteError::Storage(error.to_string()))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|error| RemoteError::Storage(error.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|error| RemoteError::Storage(error.to_string()))?;
        Ok(())
    }

    fn ensure_available(state: &StoreState) -> RemoteResult<()> {
        if state.faults.unavailable {
            Err(RemoteError::Unavailable("remote store is offline".into()))
        } else {
            Ok(())
        }
    }
}

fn read_store_file(path: &Path) -> RemoteResult<BTreeMap<DocPath, Value>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw =
        std::fs::read_to_string(path).map_err(|error| RemoteError::Storage(error.to_string()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let file: StoreFile =
        serde_json::from_str(&raw).map_err(|error| RemoteError::Storage(error.to_string()))?;

    file.documents
        .into_iter()
        .map(|(path, data)| Ok((path.parse::<DocPath>()?, data)))
        .collect()
}

#[async_trait]
impl RemoteStore for MemoryDocumentStore {
    async fn commit(&self, ops: &[WriteOp]) -> RemoteResult<()> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;

        if state.faults.next_commit_fails() {
            return Err(RemoteError::Unavailable("commit rejected".into()));
        }
        if let Some(op) = ops.iter().find(|op| !op.path().is_document()) {
            return Err(RemoteError::InvalidRequest(format!(
                "{} is not a document path",
                op.path()
            )));
        }

        let mut documents = state.documents.clone();
        let mut touched = BTreeSet::new();
        for op in ops {
            if let Some(parent) = op.path().parent() {
                touched.insert(parent);
            }
            match op {
                WriteOp::Set { path, data } => {
                    documents.insert(path.clone(), data.clone());
                }
                WriteOp::Merge { path, fields } => {
                    let document = documents
                        .entry(path.clone())
                        .or_insert_with(|| Value::Object(serde_json::Map::new()));
                    for (field, value) in fields {
                        apply_field(document, field, value.clone());
                    }
                }
                WriteOp::Delete { path } => {
                    documents.remove(path);
                }
            }
        }

        self.persist(&documents)?;
        state.documents = documents;
        state.notify(&touched);
        tracing::debug!(ops = ops.len(), "Committed remote batch");
        Ok(())
    }

    async fn fetch_collection(&self, collection: &DocPath) -> RemoteResult<Vec<Document>> {
        let state = self.state.lock().await;
        Self::ensure_available(&state)?;
        Ok(state.snapshot(collection).documents)
    }

    async fn get_document(&self, path: &DocPath) -> RemoteResult<Option<Document>> {
        let state = self.state.lock().await;
        Self::ensure_available(&state)?;
        Ok(state.documents.get(path).map(|data| Document {
            path: path.clone(),
            data: data.clone(),
        }))
    }

    async fn subscribe(&self, collection: &DocPath) -> RemoteResult<Subscription> {
        if !collection.is_collection() {
            return Err(RemoteError::InvalidRequest(format!(
                "{collection} is not a collection"
            )));
        }

        let mut state = self.state.lock().await;
        Self::ensure_available(&state)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, so the initial send cannot fail.
        let _ = sender.send(Ok(state.snapshot(collection)));
        state.subscribers.push(Subscriber {
            collection: collection.clone(),
            sender,
        });
        Ok(Subscription::new(receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::FieldPath;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn word_path(id: &str) -> DocPath {
        DocPath::user_word("u1", id).unwrap()
    }

    fn set(id: &str, headword: &str) -> WriteOp {
        WriteOp::Set {
            path: word_path(id),
            data: json!({"headword": headword, "updatedAt": 1}),
        }
    }

    #[tokio::test]
    async fn commit_then_fetch_collection() {
        let store = MemoryDocumentStore::new();
        store
            .commit(&[set("a", "alpha"), set("b", "beta")])
            .await
            .unwrap();

        let docs = store
            .fetch_collection(&DocPath::user_words("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id(), "a");
        assert!(store
            .fetch_collection(&DocPath::user_words("u2").unwrap())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn failed_commit_is_atomic() {
        let store = MemoryDocumentStore::new();
        store.fail_next_commits(1).await;

        assert!(store.commit(&[set("a", "alpha")]).await.is_err());
        assert_eq!(store.document_count().await, 0);

        store.commit(&[set("a", "alpha")]).await.unwrap();
        assert_eq!(store.document_count().await, 1);
        assert_eq!(store.commit_attempts(), 2);
    }

    #[tokio::test]
    async fn fail_commits_after_lets_some_through() {
        let store = MemoryDocumentStore::new();
        store.fail_commits_after(1).await;

        store.commit(&[set("a", "alpha")]).await.unwrap();
        assert!(store.commit(&[set("b", "beta")]).await.is_err());
        assert!(store.commit(&[set("b", "beta")]).await.is_err());

        store.clear_faults().await;
        store.commit(&[set("b", "beta")]).await.unwrap();
    }

    #[tokio::test]
    async fn fail_burst_after_recovers() {
        let store = MemoryDocumentStore::new();
        store.fail_burst_after(1, 2).await;

        store.commit(&[set("a", "alpha")]).await.unwrap();
        assert!(store.commit(&[set("b", "beta")]).await.is_err());
        assert!(store.commit(&[set("b", "beta")]).await.is_err());
        store.commit(&[set("b", "beta")]).await.unwrap();
        store.commit(&[set("c", "gamma")]).await.unwrap();
        assert_eq!(store.document_count().await, 3);
    }

    #[tokio::test]
    async fn merge_preserves_other_fields() {
        let store = MemoryDocumentStore::new();
        let path = DocPath::dictionary_word("d1", "w1").unwrap();
        store
            .commit(&[WriteOp::Set {
                path: path.clone(),
                data: json!({"headword": "x", "likes": {"a@x.com": true}}),
            }])
            .await
            .unwrap();
        store
            .commit(&[WriteOp::Merge {
                path: path.clone(),
                fields: vec![
                    (FieldPath::new(["likes", "b@x.com"]), json!(true)),
                    (FieldPath::field("headword"), json!("y")),
                ],
            }])
            .await
            .unwrap();

        let doc = store.get_document(&path).await.unwrap().unwrap();
        assert_eq!(
            doc.data,
            json!({"headword": "y", "likes": {"a@x.com": true, "b@x.com": true}})
        );
    }

    #[tokio::test]
    async fn subscription_delivers_initial_and_change_snapshots() {
        let store = MemoryDocumentStore::new();
        let collection = DocPath::user_words("u1").unwrap();
        let mut subscription = store.subscribe(&collection).await.unwrap();

        let initial = subscription.next().await.unwrap().unwrap();
        assert!(initial.is_empty());

        store.commit(&[set("a", "alpha")]).await.unwrap();
        let changed = subscription.next().await.unwrap().unwrap();
        assert_eq!(changed.documents.len(), 1);

        store
            .commit(&[WriteOp::Delete { path: word_path("a") }])
            .await
            .unwrap();
        let deleted = subscription.next().await.unwrap().unwrap();
        assert!(deleted.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_rejects_reads() {
        let store = MemoryDocumentStore::new();
        store.set_unavailable(true).await;
        let collection = DocPath::user_words("u1").unwrap();

        assert!(matches!(
            store.fetch_collection(&collection).await,
            Err(RemoteError::Unavailable(_))
        ));
        assert!(store.subscribe(&collection).await.is_err());
    }

    #[tokio::test]
    async fn file_store_persists_and_reloads() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("remote.json");

        let writer = MemoryDocumentStore::open(&file).unwrap();
        let reader = MemoryDocumentStore::open(&file).unwrap();
        let collection = DocPath::user_words("u1").unwrap();
        let mut subscription = reader.subscribe(&collection).await.unwrap();
        assert!(subscription.next().await.unwrap().unwrap().is_empty());

        writer.commit(&[set("a", "alpha")]).await.unwrap();
        assert!(reader.reload().await.unwrap());
        assert!(!reader.reload().await.unwrap());

        let snapshot = subscription.next().await.unwrap().unwrap();
        assert_eq!(snapshot.documents[0].data["headword"], json!("alpha"));

        let reopened = MemoryDocumentStore::open(&file).unwrap();
        assert_eq!(reopened.document_count().await, 1);
    }
}
