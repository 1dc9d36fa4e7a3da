//! Sync engine: push, pull and listener start-up for a signed-in user
//!
//! Every networked operation checks, in order, the user id, the sync
//! entitlement and only then talks to the remote store.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};

use super::batch::BatchCommitter;
use super::clock::Clock;
use super::error::{SyncError, SyncResult};
use super::events::{EventBus, SyncEvent};
use super::identity::{authorize, validate_user_id, Identity, SyncEntitlement};
use super::listener::{scope_collection, ListenerManager};
use crate::config::SyncConfig;
use crate::db::{PendingDeletion, LAST_SIGNED_IN_USER};
use crate::models::{Scope, Word, WordId};
use crate::remote::{codec, DocPath, RemoteStore, WriteOp};
use crate::services::{LocalStore, ReconcileReport};
use crate::state::SyncState;

/// Outcome of [`SyncEngine::push_unsynced`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    /// Words written to the remote store
    pub pushed: usize,
    /// Queued remote deletes flushed
    pub deleted: usize,
}

/// Outcome of [`SyncEngine::sign_in`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignInReport {
    /// A different user (or nobody) signed in last on this store
    pub fresh_login: bool,
    /// Words flipped to unsynced because of a fresh login
    pub marked_unsynced: usize,
    pub push: PushReport,
}

pub struct SyncEngine {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    entitlement: Arc<dyn SyncEntitlement>,
    clock: Arc<dyn Clock>,
    committer: BatchCommitter,
    listeners: ListenerManager,
    events: EventBus,
    state: watch::Sender<SyncState>,
    identity: Mutex<Option<Identity>>,
}

impl SyncEngine {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteStore>,
        entitlement: Arc<dyn SyncEntitlement>,
        clock: Arc<dyn Clock>,
        config: &SyncConfig,
    ) -> Self {
        let events = EventBus::default();
        let committer = BatchCommitter::new(remote.clone(), config);
        let listeners = ListenerManager::new(
            remote.clone(),
            store.clone(),
            clock.clone(),
            events.clone(),
            config,
        );
        let (state, _) = watch::channel(SyncState::Offline);

        Self {
            store,
            remote,
            entitlement,
            clock,
            committer,
            listeners,
            events,
            state,
            identity: Mutex::new(None),
        }
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        self.remote.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub const fn committer(&self) -> &BatchCommitter {
        &self.committer
    }

    pub const fn listeners(&self) -> &ListenerManager {
        &self.listeners
    }

    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.identity.lock().await.clone()
    }

    /// The signed-in user, or [`SyncError::NotSignedIn`].
    pub async fn signed_in(&self) -> SyncResult<Identity> {
        self.identity().await.ok_or(SyncError::NotSignedIn)
    }

    /// Check the user id and the entitlement before any remote call.
    pub fn gate<'a>(&self, user_id: &'a str) -> SyncResult<&'a str> {
        authorize(self.entitlement.as_ref(), user_id)
    }

    pub fn entitlement(&self) -> Arc<dyn SyncEntitlement> {
        self.entitlement.clone()
    }

    /// Fresh-login migration, push of pending local state, then the private listener.
    pub async fn sign_in(&self, identity: Identity) -> SyncResult<SignInReport> {
        self.gate(&identity.user_id)?;
        self.set_state(SyncState::Syncing);

        let result = self.sign_in_steps(&identity).await;
        if result.is_ok() {
            tracing::info!(user_id = %identity.user_id, "Signed in");
            *self.identity.lock().await = Some(identity);
        }
        self.finish(result)
    }

    async fn sign_in_steps(&self, identity: &Identity) -> SyncResult<SignInReport> {
        let user_id = identity.user_id.as_str();
        let last_user = self.store.setting(LAST_SIGNED_IN_USER).await?;
        let fresh_login = last_user.as_deref() != Some(user_id);

        let marked_unsynced = if fresh_login {
            let marked = self.store.mark_all_unsynced().await?;
            self.store.set_setting(LAST_SIGNED_IN_USER, user_id).await?;
            tracing::info!(user_id, marked, "Fresh login, local words queued for push");
            marked
        } else {
            0
        };

        let push = self.push_pending(user_id).await?;
        self.listeners.start(identity.private_scope()).await?;

        Ok(SignInReport {
            fresh_login,
            marked_unsynced,
            push,
        })
    }

    /// Stop every listener and forget the login's sessions.
    pub async fn sign_out(&self) {
        self.listeners.stop_all().await;
        self.listeners.reset_sessions().await;
        if let Some(identity) = self.identity.lock().await.take() {
            tracing::info!(user_id = %identity.user_id, "Signed out");
        }
        self.set_state(SyncState::Offline);
    }

    /// Flip every synced local word to unsynced.
    pub async fn mark_existing_as_unsynced(&self, user_id: &str) -> SyncResult<usize> {
        validate_user_id(user_id)?;
        Ok(self.store.mark_all_unsynced().await?)
    }

    /// Write every unsynced word, then flush queued remote deletes.
    ///
    /// Words are marked synced chunk by chunk as commits succeed; a failing
    /// chunk leaves its words and everything after it unsynced.
    pub async fn push_unsynced(&self, user_id: &str) -> SyncResult<PushReport> {
        let user_id = self.gate(user_id)?;
        self.set_state(SyncState::Syncing);
        let result = self.push_pending(user_id).await;
        self.finish(result)
    }

    async fn push_pending(&self, user_id: &str) -> SyncResult<PushReport> {
        let mut words = self.store.list_unsynced().await?;
        // stable: private words first, then each dictionary in turn
        words.sort_by(|a, b| a.dictionary_id.cmp(&b.dictionary_id));

        let batch_size = self.committer.batch_size();
        let mut report = PushReport::default();
        let mut chunk_index = 0;

        for chunk in words.chunks(batch_size) {
            let ops = chunk
                .iter()
                .map(|word| upsert_op(user_id, word))
                .collect::<SyncResult<Vec<_>>>()?;
            self.committer.commit_chunk(chunk_index, &ops).await?;

            let pushed: Vec<(WordId, i64)> = chunk
                .iter()
                .map(|word| (word.id.clone(), word.updated_at))
                .collect();
            self.store.mark_pushed(&pushed).await?;
            report.pushed += chunk.len();
            chunk_index += 1;
        }

        let deletions = self.store.pending_deletions().await?;
        for chunk in deletions.chunks(batch_size) {
            let ops = chunk
                .iter()
                .map(|deletion| {
                    Ok(WriteOp::Delete {
                        path: deletion_path(user_id, deletion)?,
                    })
                })
                .collect::<SyncResult<Vec<_>>>()?;
            self.committer.commit_chunk(chunk_index, &ops).await?;

            let ids: Vec<WordId> = chunk.iter().map(|deletion| deletion.word_id.clone()).collect();
            self.store.clear_deletions(&ids).await?;
            report.deleted += chunk.len();
            chunk_index += 1;
        }

        if report.pushed + report.deleted > 0 {
            tracing::info!(
                pushed = report.pushed,
                deleted = report.deleted,
                chunks = chunk_index,
                "Pushed local changes"
            );
            self.events.publish(SyncEvent::Pushed {
                pushed: report.pushed,
                deleted: report.deleted,
            });
        }
        Ok(report)
    }

    /// Merge the user's whole private collection into the local store.
    pub async fn pull_all(&self, user_id: &str) -> SyncResult<ReconcileReport> {
        self.pull_scope(user_id, &Scope::private(user_id)).await
    }

    /// Fetch one scope's collection once and merge it as create-or-update.
    ///
    /// Never deletes local rows.
    pub async fn pull_scope(&self, user_id: &str, scope: &Scope) -> SyncResult<ReconcileReport> {
        self.gate(user_id)?;
        self.set_state(SyncState::Syncing);

        let result = async {
            let collection = scope_collection(scope)?;
            let documents = self.remote.fetch_collection(&collection).await?;
            let report = self
                .store
                .reconcile(scope, &documents, false, self.clock.now_millis())
                .await?;
            tracing::info!(
                scope = %scope,
                documents = documents.len(),
                inserted = report.inserted,
                updated = report.updated,
                "Pulled remote collection"
            );
            Ok::<_, SyncError>(report)
        }
        .await;
        self.finish(result)
    }

    /// Push pending state, then listen to a shared dictionary.
    pub async fn activate_dictionary(&self, dictionary_id: &str) -> SyncResult<PushReport> {
        let identity = self.signed_in().await?;
        let user_id = self.gate(&identity.user_id)?;
        self.set_state(SyncState::Syncing);

        let result = async {
            let push = self.push_pending(user_id).await?;
            self.listeners.start(Scope::shared(dictionary_id)).await?;
            Ok::<_, SyncError>(push)
        }
        .await;
        self.finish(result)
    }

    /// Stop listening to a shared dictionary.
    pub async fn deactivate_dictionary(&self, dictionary_id: &str) -> bool {
        self.listeners.stop(&Scope::shared(dictionary_id)).await
    }

    fn set_state(&self, state: SyncState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(state = state.label(), "Sync state changed");
            self.events.publish(SyncEvent::StateChanged(state));
        }
    }

    fn finish<T>(&self, result: SyncResult<T>) -> SyncResult<T> {
        match &result {
            Ok(_) => self.set_state(SyncState::Synced),
            Err(error) => {
                tracing::warn!(error = %error, "Sync operation failed");
                self.set_state(SyncState::Error);
            }
        }
        result
    }
}

/// Private words replace their document; shared words merge so that other
/// collaborators' likes and difficulties survive.
fn upsert_op(user_id: &str, word: &Word) -> SyncResult<WriteOp> {
    let path = codec::word_document_path(user_id, word)?;
    let data = codec::encode_word(word)?;
    if word.is_shared() {
        Ok(WriteOp::merge_top_level(
            path,
            data,
            &codec::COLLABORATIVE_FIELDS,
        ))
    } else {
        Ok(WriteOp::Set { path, data })
    }
}

fn deletion_path(user_id: &str, deletion: &PendingDeletion) -> SyncResult<DocPath> {
    let path = match &deletion.dictionary_id {
        Some(dictionary_id) => DocPath::dictionary_word(dictionary_id, deletion.word_id.as_str())?,
        None => DocPath::user_word(user_id, deletion.word_id.as_str())?,
    };
    Ok(path)
}
