//! Real-time listeners: one live subscription per scope
//!
//! Each snapshot is merged into the local store. Rows missing from a snapshot
//! are only deleted once the scope has reconciled a full snapshot, or when the
//! snapshot itself is non-empty, so an empty first delivery cannot wipe the
//! store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::clock::Clock;
use super::error::SyncResult;
use super::events::{EventBus, SyncEvent};
use super::session::{SessionRegistry, SyncSession};
use crate::config::SyncConfig;
use crate::models::Scope;
use crate::remote::{DocPath, RemoteError, RemoteStore, Snapshot, Subscription};
use crate::services::{LocalStore, ReconcileReport};

/// Word collection a scope is stored in.
pub fn scope_collection(scope: &Scope) -> Result<DocPath, RemoteError> {
    match scope {
        Scope::Private { user_id } => DocPath::user_words(user_id),
        Scope::Shared { dictionary_id } => DocPath::dictionary_words(dictionary_id),
    }
}

/// State shared with every listener task.
#[derive(Clone)]
struct ListenerContext {
    store: LocalStore,
    clock: Arc<dyn Clock>,
    events: EventBus,
    sessions: SessionRegistry,
    infer_shared_deletions: bool,
}

impl ListenerContext {
    async fn apply_snapshot(&self, scope: &Scope, snapshot: &Snapshot) -> crate::Result<ReconcileReport> {
        let first_seen = self.sessions.first_snapshot_seen(scope).await;
        let absence_is_deletion = !snapshot.is_empty() || first_seen;
        let scope_allows = !scope.is_shared() || self.infer_shared_deletions;

        let report = self
            .store
            .reconcile(
                scope,
                &snapshot.documents,
                absence_is_deletion && scope_allows,
                self.clock.now_millis(),
            )
            .await?;
        self.sessions.record_snapshot(scope).await;

        tracing::debug!(
            scope = %scope,
            documents = snapshot.documents.len(),
            first = !first_seen,
            "Applied snapshot"
        );
        self.events.publish(SyncEvent::SnapshotApplied {
            scope: scope.clone(),
            report,
        });
        Ok(report)
    }

    async fn run(self, scope: Scope, mut subscription: Subscription) {
        while let Some(item) = subscription.next().await {
            let failure = match item {
                Ok(snapshot) => self.apply_snapshot(&scope, &snapshot).await.err().map(|e| e.to_string()),
                Err(error) => Some(error.to_string()),
            };
            if let Some(message) = failure {
                tracing::warn!(scope = %scope, error = %message, "Listener error");
                self.events.publish(SyncEvent::ListenerError {
                    scope: scope.clone(),
                    message,
                });
            }
        }
        tracing::debug!(scope = %scope, "Subscription closed");
    }
}

/// Owns the live subscription of every active scope.
pub struct ListenerManager {
    remote: Arc<dyn RemoteStore>,
    context: ListenerContext,
    listeners: Mutex<HashMap<Scope, JoinHandle<()>>>,
}

impl ListenerManager {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        store: LocalStore,
        clock: Arc<dyn Clock>,
        events: EventBus,
        config: &SyncConfig,
    ) -> Self {
        Self {
            remote,
            context: ListenerContext {
                store,
                clock,
                events,
                sessions: SessionRegistry::new(),
                infer_shared_deletions: config.infer_shared_deletions,
            },
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to `scope`, replacing any existing subscription for it.
    ///
    /// The scope's session is created on first start and kept across restarts.
    pub async fn start(&self, scope: Scope) -> SyncResult<()> {
        let collection = scope_collection(&scope)?;
        let subscription = self.remote.subscribe(&collection).await?;
        self.context.sessions.ensure(&scope).await;

        let mut listeners = self.listeners.lock().await;
        if let Some(previous) = listeners.remove(&scope) {
            previous.abort();
            // wait until the old task is gone so one scope never has two writers
            let _ = previous.await;
        }
        let task = tokio::spawn(self.context.clone().run(scope.clone(), subscription));
        listeners.insert(scope.clone(), task);
        drop(listeners);
        tracing::info!(scope = %scope, "Listener started");
        Ok(())
    }

    /// Drop the subscription of `scope`. Its session is kept.
    pub async fn stop(&self, scope: &Scope) -> bool {
        let Some(task) = self.listeners.lock().await.remove(scope) else {
            return false;
        };
        task.abort();
        tracing::info!(scope = %scope, "Listener stopped");
        true
    }

    pub async fn stop_all(&self) {
        let mut listeners = self.listeners.lock().await;
        for (scope, task) in listeners.drain() {
            task.abort();
            tracing::info!(scope = %scope, "Listener stopped");
        }
    }

    /// Forget every scope's session (logout).
    pub async fn reset_sessions(&self) {
        self.context.sessions.reset().await;
    }

    pub async fn is_listening(&self, scope: &Scope) -> bool {
        self.listeners
            .lock()
            .await
            .get(scope)
            .is_some_and(|task| !task.is_finished())
    }

    pub async fn active_scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.listeners.lock().await.keys().cloned().collect();
        scopes.sort();
        scopes
    }

    pub async fn session(&self, scope: &Scope) -> Option<SyncSession> {
        self.context.sessions.get(scope).await
    }

    /// Reconcile one snapshot as if it had been delivered by the subscription.
    pub async fn apply_snapshot(
        &self,
        scope: &Scope,
        snapshot: &Snapshot,
    ) -> SyncResult<ReconcileReport> {
        Ok(self.context.apply_snapshot(scope, snapshot).await?)
    }
}

impl Drop for ListenerManager {
    fn drop(&mut self) {
        if let Ok(listeners) = self.listeners.try_lock() {
            for task in listeners.values() {
                task.abort();
            }
        }
    }
}
