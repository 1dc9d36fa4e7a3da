//! Per-login, per-scope listener session state

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::Scope;

/// What a scope's listener has seen since login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSession {
    /// At least one full snapshot was reconciled; absence now means deletion
    pub first_snapshot_seen: bool,
    pub snapshots_applied: u64,
}

/// Sessions of every scope, shared by all listener tasks.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Scope, SyncSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the scope's session unless one already exists.
    pub async fn ensure(&self, scope: &Scope) {
        self.sessions
            .lock()
            .await
            .entry(scope.clone())
            .or_default();
    }

    pub async fn get(&self, scope: &Scope) -> Option<SyncSession> {
        self.sessions.lock().await.get(scope).copied()
    }

    pub async fn first_snapshot_seen(&self, scope: &Scope) -> bool {
        self.get(scope)
            .await
            .is_some_and(|session| session.first_snapshot_seen)
    }

    /// Record one reconciled snapshot.
    pub async fn record_snapshot(&self, scope: &Scope) {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(scope.clone()).or_default();
        session.first_snapshot_seen = true;
        session.snapshots_applied += 1;
    }

    /// Forget every session (logout).
    pub async fn reset(&self) {
        self.sessions.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_keeps_existing_session() {
        let registry = SessionRegistry::new();
        let scope = Scope::private("u1");

        registry.ensure(&scope).await;
        assert!(!registry.first_snapshot_seen(&scope).await);

        registry.record_snapshot(&scope).await;
        registry.ensure(&scope).await;
        assert!(registry.first_snapshot_seen(&scope).await);
        assert_eq!(registry.get(&scope).await.unwrap().snapshots_applied, 1);
    }

    #[tokio::test]
    async fn reset_forgets_everything() {
        let registry = SessionRegistry::new();
        let scope = Scope::shared("d1");
        registry.record_snapshot(&scope).await;

        registry.reset().await;
        assert_eq!(registry.get(&scope).await, None);
    }
}
