//! Sync bookkeeping: pending remote deletions and the conflict log

use std::collections::HashSet;

use crate::error::Result;
use crate::models::{SyncConflict, WordId};
use libsql::Connection;

/// A local delete that still has to reach the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub word_id: WordId,
    /// `None` for the private dictionary
    pub dictionary_id: Option<String>,
    /// Unix ms
    pub deleted_at: i64,
}

/// Trait for sync bookkeeping storage (async)
#[allow(async_fn_in_trait)]
pub trait SyncRepository {
    /// Queue a remote delete; re-queueing the same word overwrites the entry
    async fn enqueue_deletion(&self, deletion: &PendingDeletion) -> Result<()>;

    /// All queued deletes, oldest first
    async fn pending_deletions(&self) -> Result<Vec<PendingDeletion>>;

    /// Ids of all queued deletes
    async fn pending_deletion_ids(&self) -> Result<HashSet<WordId>>;

    /// Drop queue entries once their remote delete committed
    async fn clear_deletions(&self, ids: &[WordId]) -> Result<()>;

    /// Append a rejected remote version to the conflict log
    async fn record_conflict(
        &self,
        word_id: &WordId,
        scope: &str,
        local_updated_at: i64,
        incoming_updated_at: i64,
        resolved_at: i64,
        strategy: &str,
    ) -> Result<()>;

    /// Most recent conflicts first
    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;
}

/// libSQL implementation of `SyncRepository`
pub struct LibSqlSyncRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSyncRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SyncRepository for LibSqlSyncRepository<'_> {
    async fn enqueue_deletion(&self, deletion: &PendingDeletion) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO pending_deletions (word_id, dictionary_id, deleted_at)
                 VALUES (?, ?, ?)",
                libsql::params![
                    deletion.word_id.as_str(),
                    deletion.dictionary_id.clone(),
                    deletion.deleted_at
                ],
            )
            .await?;
        Ok(())
    }

    async fn pending_deletions(&self) -> Result<Vec<PendingDeletion>> {
        let mut rows = self
            .conn
            .query(
                "SELECT word_id, dictionary_id, deleted_at FROM pending_deletions
                 ORDER BY deleted_at ASC",
                (),
            )
            .await?;

        let mut deletions = Vec::new();
        while let Some(row) = rows.next().await? {
            deletions.push(PendingDeletion {
                word_id: row.get::<String>(0)?.parse()?,
                dictionary_id: row.get(1)?,
                deleted_at: row.get(2)?,
            });
        }
        Ok(deletions)
    }

    async fn pending_deletion_ids(&self) -> Result<HashSet<WordId>> {
        let mut rows = self
            .conn
            .query("SELECT word_id FROM pending_deletions", ())
            .await?;

        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await? {
            ids.insert(row.get::<String>(0)?.parse()?);
        }
        Ok(ids)
    }

    async fn clear_deletions(&self, ids: &[WordId]) -> Result<()> {
        for id in ids {
            self.conn
                .execute(
                    "DELETE FROM pending_deletions WHERE word_id = ?",
                    [id.as_str()],
                )
                .await?;
        }
        Ok(())
    }

    async fn record_conflict(
        &self,
        word_id: &WordId,
        scope: &str,
        local_updated_at: i64,
        incoming_updated_at: i64,
        resolved_at: i64,
        strategy: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_conflicts
                 (word_id, scope, local_updated_at, incoming_updated_at, resolved_at, strategy)
                 VALUES (?, ?, ?, ?, ?, ?)",
                libsql::params![
                    word_id.as_str(),
                    scope,
                    local_updated_at,
                    incoming_updated_at,
                    resolved_at,
                    strategy
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, word_id, scope, local_updated_at, incoming_updated_at,
                        resolved_at, strategy
                 FROM sync_conflicts
                 ORDER BY resolved_at DESC, id DESC
                 LIMIT ?",
                [i64::try_from(limit).unwrap_or(i64::MAX)],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(SyncConflict {
                id: row.get(0)?,
                word_id: row.get(1)?,
                scope: row.get(2)?,
                local_updated_at: row.get(3)?,
                incoming_updated_at: row.get(4)?,
                resolved_at: row.get(5)?,
                strategy: row.get(6)?,
            });
        }
        Ok(conflicts)
    }
}
