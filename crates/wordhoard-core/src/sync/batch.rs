//! Chunked, retried writer over a [`RemoteStore`]
//!
//! Each chunk is one atomic remote commit. A failing chunk is retried with a
//! fixed delay; once its attempts are exhausted the commit stops there and
//! earlier chunks stay committed.

use std::sync::Arc;
use std::time::Duration;

use super::error::{SyncError, SyncResult};
use crate::config::{SyncConfig, MAX_BATCH_SIZE};
use crate::remote::{RemoteStore, WriteOp};

/// Outcome of a fully successful [`BatchCommitter::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub chunks: usize,
    pub ops: usize,
}

#[derive(Clone)]
pub struct BatchCommitter {
    remote: Arc<dyn RemoteStore>,
    batch_size: usize,
    max_attempts: u32,
    retry_delay: Duration,
}

impl BatchCommitter {
    pub fn new(remote: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self {
            remote,
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
        }
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Commit `ops` in sequential chunks of at most `batch_size`.
    pub async fn commit(&self, ops: &[WriteOp]) -> SyncResult<CommitReport> {
        let mut report = CommitReport::default();
        for (index, chunk) in ops.chunks(self.batch_size).enumerate() {
            self.commit_chunk(index, chunk).await?;
            report.chunks += 1;
            report.ops += chunk.len();
        }
        Ok(report)
    }

    /// Commit one pre-sized chunk, retrying on failure.
    ///
    /// `index` is the chunk's position in its sequence; all earlier chunks are
    /// assumed committed when reporting a failure.
    pub async fn commit_chunk(&self, index: usize, chunk: &[WriteOp]) -> SyncResult<()> {
        if chunk.len() > self.batch_size {
            return Err(SyncError::Local(crate::Error::InvalidInput(format!(
                "chunk of {} ops exceeds batch size {}",
                chunk.len(),
                self.batch_size
            ))));
        }

        let mut attempt = 1;
        loop {
            match self.remote.commit(chunk).await {
                Ok(()) => {
                    tracing::debug!(chunk = index, attempt, ops = chunk.len(), "Committed chunk");
                    return Ok(());
                }
                Err(error) if attempt < self.max_attempts => {
                    tracing::warn!(
                        chunk = index,
                        attempt,
                        error = %error,
                        "Chunk commit failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        chunk = index,
                        attempts = attempt,
                        error = %error,
                        "Chunk commit failed, giving up"
                    );
                    return Err(SyncError::SyncFailed {
                        chunk: index,
                        attempts: attempt,
                        committed_chunks: index,
                        source: error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{DocPath, MemoryDocumentStore};
    use serde_json::json;
    use tokio::time::Instant;

    fn ops(count: usize) -> Vec<WriteOp> {
        (0..count)
            .map(|i| WriteOp::Set {
                path: DocPath::user_word("u1", &format!("w{i:04}")).unwrap(),
                data: json!({"headword": format!("word {i}"), "updatedAt": 1}),
            })
            .collect()
    }

    fn committer(store: &Arc<MemoryDocumentStore>) -> BatchCommitter {
        BatchCommitter::new(store.clone(), &SyncConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn commits_in_chunks_of_500() {
        let store = Arc::new(MemoryDocumentStore::new());
        let report = committer(&store).commit(&ops(1_200)).await.unwrap();

        assert_eq!(report, CommitReport { chunks: 3, ops: 1_200 });
        assert_eq!(store.commit_attempts(), 3);
        assert_eq!(store.document_count().await, 1_200);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failure_with_fixed_delay() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.fail_next_commits(2).await;

        let started = Instant::now();
        committer(&store).commit(&ops(10)).await.unwrap();

        assert_eq!(store.commit_attempts(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
        assert_eq!(store.document_count().await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_exhausting_attempts_without_rollback() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.fail_commits_after(1).await;

        let error = committer(&store).commit(&ops(1_200)).await.unwrap_err();
        match error {
            SyncError::SyncFailed {
                chunk,
                attempts,
                committed_chunks,
                ..
            } => {
                assert_eq!(chunk, 1);
                assert_eq!(attempts, 3);
                assert_eq!(committed_chunks, 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        // chunk 0 once, chunk 1 three times, chunk 2 never
        assert_eq!(store.commit_attempts(), 4);
        assert_eq!(store.document_count().await, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn honors_configured_batch_size() {
        let store = Arc::new(MemoryDocumentStore::new());
        let config = SyncConfig {
            batch_size: 4,
            ..SyncConfig::default()
        };
        let report = BatchCommitter::new(store.clone(), &config)
            .commit(&ops(10))
            .await
            .unwrap();
        assert_eq!(report.chunks, 3);
    }

    #[tokio::test]
    async fn rejects_oversized_chunk() {
        let store = Arc::new(MemoryDocumentStore::new());
        let config = SyncConfig {
            batch_size: 2,
            ..SyncConfig::default()
        };
        let result = BatchCommitter::new(store.clone(), &config)
            .commit_chunk(0, &ops(3))
            .await;
        assert!(matches!(result, Err(SyncError::Local(_))));
        assert_eq!(store.commit_attempts(), 0);
    }

    #[tokio::test]
    async fn empty_commit_is_a_no_op() {
        let store = Arc::new(MemoryDocumentStore::new());
        let report = committer(&store).commit(&[]).await.unwrap();
        assert_eq!(report, CommitReport::default());
        assert_eq!(store.commit_attempts(), 0);
    }
}
