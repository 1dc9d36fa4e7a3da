//! Sync conflict model

use serde::{Deserialize, Serialize};

/// Strategy label recorded when a stale remote version is rejected.
pub const STRATEGY_LOCAL_NEWER: &str = "local_newer";

/// Remote version rejected by the merge resolver because the local row was newer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Word involved in the conflict
    pub word_id: String,
    /// Scope label (`private:<uid>` / `shared:<id>`)
    pub scope: String,
    /// Local row's timestamp when the conflict occurred
    pub local_updated_at: i64,
    /// Incoming document's timestamp that was rejected
    pub incoming_updated_at: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Resolution strategy name
    pub strategy: String,
}
