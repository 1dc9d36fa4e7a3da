//! Cloud document store abstraction
//!
//! Words live in nested document collections (`users/{uid}/words`,
//! `dictionaries/{id}/words`). A [`RemoteStore`] commits atomic write batches,
//! fetches collections and streams full collection snapshots.

pub mod codec;
mod memory;
mod path;
mod write;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryDocumentStore;
pub use path::{DocPath, FieldPath};
pub use write::{apply_field, WriteOp};

/// Errors reported by a remote document store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport-level failure (offline, timeout, rejected commit)
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// Malformed document or collection path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Operation not valid for the target (e.g. subscribing to a document)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Backing storage could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub data: Value,
}

impl Document {
    /// Document id (last path segment)
    pub fn id(&self) -> &str {
        self.path.id()
    }
}

/// Full contents of a collection at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: DocPath,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Live stream of collection snapshots.
///
/// The first item is the collection's current state; each later item is the
/// full collection after a change. Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<RemoteResult<Snapshot>>,
}

impl Subscription {
    pub const fn new(receiver: mpsc::UnboundedReceiver<RemoteResult<Snapshot>>) -> Self {
        Self { receiver }
    }

    /// Next snapshot or stream error; `None` once the store closed the stream.
    pub async fn next(&mut self) -> Option<RemoteResult<Snapshot>> {
        self.receiver.recv().await
    }
}

/// Cloud document database.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Apply every op atomically: all succeed or none is visible.
    async fn commit(&self, ops: &[WriteOp]) -> RemoteResult<()>;

    /// All documents directly inside `collection`.
    async fn fetch_collection(&self, collection: &DocPath) -> RemoteResult<Vec<Document>>;

    async fn get_document(&self, path: &DocPath) -> RemoteResult<Option<Document>>;

    /// Stream snapshots of `collection`.
    async fn subscribe(&self, collection: &DocPath) -> RemoteResult<Subscription>;
}
