//! Errors surfaced by sync, sharing and listener operations

use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Empty or path-unsafe user id; no remote call was made
    #[error("Invalid user id: {0:?}")]
    InvalidUserId(String),

    /// The operation needs a signed-in user
    #[error("Not signed in")]
    NotSignedIn,

    /// The entitlement check refused sync; no remote call was made
    #[error("Sync requires an active subscription")]
    SubscriptionRequired,

    /// A chunk still failed after exhausting its attempts
    #[error(
        "Sync failed on chunk {chunk} after {attempts} attempt(s) \
         ({committed_chunks} chunk(s) committed): {source}"
    )]
    SyncFailed {
        /// Zero-based index of the failing chunk
        chunk: usize,
        attempts: u32,
        /// Chunks committed before the failure; they are not rolled back
        committed_chunks: usize,
        source: RemoteError,
    },

    /// Transport-level failure outside a batch commit
    #[error("Network error: {0}")]
    Network(#[from] RemoteError),

    /// Private-to-shared promotion did not complete; local rows are untouched
    #[error("Conversion to shared dictionary failed: {0}")]
    ConversionFailed(String),

    /// The user's role does not allow the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Local store failure
    #[error(transparent)]
    Local(#[from] crate::Error),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Whether retrying later could succeed without user action.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SyncFailed { .. } | Self::Network(_))
    }
}
