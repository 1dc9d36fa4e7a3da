use std::io;

use thiserror::Error;
use wordhoard_core::remote::RemoteError;
use wordhoard_core::sync::SyncError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] wordhoard_core::Error),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Word ID cannot be empty")]
    EmptyWordId,
    #[error("Word not found for id/prefix: {0}")]
    WordNotFound(String),
    #[error("{0}")]
    AmbiguousWordId(String),
    #[error("Word {0} is not in a shared dictionary")]
    NotShared(String),
    #[error("Meaning numbers start at 1")]
    InvalidMeaningNumber,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Profile '{0}' has no identity. Run `wordhoard auth login --profile {0}` first.")]
    NotLoggedIn(String),
}
