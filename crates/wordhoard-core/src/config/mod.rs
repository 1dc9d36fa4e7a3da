//! Sync tuning configuration.
//!
//! Provides `SyncConfig`, shared by the core services and the CLI profile file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-commit operation ceiling of the remote store.
pub const MAX_BATCH_SIZE: usize = 500;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Batch and listener behavior of the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SyncConfig {
    /// Operations per remote commit (1..=500)
    pub batch_size: usize,
    /// Attempts per chunk, the first one included
    pub max_attempts: u32,
    /// Fixed delay between attempts on the same chunk
    pub retry_delay_ms: u64,
    /// Delete local rows of a shared dictionary that vanish from its snapshot
    pub infer_shared_deletions: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            infer_shared_deletions: false,
        }
    }
}

impl SyncConfig {
    /// Parse a JSON config document and validate it.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid sync config JSON: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(Error::Config(format!(
                "batch_size must be between 1 and {MAX_BATCH_SIZE} (got {})",
                self.batch_size
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }
        if self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(Error::Config(format!(
                "retry_delay_ms must not exceed {MAX_RETRY_DELAY_MS} (got {})",
                self.retry_delay_ms
            )));
        }
        Ok(())
    }

    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Apply the set fields of `overrides` on top of this config.
    #[must_use]
    pub fn with_overrides(&self, overrides: &SyncConfigOverrides) -> Self {
        Self {
            batch_size: overrides.batch_size.unwrap_or(self.batch_size),
            max_attempts: overrides.max_attempts.unwrap_or(self.max_attempts),
            retry_delay_ms: overrides.retry_delay_ms.unwrap_or(self.retry_delay_ms),
            infer_shared_deletions: overrides
                .infer_shared_deletions
                .unwrap_or(self.infer_shared_deletions),
        }
    }
}

/// Optional per-profile adjustments to [`SyncConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infer_shared_deletions: Option<bool>,
}

impl SyncConfigOverrides {
    pub const fn is_empty(&self) -> bool {
        self.batch_size.is_none()
            && self.max_attempts.is_none()
            && self.retry_delay_ms.is_none()
            && self.infer_shared_deletions.is_none()
    }
}
