//! Signed-in user and sync entitlement

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::error::{SyncError, SyncResult};
use crate::models::Scope;

/// The signed-in user, as provided by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// This user's private dictionary scope.
    pub fn private_scope(&self) -> Scope {
        Scope::private(self.user_id.clone())
    }
}

/// Reject user ids that cannot address `users/{userId}` safely.
pub fn validate_user_id(user_id: &str) -> SyncResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() || trimmed != user_id || trimmed.contains('/') {
        return Err(SyncError::InvalidUserId(user_id.to_string()));
    }
    Ok(trimmed)
}

/// Gate every networked operation: user id first, then the entitlement.
pub fn authorize<'a>(entitlement: &dyn SyncEntitlement, user_id: &'a str) -> SyncResult<&'a str> {
    let user_id = validate_user_id(user_id)?;
    if !entitlement.can_sync() {
        return Err(SyncError::SubscriptionRequired);
    }
    Ok(user_id)
}

/// Whether the current user may use cloud sync.
pub trait SyncEntitlement: Send + Sync {
    fn can_sync(&self) -> bool;
}

/// Entitlement decided by a flag (profile setting, tests).
#[derive(Debug, Default)]
pub struct StaticEntitlement {
    allowed: AtomicBool,
}

impl StaticEntitlement {
    pub const fn new(allowed: bool) -> Self {
        Self {
            allowed: AtomicBool::new(allowed),
        }
    }

    pub fn set(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::SeqCst);
    }
}

impl SyncEntitlement for StaticEntitlement {
    fn can_sync(&self) -> bool {
        self.allowed.load(Ordering::SeqCst)
    }
}
