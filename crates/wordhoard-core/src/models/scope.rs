//! Dictionary scopes and shared-dictionary metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A logical word collection: the user's private dictionary or one shared dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Private { user_id: String },
    Shared { dictionary_id: String },
}

impl Scope {
    pub fn private(user_id: impl Into<String>) -> Self {
        Self::Private {
            user_id: user_id.into(),
        }
    }

    pub fn shared(dictionary_id: impl Into<String>) -> Self {
        Self::Shared {
            dictionary_id: dictionary_id.into(),
        }
    }

    /// Local `dictionary_id` column value for rows of this scope.
    #[must_use]
    pub fn dictionary_id(&self) -> Option<&str> {
        match self {
            Self::Private { .. } => None,
            Self::Shared { dictionary_id } => Some(dictionary_id),
        }
    }

    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Shared { .. })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private { user_id } => write!(f, "private:{user_id}"),
            Self::Shared { dictionary_id } => write!(f, "shared:{dictionary_id}"),
        }
    }
}

/// Access level of a collaborator in a shared dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    /// Whether this role may change words in the dictionary.
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Owner | Self::Editor)
    }

    /// Whether this role may add or remove collaborators.
    pub const fn can_manage(self) -> bool {
        matches!(self, Self::Owner)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            other => Err(Error::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// Metadata of a shared dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDictionary {
    pub id: String,
    pub name: String,
    /// User id of the owner
    pub owner: String,
    /// Role of every member keyed by user id, owner included
    pub collaborators: BTreeMap<String, Role>,
    /// Unix ms
    pub created_at: i64,
}

impl SharedDictionary {
    /// Role of `user_id`, if they are a member.
    #[must_use]
    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        if self.owner == user_id {
            return Some(Role::Owner);
        }
        self.collaborators.get(user_id).copied()
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope::shared(self.id.clone())
    }
}

/// A member record stored under `dictionaries/{id}/collaborators/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    /// Unix ms
    pub added_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_display_and_dictionary_id() {
        let private = Scope::private("u1");
        let shared = Scope::shared("d1");
        assert_eq!(private.to_string(), "private:u1");
        assert_eq!(shared.to_string(), "shared:d1");
        assert_eq!(private.dictionary_id(), None);
        assert_eq!(shared.dictionary_id(), Some("d1"));
    }

    #[test]
    fn role_permissions() {
        assert!(Role::Owner.can_write());
        assert!(Role::Editor.can_write());
        assert!(!Role::Viewer.can_write());
        assert!(Role::Owner.can_manage());
        assert!(!Role::Editor.can_manage());
        assert_eq!("Editor".parse::<Role>().unwrap(), Role::Editor);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn owner_role_wins_over_map() {
        let dictionary = SharedDictionary {
            id: "d1".into(),
            name: "Spanish".into(),
            owner: "u1".into(),
            collaborators: BTreeMap::from([("u2".to_string(), Role::Viewer)]),
            created_at: 0,
        };
        assert_eq!(dictionary.role_of("u1"), Some(Role::Owner));
        assert_eq!(dictionary.role_of("u2"), Some(Role::Viewer));
        assert_eq!(dictionary.role_of("u3"), None);
    }
}
