//! Data models for Wordhoard

mod meaning;
mod scope;
mod sync_conflict;
mod tag;
mod word;

pub use meaning::{Meaning, MeaningId};
pub use scope::{Collaborator, Role, Scope, SharedDictionary};
pub use sync_conflict::{SyncConflict, STRATEGY_LOCAL_NEWER};
pub use tag::{normalize_tag_name, Tag, TagId, DEFAULT_TAG_COLOR};
pub use word::{Attribution, Word, WordDraft, WordId};
