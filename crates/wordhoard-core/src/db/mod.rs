//! Database layer for Wordhoard

mod connection;
mod dictionary_repository;
mod migrations;
mod settings_repository;
mod sync_repository;
mod word_repository;

pub use connection::Database;
pub use dictionary_repository::{DictionaryRepository, LibSqlDictionaryRepository};
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository, LAST_SIGNED_IN_USER};
pub use sync_repository::{LibSqlSyncRepository, PendingDeletion, SyncRepository};
pub use word_repository::{
    LibSqlWordRepository, ScopeFilter, StoredWordRef, WordFilter, WordRepository,
};
