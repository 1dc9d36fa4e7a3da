//! Settings repository implementation

use crate::error::Result;
use libsql::Connection;

/// Settings key holding the user id of the last signed-in account
pub const LAST_SIGNED_IN_USER: &str = "last_signed_in_user";

/// Trait for local key/value settings (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Read a setting, `None` when it was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write or overwrite a setting
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a setting
    async fn remove(&self, key: &str) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", [key])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_setting_is_none() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        assert_eq!(repo.get(LAST_SIGNED_IN_USER).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_overwrite_and_remove() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        repo.set(LAST_SIGNED_IN_USER, "alice").await.unwrap();
        repo.set(LAST_SIGNED_IN_USER, "bob").await.unwrap();
        assert_eq!(
            repo.get(LAST_SIGNED_IN_USER).await.unwrap().as_deref(),
            Some("bob")
        );

        repo.remove(LAST_SIGNED_IN_USER).await.unwrap();
        assert_eq!(repo.get(LAST_SIGNED_IN_USER).await.unwrap(), None);
    }
}
