//! Local cache of shared dictionary metadata

use crate::error::Result;
use crate::models::SharedDictionary;
use libsql::Connection;

/// Trait for the shared dictionary cache (async)
#[allow(async_fn_in_trait)]
pub trait DictionaryRepository {
    /// Insert or refresh a dictionary
    async fn save(&self, dictionary: &SharedDictionary) -> Result<()>;

    /// Get one cached dictionary
    async fn get(&self, id: &str) -> Result<Option<SharedDictionary>>;

    /// All cached dictionaries ordered by name
    async fn list(&self) -> Result<Vec<SharedDictionary>>;

    /// Replace the whole cache with `dictionaries`
    async fn replace_all(&self, dictionaries: &[SharedDictionary]) -> Result<()>;
}

/// libSQL implementation of `DictionaryRepository`
pub struct LibSqlDictionaryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDictionaryRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_dictionary(row: &libsql::Row) -> Result<SharedDictionary> {
        let collaborators: String = row.get(3)?;
        Ok(SharedDictionary {
            id: row.get(0)?,
            name: row.get(1)?,
            owner: row.get(2)?,
            collaborators: serde_json::from_str(&collaborators)?,
            created_at: row.get(4)?,
        })
    }

    async fn insert(conn: &Connection, dictionary: &SharedDictionary) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO dictionaries (id, name, owner, collaborators, created_at)
             VALUES (?, ?, ?, ?, ?)",
            libsql::params![
                dictionary.id.as_str(),
                dictionary.name.as_str(),
                dictionary.owner.as_str(),
                serde_json::to_string(&dictionary.collaborators)?,
                dictionary.created_at
            ],
        )
        .await?;
        Ok(())
    }
}

impl DictionaryRepository for LibSqlDictionaryRepository<'_> {
    async fn save(&self, dictionary: &SharedDictionary) -> Result<()> {
        Self::insert(self.conn, dictionary).await
    }

    async fn get(&self, id: &str) -> Result<Option<SharedDictionary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, owner, collaborators, created_at
                 FROM dictionaries WHERE id = ?",
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_dictionary(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<SharedDictionary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, owner, collaborators, created_at
                 FROM dictionaries ORDER BY name COLLATE NOCASE ASC",
                (),
            )
            .await?;

        let mut dictionaries = Vec::new();
        while let Some(row) = rows.next().await? {
            dictionaries.push(Self::parse_dictionary(&row)?);
        }
        Ok(dictionaries)
    }

    async fn replace_all(&self, dictionaries: &[SharedDictionary]) -> Result<()> {
        let tx = self.conn.transaction().await?;
        tx.execute("DELETE FROM dictionaries", ()).await?;
        for dictionary in dictionaries {
            Self::insert(&tx, dictionary).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
