//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }
    if version < 2 {
        migrate_v2(conn).await?;
    }
    if version < 3 {
        migrate_v3(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Execute `statements` in one transaction, rolling back on the first failure.
async fn apply(conn: &Connection, version: i32, statements: &[&str]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn
        .execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: words, meanings, tags
async fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS words (
                id TEXT PRIMARY KEY,
                dictionary_id TEXT,
                headword TEXT NOT NULL,
                part_of_speech TEXT NOT NULL DEFAULT '',
                phonetic TEXT,
                difficulty INTEGER NOT NULL DEFAULT 0,
                language TEXT NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0,
                likes TEXT NOT NULL DEFAULT '{}',
                difficulties TEXT NOT NULL DEFAULT '{}',
                added_by_email TEXT,
                added_by_display_name TEXT,
                added_at INTEGER
            )",
            "CREATE INDEX IF NOT EXISTS idx_words_dictionary ON words(dictionary_id)",
            "CREATE INDEX IF NOT EXISTS idx_words_synced ON words(synced)",
            "CREATE INDEX IF NOT EXISTS idx_words_updated ON words(updated_at DESC)",
            "CREATE TABLE IF NOT EXISTS meanings (
                id TEXT NOT NULL,
                word_id TEXT NOT NULL REFERENCES words(id) ON DELETE CASCADE,
                definition TEXT NOT NULL,
                examples TEXT NOT NULL DEFAULT '[]',
                position INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                PRIMARY KEY (word_id, id)
            )",
            "CREATE TABLE IF NOT EXISTS tags (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                color TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS word_tags (
                word_id TEXT NOT NULL REFERENCES words(id) ON DELETE CASCADE,
                tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (word_id, tag_id)
            )",
            "CREATE INDEX IF NOT EXISTS idx_word_tags_tag ON word_tags(tag_id)",
        ],
    )
    .await
}

/// Migration to version 2: sync bookkeeping (delete outbox, conflict log)
async fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        2,
        &[
            "CREATE TABLE IF NOT EXISTS pending_deletions (
                word_id TEXT PRIMARY KEY,
                dictionary_id TEXT,
                deleted_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sync_conflicts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word_id TEXT NOT NULL,
                scope TEXT NOT NULL,
                local_updated_at INTEGER NOT NULL,
                incoming_updated_at INTEGER NOT NULL,
                resolved_at INTEGER NOT NULL,
                strategy TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_word_id ON sync_conflicts(word_id)",
            "CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC)",
        ],
    )
    .await
}

/// Migration to version 3: shared dictionary cache and local settings
async fn migrate_v3(conn: &Connection) -> Result<()> {
    apply(
        conn,
        CURRENT_VERSION,
        &[
            "CREATE TABLE IF NOT EXISTS dictionaries (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                owner TEXT NOT NULL,
                collaborators TEXT NOT NULL DEFAULT '{}',
                created_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        ],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?
                )",
                [name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_all_tables_created() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for table in [
            "words",
            "meanings",
            "tags",
            "word_tags",
            "pending_deletions",
            "sync_conflicts",
            "dictionaries",
            "settings",
        ] {
            assert!(table_exists(&conn, table).await, "missing table {table}");
        }
    }
}
