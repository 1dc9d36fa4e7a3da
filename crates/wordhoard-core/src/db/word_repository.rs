//! Word repository implementation

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::{Attribution, Meaning, MeaningId, Tag, TagId, Word, WordId};
use libsql::Connection;

/// Which scope a listing should cover.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeFilter {
    #[default]
    All,
    Private,
    Dictionary(String),
}

impl ScopeFilter {
    /// Filter matching rows of the given `dictionary_id` column value.
    pub fn for_dictionary(dictionary_id: Option<&str>) -> Self {
        dictionary_id.map_or(Self::Private, |id| Self::Dictionary(id.to_string()))
    }
}

/// Listing options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFilter {
    pub scope: ScopeFilter,
    pub tag: Option<String>,
    pub favorites_only: bool,
}

/// Id and sync flag of a stored word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredWordRef {
    pub id: WordId,
    pub synced: bool,
}

/// Trait for word storage operations (async)
#[allow(async_fn_in_trait)]
pub trait WordRepository {
    /// Get a word (with meanings and tags) by ID
    async fn get(&self, id: &WordId) -> Result<Option<Word>>;

    /// List words matching `filter`, most recently updated first
    async fn list(&self, filter: &WordFilter, limit: usize, offset: usize) -> Result<Vec<Word>>;

    /// All words with `synced = 0`, oldest update first
    async fn list_unsynced(&self) -> Result<Vec<Word>>;

    /// Ids of every word stored for the given scope column value
    async fn refs_in_scope(&self, dictionary_id: Option<&str>) -> Result<Vec<StoredWordRef>>;

    /// Insert or replace a word together with its meanings and tag links
    async fn upsert(&self, word: &Word) -> Result<()>;

    /// Hard-delete a word; returns whether a row existed
    async fn delete(&self, id: &WordId) -> Result<bool>;

    /// Set the sync flag on the given words
    async fn set_synced(&self, ids: &[WordId], synced: bool) -> Result<usize>;

    /// Mark pushed words synced unless they were edited after the push read them
    async fn mark_pushed(&self, pushed: &[(WordId, i64)]) -> Result<usize>;

    /// Flip every synced word to unsynced
    async fn mark_all_unsynced(&self) -> Result<usize>;

    /// Move words into another scope
    async fn reassign_dictionary(&self, ids: &[WordId], dictionary_id: Option<&str>)
        -> Result<usize>;

    /// Get all tags with word counts
    async fn list_tags(&self) -> Result<Vec<(Tag, usize)>>;
}

/// libSQL implementation of `WordRepository`
pub struct LibSqlWordRepository<'a> {
    conn: &'a Connection,
}

const SELECT_COLS: &str = "id, dictionary_id, headword, part_of_speech, phonetic, difficulty, \
     language, is_favorite, created_at, updated_at, synced, likes, difficulties, \
     added_by_email, added_by_display_name, added_at";

impl<'a> LibSqlWordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get or create a tag by name, returning its id
    async fn get_or_create_tag(conn: &Connection, name: &str, now: i64) -> Result<TagId> {
        let mut rows = conn
            .query("SELECT id FROM tags WHERE name = ? COLLATE NOCASE", [name])
            .await?;

        if let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            return id
                .parse()
                .map_err(|_| Error::InvalidInput("Invalid tag ID".into()));
        }

        let tag = Tag::new(name, now);
        conn.execute(
            "INSERT INTO tags (id, name, color, created_at) VALUES (?, ?, ?, ?)",
            libsql::params![tag.id.as_str(), tag.name, tag.color, tag.created_at],
        )
        .await?;

        Ok(tag.id)
    }

    /// Parse the scalar columns of a word row (meanings/tags loaded separately)
    fn parse_word(row: &libsql::Row) -> Result<Word> {
        let id: String = row.get(0)?;
        let likes: String = row.get(11)?;
        let difficulties: String = row.get(12)?;
        let added_by_email: Option<String> = row.get(13)?;
        let attribution = match added_by_email {
            Some(email) => Some(Attribution {
                added_by_email: email,
                added_by_display_name: row.get(14)?,
                added_at: row.get::<Option<i64>>(15)?.unwrap_or_default(),
            }),
            None => None,
        };

        Ok(Word {
            id: id.parse()?,
            dictionary_id: row.get(1)?,
            headword: row.get(2)?,
            meanings: Vec::new(),
            part_of_speech: row.get(3)?,
            phonetic: row.get(4)?,
            tags: BTreeSet::new(),
            difficulty: row.get(5)?,
            language: row.get(6)?,
            is_favorite: row.get::<i32>(7)? != 0,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
            synced: row.get::<i32>(10)? != 0,
            likes: serde_json::from_str(&likes)?,
            difficulties: serde_json::from_str(&difficulties)?,
            attribution,
        })
    }

    async fn load_meanings(&self, word_id: &WordId) -> Result<Vec<Meaning>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, definition, examples, position, timestamp
                 FROM meanings WHERE word_id = ? ORDER BY position ASC",
                [word_id.as_str()],
            )
            .await?;

        let mut meanings = Vec::new();
        while let Some(row) = rows.next().await? {
            let examples: String = row.get(2)?;
            meanings.push(Meaning {
                id: MeaningId::from_raw(row.get::<String>(0)?),
                definition: row.get(1)?,
                examples: serde_json::from_str(&examples)?,
                order: row.get(3)?,
                timestamp: row.get(4)?,
            });
        }
        Ok(meanings)
    }

    async fn load_tags(&self, word_id: &WordId) -> Result<BTreeSet<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT t.name FROM tags t
                 JOIN word_tags wt ON wt.tag_id = t.id
                 WHERE wt.word_id = ?",
                [word_id.as_str()],
            )
            .await?;

        let mut tags = BTreeSet::new();
        while let Some(row) = rows.next().await? {
            tags.insert(row.get::<String>(0)?);
        }
        Ok(tags)
    }

    /// Run a word query and hydrate every row
    async fn query_words(&self, sql: &str, params: libsql::params::Params) -> Result<Vec<Word>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut words = Vec::new();
        while let Some(row) = rows.next().await? {
            words.push(Self::parse_word(&row)?);
        }
        drop(rows);

        for word in &mut words {
            word.meanings = self.load_meanings(&word.id).await?;
            word.tags = self.load_tags(&word.id).await?;
        }
        Ok(words)
    }

    async fn update_many(
        &self,
        sql: &str,
        ids: &[WordId],
        extra: Option<libsql::Value>,
    ) -> Result<usize> {
        let mut changed = 0usize;
        for id in ids {
            let rows = match &extra {
                Some(value) => {
                    self.conn
                        .execute(sql, libsql::params![value.clone(), id.as_str()])
                        .await?
                }
                None => self.conn.execute(sql, [id.as_str()]).await?,
            };
            changed += usize::try_from(rows).unwrap_or_default();
        }
        Ok(changed)
    }
}

impl WordRepository for LibSqlWordRepository<'_> {
    async fn get(&self, id: &WordId) -> Result<Option<Word>> {
        let sql = format!("SELECT {SELECT_COLS} FROM words WHERE id = ?");
        let mut words = self
            .query_words(
                &sql,
                libsql::params::Params::Positional(vec![id.as_str().into()]),
            )
            .await?;
        Ok(words.pop())
    }

    async fn list(&self, filter: &WordFilter, limit: usize, offset: usize) -> Result<Vec<Word>> {
        let mut clauses = Vec::new();
        let mut values: Vec<libsql::Value> = Vec::new();

        match &filter.scope {
            ScopeFilter::All => {}
            ScopeFilter::Private => clauses.push("w.dictionary_id IS NULL".to_string()),
            ScopeFilter::Dictionary(id) => {
                clauses.push("w.dictionary_id = ?".to_string());
                values.push(id.clone().into());
            }
        }
        if let Some(tag) = &filter.tag {
            clauses.push(
                "EXISTS (SELECT 1 FROM word_tags wt JOIN tags t ON t.id = wt.tag_id
                 WHERE wt.word_id = w.id AND t.name = ? COLLATE NOCASE)"
                    .to_string(),
            );
            values.push(tag.clone().into());
        }
        if filter.favorites_only {
            clauses.push("w.is_favorite = 1".to_string());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let columns = SELECT_COLS
            .split(", ")
            .map(|column| format!("w.{}", column.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM words w {where_clause}
             ORDER BY w.updated_at DESC LIMIT ? OFFSET ?"
        );
        // a negative LIMIT means no limit in SQLite
        values.push(i64::try_from(limit).unwrap_or(-1).into());
        values.push(i64::try_from(offset).unwrap_or(i64::MAX).into());

        self.query_words(&sql, libsql::params::Params::Positional(values))
            .await
    }

    async fn list_unsynced(&self) -> Result<Vec<Word>> {
        let sql =
            format!("SELECT {SELECT_COLS} FROM words WHERE synced = 0 ORDER BY updated_at ASC");
        self.query_words(&sql, libsql::params::Params::None).await
    }

    async fn refs_in_scope(&self, dictionary_id: Option<&str>) -> Result<Vec<StoredWordRef>> {
        let mut rows = match dictionary_id {
            Some(id) => {
                self.conn
                    .query(
                        "SELECT id, synced FROM words WHERE dictionary_id = ?",
                        [id],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query("SELECT id, synced FROM words WHERE dictionary_id IS NULL", ())
                    .await?
            }
        };

        let mut refs = Vec::new();
        while let Some(row) = rows.next().await? {
            refs.push(StoredWordRef {
                id: row.get::<String>(0)?.parse()?,
                synced: row.get::<i32>(1)? != 0,
            });
        }
        Ok(refs)
    }

    async fn upsert(&self, word: &Word) -> Result<()> {
        let likes = serde_json::to_string(&word.likes)?;
        let difficulties = serde_json::to_string(&word.difficulties)?;
        let (added_by_email, added_by_display_name, added_at) = match &word.attribution {
            Some(attribution) => (
                Some(attribution.added_by_email.clone()),
                attribution.added_by_display_name.clone(),
                Some(attribution.added_at),
            ),
            None => (None, None, None),
        };

        let tx = self.conn.transaction().await?;

        tx.execute(
            "INSERT INTO words (id, dictionary_id, headword, part_of_speech, phonetic, difficulty,
                 language, is_favorite, created_at, updated_at, synced, likes, difficulties,
                 added_by_email, added_by_display_name, added_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 dictionary_id = excluded.dictionary_id,
                 headword = excluded.headword,
                 part_of_speech = excluded.part_of_speech,
                 phonetic = excluded.phonetic,
                 difficulty = excluded.difficulty,
                 language = excluded.language,
                 is_favorite = excluded.is_favorite,
                 updated_at = excluded.updated_at,
                 synced = excluded.synced,
                 likes = excluded.likes,
                 difficulties = excluded.difficulties,
                 added_by_email = excluded.added_by_email,
                 added_by_display_name = excluded.added_by_display_name,
                 added_at = excluded.added_at",
            libsql::params![
                word.id.as_str(),
                word.dictionary_id.clone(),
                word.headword.as_str(),
                word.part_of_speech.as_str(),
                word.phonetic.clone(),
                word.difficulty,
                word.language.as_str(),
                i32::from(word.is_favorite),
                word.created_at,
                word.updated_at,
                i32::from(word.synced),
                likes,
                difficulties,
                added_by_email,
                added_by_display_name,
                added_at
            ],
        )
        .await?;

        tx.execute("DELETE FROM meanings WHERE word_id = ?", [word.id.as_str()])
            .await?;
        for meaning in &word.meanings {
            tx.execute(
                "INSERT INTO meanings (id, word_id, definition, examples, position, timestamp)
                 VALUES (?, ?, ?, ?, ?, ?)",
                libsql::params![
                    meaning.id.as_str(),
                    word.id.as_str(),
                    meaning.definition.as_str(),
                    serde_json::to_string(&meaning.examples)?,
                    meaning.order,
                    meaning.timestamp
                ],
            )
            .await?;
        }

        tx.execute("DELETE FROM word_tags WHERE word_id = ?", [word.id.as_str()])
            .await?;
        for tag_name in &word.tags {
            let tag_id = Self::get_or_create_tag(&tx, tag_name, word.updated_at).await?;
            tx.execute(
                "INSERT OR IGNORE INTO word_tags (word_id, tag_id) VALUES (?, ?)",
                libsql::params![word.id.as_str(), tag_id.as_str()],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &WordId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM words WHERE id = ?", [id.as_str()])
            .await?;
        Ok(rows > 0)
    }

    async fn set_synced(&self, ids: &[WordId], synced: bool) -> Result<usize> {
        self.update_many(
            "UPDATE words SET synced = ? WHERE id = ?",
            ids,
            Some(i32::from(synced).into()),
        )
        .await
    }

    async fn mark_pushed(&self, pushed: &[(WordId, i64)]) -> Result<usize> {
        let mut changed = 0usize;
        for (id, updated_at) in pushed {
            let rows = self
                .conn
                .execute(
                    "UPDATE words SET synced = 1 WHERE id = ? AND updated_at = ?",
                    libsql::params![id.as_str(), *updated_at],
                )
                .await?;
            changed += usize::try_from(rows).unwrap_or_default();
        }
        Ok(changed)
    }

    async fn mark_all_unsynced(&self) -> Result<usize> {
        let rows = self
            .conn
            .execute("UPDATE words SET synced = 0 WHERE synced = 1", ())
            .await?;
        Ok(usize::try_from(rows).unwrap_or_default())
    }

    async fn reassign_dictionary(
        &self,
        ids: &[WordId],
        dictionary_id: Option<&str>,
    ) -> Result<usize> {
        match dictionary_id {
            Some(dictionary_id) => {
                self.update_many(
                    "UPDATE words SET dictionary_id = ? WHERE id = ?",
                    ids,
                    Some(dictionary_id.to_string().into()),
                )
                .await
            }
            None => {
                self.update_many("UPDATE words SET dictionary_id = NULL WHERE id = ?", ids, None)
                    .await
            }
        }
    }

    async fn list_tags(&self) -> Result<Vec<(Tag, usize)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT t.id, t.name, t.color, t.created_at, COUNT(wt.word_id) as count
                 FROM tags t
                 LEFT JOIN word_tags wt ON t.id = wt.tag_id
                 GROUP BY t.id
                 HAVING count > 0
                 ORDER BY count DESC, t.name ASC",
                (),
            )
            .await?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let tag = Tag {
                id: id
                    .parse()
                    .map_err(|_| Error::InvalidInput("Invalid tag ID".into()))?,
                name: row.get(1)?,
                color: row.get(2)?,
                created_at: row.get(3)?,
            };
            let count = usize::try_from(row.get::<i64>(4)?).unwrap_or_default();
            tags.push((tag, count));
        }
        Ok(tags)
    }
}
