use std::env;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use wordhoard_core::db::{ScopeFilter, WordFilter};
use wordhoard_core::models::{SharedDictionary, SyncConflict};
use wordhoard_core::remote::MemoryDocumentStore;
use wordhoard_core::services::{LocalStore, WordService};
use wordhoard_core::sync::{Identity, SharingService, StaticEntitlement, SyncEngine, SystemClock};
use wordhoard_core::{Word, WordId};

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub const DB_PATH_ENV: &str = "WORDHOARD_DB_PATH";

#[derive(Debug, Serialize)]
pub struct WordListItem {
    pub id: String,
    pub headword: String,
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_id: Option<String>,
    pub difficulty: i32,
    pub is_favorite: bool,
    pub synced: bool,
    pub likes: usize,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub word_id: String,
    pub scope: String,
    pub local_updated_at: i64,
    pub incoming_updated_at: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

#[derive(Debug, Serialize)]
pub struct DictionaryItem {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub role: Option<String>,
    pub members: usize,
    pub created_at: i64,
}

/// Profile selected for this invocation.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub name: String,
    pub profile: CliProfile,
}

impl ProfileContext {
    pub fn load(explicit: Option<&str>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        Ok(Self::from_config(&config, explicit))
    }

    pub fn from_config(config: &CliProfilesConfig, explicit: Option<&str>) -> Self {
        let name = config.resolve_profile_name(explicit);
        let profile = config.profile(&name).cloned().unwrap_or_default();
        Self { name, profile }
    }

    pub fn identity(&self) -> Result<Identity, CliError> {
        self.profile
            .identity()
            .ok_or_else(|| CliError::NotLoggedIn(self.name.clone()))
    }
}

/// Everything a sync command needs, wired against the profile's remote file.
pub struct Connection {
    pub identity: Identity,
    pub remote: Arc<MemoryDocumentStore>,
    pub engine: SyncEngine,
}

impl Connection {
    pub fn sharing(&self) -> SharingService {
        SharingService::for_engine(&self.engine)
    }
}

pub async fn connect(db_path: &Path, context: &ProfileContext) -> Result<Connection, CliError> {
    let identity = context.identity()?;
    let config = context.profile.sync_config().map_err(CliError::Config)?;
    let remote_path = context.profile.remote_path().map_err(CliError::Config)?;
    if let Some(parent) = remote_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = open_store(db_path).await?;
    let remote = Arc::new(MemoryDocumentStore::open(&remote_path)?);
    let engine = SyncEngine::new(
        store,
        remote.clone(),
        Arc::new(StaticEntitlement::new(context.profile.can_sync)),
        Arc::new(SystemClock),
        &config,
    );
    tracing::debug!(
        profile = %context.name,
        remote = %remote_path.display(),
        "Connected to remote store"
    );

    Ok(Connection {
        identity,
        remote,
        engine,
    })
}

pub async fn open_store(db_path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(db_path).await?)
}

pub async fn open_word_service(db_path: &Path) -> Result<WordService, CliError> {
    let store = open_store(db_path).await?;
    Ok(WordService::new(store, Arc::new(SystemClock)))
}

pub async fn list_words(
    store: &LocalStore,
    filter: &WordFilter,
    limit: usize,
) -> Result<Vec<Word>, CliError> {
    Ok(store.list_words(filter, limit, 0).await?)
}

pub async fn list_all_words(store: &LocalStore) -> Result<Vec<Word>, CliError> {
    list_words(store, &WordFilter::default(), usize::MAX).await
}

pub fn scope_filter(dict: Option<&str>, private_only: bool) -> ScopeFilter {
    match dict {
        Some(id) => ScopeFilter::Dictionary(id.to_string()),
        None if private_only => ScopeFilter::Private,
        None => ScopeFilter::All,
    }
}

pub fn normalize_word_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyWordId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Find a word by full id or by a unique id prefix.
pub async fn resolve_word(query: &str, store: &LocalStore) -> Result<Word, CliError> {
    let query = normalize_word_identifier(query)?;
    if let Ok(word_id) = query.parse::<WordId>() {
        if let Some(word) = store.get_word(&word_id).await? {
            return Ok(word);
        }
    }

    let mut matching = list_all_words(store)
        .await?
        .into_iter()
        .filter(|word| word.id.as_str().starts_with(&query))
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::WordNotFound(query)),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|word| short_id(&word.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousWordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Convert a 1-based meaning number from the command line.
pub fn meaning_index(number: usize) -> Result<usize, CliError> {
    number.checked_sub(1).ok_or(CliError::InvalidMeaningNumber)
}

pub fn short_id(id: &WordId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_word_lines(words: &[Word]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    words
        .iter()
        .map(|word| {
            let short_id = short_id(&word.id);
            let marker = word_marker(word);
            let headword = truncate(&word.headword, 20);
            let definition = truncate(word.primary_definition().unwrap_or(""), 40);
            let relative_time = format_relative_time(word.updated_at, now_ms);
            let tags = render_tags(word);

            if tags.is_empty() {
                format!("{short_id:<13} {marker} {headword:<20}  {definition:<40}  {relative_time}")
            } else {
                format!(
                    "{short_id:<13} {marker} {headword:<20}  {definition:<40}  {relative_time:<10}  {tags}"
                )
            }
        })
        .collect()
}

/// `*` favorite, `~` not yet synced, `+` both.
fn word_marker(word: &Word) -> char {
    match (word.is_favorite, word.synced) {
        (true, false) => '+',
        (true, true) => '*',
        (false, false) => '~',
        (false, true) => ' ',
    }
}

pub fn format_word_detail(word: &Word, viewer_email: Option<&str>) -> String {
    let mut output = String::new();
    let _ = write!(output, "{}", word.headword);
    if let Some(phonetic) = &word.phonetic {
        let _ = write!(output, " {phonetic}");
    }
    if !word.part_of_speech.is_empty() {
        let _ = write!(output, " ({})", word.part_of_speech);
    }
    output.push('\n');

    let _ = writeln!(output, "id: {}", word.id);
    let _ = writeln!(output, "language: {}", word.language);
    match &word.dictionary_id {
        Some(dictionary_id) => {
            let score = viewer_email
                .and_then(|email| word.difficulties.get(email).copied())
                .unwrap_or_default();
            let _ = writeln!(output, "dictionary: {dictionary_id}");
            let _ = writeln!(output, "difficulty: {score} (yours)");
            let _ = writeln!(output, "likes: {}", word.like_count());
            if let Some(attribution) = &word.attribution {
                let by = attribution
                    .added_by_display_name
                    .as_deref()
                    .unwrap_or(&attribution.added_by_email);
                let _ = writeln!(
                    output,
                    "added by: {by} on {}",
                    format_sync_timestamp(attribution.added_at)
                );
            }
        }
        None => {
            let _ = writeln!(output, "difficulty: {}", word.difficulty);
        }
    }
    if word.is_favorite {
        let _ = writeln!(output, "favorite: yes");
    }
    let tags = render_tags(word);
    if !tags.is_empty() {
        let _ = writeln!(output, "tags: {tags}");
    }
    let _ = writeln!(
        output,
        "updated: {}{}",
        format_sync_timestamp(word.updated_at),
        if word.synced { "" } else { " (not synced)" }
    );

    let mut meanings: Vec<_> = word.meanings.iter().collect();
    meanings.sort_by_key(|meaning| meaning.order);
    for (number, meaning) in meanings.iter().enumerate() {
        let _ = writeln!(output, "\n{}. {}", number + 1, meaning.definition);
        for example in &meaning.examples {
            let _ = writeln!(output, "   - {example}");
        }
    }

    output
}

pub fn word_to_list_item(word: &Word) -> WordListItem {
    let now_ms = Utc::now().timestamp_millis();

    WordListItem {
        id: word.id.to_string(),
        headword: word.headword.clone(),
        definition: word.primary_definition().map(str::to_string),
        dictionary_id: word.dictionary_id.clone(),
        difficulty: word.difficulty,
        is_favorite: word.is_favorite,
        synced: word.synced,
        likes: word.like_count(),
        created_at: word.created_at,
        updated_at: word.updated_at,
        relative_time: format_relative_time(word.updated_at, now_ms),
        tags: word.tags.iter().cloned().collect(),
    }
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        word_id: conflict.word_id.clone(),
        scope: conflict.scope.clone(),
        local_updated_at: conflict.local_updated_at,
        incoming_updated_at: conflict.incoming_updated_at,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn dictionary_to_item(dictionary: &SharedDictionary, user_id: Option<&str>) -> DictionaryItem {
    DictionaryItem {
        id: dictionary.id.clone(),
        name: dictionary.name.clone(),
        owner: dictionary.owner.clone(),
        role: user_id
            .and_then(|user_id| dictionary.role_of(user_id))
            .map(|role| role.to_string()),
        members: dictionary.collaborators.len(),
        created_at: dictionary.created_at,
    }
}

pub fn format_dictionary_lines(
    dictionaries: &[SharedDictionary],
    user_id: Option<&str>,
) -> Vec<String> {
    dictionaries
        .iter()
        .map(|dictionary| {
            let item = dictionary_to_item(dictionary, user_id);
            format!(
                "{}  {:<24}  {:<7}  {} member(s)",
                item.id,
                truncate(&item.name, 24),
                item.role.as_deref().unwrap_or("-"),
                item.members
            )
        })
        .collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn render_tags(word: &Word) -> String {
    word.tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {}  word={}  {}  local={} incoming={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.word_id,
                conflict.scope,
                conflict.local_updated_at,
                conflict.incoming_updated_at
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("wordhoard").join("wordhoard.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".into()))
}
