use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wordhoard_core::config::SyncConfigOverrides;
use wordhoard_core::db::{ScopeFilter, WordFilter};
use wordhoard_core::models::{Role, WordDraft};
use wordhoard_core::services::{LocalStore, ReconcileReport};
use wordhoard_core::sync::{Answer, Identity, SyncError, SyncEvent};
use wordhoard_core::{Scope, Word, WordId};

use crate::cli::CompletionShell;
use crate::commands::add::run_add;
use crate::commands::auth::login;
use crate::commands::common::{
    connect, format_relative_time, format_sync_timestamp, format_word_lines, list_all_words,
    meaning_index, normalize_word_identifier, open_store, resolve_word, scope_filter, truncate,
    ProfileContext,
};
use crate::commands::completions::completion_script;
use crate::commands::config::{apply_config_init, ConfigInitOptions};
use crate::commands::dict::{run_dict_answer, run_dict_invite, run_dict_like, run_dict_share};
use crate::commands::export::run_export;
use crate::commands::sync::{run_sync, run_sync_pull, run_sync_push};
use crate::commands::watch::describe_event;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn db_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.db"))
    }

    fn remote_path(&self) -> PathBuf {
        self.dir.path().join("remote.json")
    }

    fn profile(&self, user_id: &str) -> ProfileContext {
        ProfileContext {
            name: user_id.to_string(),
            profile: CliProfile {
                user_id: Some(user_id.to_string()),
                email: Some(format!("{user_id}@example.com")),
                display_name: None,
                remote_path: Some(self.remote_path()),
                can_sync: true,
                sync: SyncConfigOverrides {
                    retry_delay_ms: Some(0),
                    ..SyncConfigOverrides::default()
                },
            },
        }
    }
}

fn draft(headword: &str, definition: &str) -> WordDraft {
    WordDraft {
        headword: headword.to_string(),
        definition: Some(definition.to_string()),
        ..WordDraft::default()
    }
}

async fn store_word(db_path: &Path, id: &str, headword: &str) -> Word {
    let store = LocalStore::open_path(db_path).await.unwrap();
    let mut word = Word::new(headword, "en", 1_000);
    word.id = id.parse::<WordId>().unwrap();
    store.upsert_word(&word).await.unwrap();
    word
}

#[test]
fn format_relative_time_uses_expected_buckets() {
    let now = 1_000_000_000;
    assert_eq!(format_relative_time(now - 10_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3_600_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 86_400_000, now), "2d ago");
    assert_eq!(format_relative_time(now - 14 * 86_400_000, now), "2w ago");
}

#[test]
fn format_sync_timestamp_renders_utc() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn truncate_collapses_whitespace_and_adds_ellipsis() {
    assert_eq!(truncate("a  quick\nfox", 20), "a quick fox");
    assert_eq!(truncate("abcdefghij", 6), "abc...");
}

#[test]
fn normalize_word_identifier_rejects_empty() {
    assert!(matches!(
        normalize_word_identifier(" \n "),
        Err(CliError::EmptyWordId)
    ));
    assert_eq!(normalize_word_identifier("  abc123  ").unwrap(), "abc123");
}

#[test]
fn meaning_numbers_are_one_based() {
    assert_eq!(meaning_index(1).unwrap(), 0);
    assert!(matches!(meaning_index(0), Err(CliError::InvalidMeaningNumber)));
}

#[test]
fn scope_filter_prefers_dictionary() {
    assert_eq!(
        scope_filter(Some("d1"), true),
        ScopeFilter::Dictionary("d1".into())
    );
    assert_eq!(scope_filter(None, true), ScopeFilter::Private);
    assert_eq!(scope_filter(None, false), ScopeFilter::All);
}

#[test]
fn format_word_lines_marks_unsynced_favorites_and_tags() {
    let mut word = Word::new("sonder", "en", 0);
    word.is_favorite = true;
    word.tags.insert("feelings".into());

    let lines = format_word_lines(&[word]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(" + sonder"));
    assert!(lines[0].ends_with("#feelings"));
}

#[test]
fn describe_event_skips_snapshots_without_changes() {
    let scope = Scope::private("alice");
    let quiet = SyncEvent::SnapshotApplied {
        scope: scope.clone(),
        report: ReconcileReport {
            unchanged: 3,
            ..ReconcileReport::default()
        },
    };
    assert_eq!(describe_event(&quiet), None);

    let busy = SyncEvent::SnapshotApplied {
        scope,
        report: ReconcileReport {
            inserted: 2,
            ..ReconcileReport::default()
        },
    };
    assert_eq!(
        describe_event(&busy).as_deref(),
        Some("private:alice: 2 new, 0 updated, 0 deleted")
    );
    assert_eq!(
        describe_event(&SyncEvent::Pushed {
            pushed: 4,
            deleted: 1
        })
        .as_deref(),
        Some("Pushed 4 word(s) and 1 delete(s).")
    );
}

#[test]
fn apply_config_init_merges_and_activates() {
    let mut config = CliProfilesConfig {
        version: 1,
        active_profile: Some("home".to_string()),
        profiles: BTreeMap::new(),
    };

    let name = apply_config_init(
        &mut config,
        Some("work"),
        ConfigInitOptions {
            remote_path: Some(PathBuf::from("/tmp/work-remote.json")),
            can_sync: Some(false),
            sync: SyncConfigOverrides {
                batch_size: Some(100),
                ..SyncConfigOverrides::default()
            },
            no_activate: false,
        },
    )
    .unwrap();
    assert_eq!(name, "work");
    assert_eq!(config.active_profile.as_deref(), Some("work"));

    apply_config_init(
        &mut config,
        Some("work"),
        ConfigInitOptions {
            sync: SyncConfigOverrides {
                max_attempts: Some(5),
                ..SyncConfigOverrides::default()
            },
            no_activate: true,
            ..ConfigInitOptions::default()
        },
    )
    .unwrap();
    let profile = config.profile("work").unwrap();
    assert!(!profile.can_sync);
    assert_eq!(profile.sync.batch_size, Some(100));
    assert_eq!(profile.sync.max_attempts, Some(5));
}

#[test]
fn apply_config_init_rejects_invalid_sync_settings() {
    let mut config = CliProfilesConfig::default();
    let result = apply_config_init(
        &mut config,
        Some("default"),
        ConfigInitOptions {
            sync: SyncConfigOverrides {
                batch_size: Some(1_000),
                ..SyncConfigOverrides::default()
            },
            ..ConfigInitOptions::default()
        },
    );
    assert!(matches!(result, Err(CliError::Config(_))));
    assert!(config.profiles.is_empty());
}

#[test]
fn login_validates_user_id_and_email() {
    let mut config = CliProfilesConfig::default();
    assert!(matches!(
        login(&mut config, "default", "a/b", "a@example.com", None),
        Err(CliError::Sync(SyncError::InvalidUserId(_)))
    ));
    assert!(login(&mut config, "default", "alice", "  ", None).is_err());

    login(
        &mut config,
        "default",
        " alice ",
        "alice@example.com",
        Some("Alice".to_string()),
    )
    .unwrap();
    let identity = config.profile("default").unwrap().identity().unwrap();
    assert_eq!(
        identity,
        Identity::new("alice", "alice@example.com").with_display_name("Alice")
    );
}

#[test]
fn completion_script_names_the_binary() {
    let script = String::from_utf8(completion_script(CompletionShell::Bash)).unwrap();
    assert!(script.contains("wordhoard"));
}

#[tokio::test(flavor = "multi_thread")]
async fn resolve_word_supports_exact_and_prefix_id() {
    let workspace = Workspace::new();
    let db_path = workspace.db_path("words");
    store_word(&db_path, "11111111-1111-7111-8111-111111111111", "alpha").await;
    store_word(&db_path, "11111111-1111-7111-8111-222222222222", "beta").await;

    let store = open_store(&db_path).await.unwrap();
    let exact = resolve_word("11111111-1111-7111-8111-111111111111", &store)
        .await
        .unwrap();
    assert_eq!(exact.headword, "alpha");

    let by_prefix = resolve_word("11111111-1111-7111-8111-2", &store)
        .await
        .unwrap();
    assert_eq!(by_prefix.headword, "beta");

    assert!(matches!(
        resolve_word("11111111", &store).await,
        Err(CliError::AmbiguousWordId(_))
    ));
    assert!(matches!(
        resolve_word("ffff", &store).await,
        Err(CliError::WordNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_requires_identity() {
    let workspace = Workspace::new();
    let mut profile = workspace.profile("alice");
    profile.profile.clear_identity();

    let result = connect(&workspace.db_path("alice"), &profile).await;
    assert!(matches!(result, Err(CliError::NotLoggedIn(name)) if name == "alice"));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_is_refused_without_entitlement() {
    let workspace = Workspace::new();
    let mut profile = workspace.profile("alice");
    profile.profile.can_sync = false;

    let result = run_sync_push(&profile, &workspace.db_path("alice")).await;
    assert!(matches!(
        result,
        Err(CliError::Sync(SyncError::SubscriptionRequired))
    ));
    assert!(!workspace.remote_path().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn private_words_reach_a_second_device() {
    let workspace = Workspace::new();
    let alice = workspace.profile("alice");
    let laptop = workspace.db_path("laptop");
    let phone = workspace.db_path("phone");

    run_add(draft("sonder", "a realization"), None, &alice, &laptop)
        .await
        .unwrap();
    run_sync(&alice, &laptop).await.unwrap();

    let store = open_store(&laptop).await.unwrap();
    assert!(store.list_unsynced().await.unwrap().is_empty());
    drop(store);

    run_sync_pull(&alice, &phone).await.unwrap();
    let words = list_all_words(&open_store(&phone).await.unwrap())
        .await
        .unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].headword, "sonder");
    assert!(words[0].synced);
}

#[tokio::test(flavor = "multi_thread")]
async fn shared_dictionary_flow_between_two_users() {
    let workspace = Workspace::new();
    let alice = workspace.profile("alice");
    let bob = workspace.profile("bob");
    let alice_db = workspace.db_path("alice");
    let bob_db = workspace.db_path("bob");

    run_add(draft("petrichor", "smell of rain"), None, &alice, &alice_db)
        .await
        .unwrap();
    run_dict_share("Weather", &alice, &alice_db).await.unwrap();

    let dictionary_id = {
        let store = open_store(&alice_db).await.unwrap();
        let dictionaries = store.list_dictionaries().await.unwrap();
        assert_eq!(dictionaries.len(), 1);
        dictionaries[0].id.clone()
    };

    let member = bob.identity().unwrap();
    run_dict_invite(&dictionary_id, &member, Role::Editor, &alice, &alice_db)
        .await
        .unwrap();

    run_sync_pull(&bob, &bob_db).await.unwrap();
    let store = open_store(&bob_db).await.unwrap();
    let filter = WordFilter {
        scope: ScopeFilter::Dictionary(dictionary_id.clone()),
        ..WordFilter::default()
    };
    let shared = store.list_words(&filter, 10, 0).await.unwrap();
    assert_eq!(shared.len(), 1);
    let word_id = shared[0].id.to_string();
    drop(store);

    run_dict_like(&word_id, &bob, &bob_db).await.unwrap();
    run_dict_answer(&word_id, Answer::Correct, &bob, &bob_db)
        .await
        .unwrap();

    run_sync_pull(&alice, &alice_db).await.unwrap();
    let store = open_store(&alice_db).await.unwrap();
    let word = resolve_word(&word_id, &store).await.unwrap();
    assert_eq!(word.likes.get("bob@example.com"), Some(&true));
    assert_eq!(word.difficulties.get("bob@example.com"), Some(&5));
    assert_eq!(word.dictionary_id.as_deref(), Some(dictionary_id.as_str()));
}

#[tokio::test(flavor = "multi_thread")]
async fn adding_to_a_dictionary_requires_membership() {
    let workspace = Workspace::new();
    let alice = workspace.profile("alice");
    let mallory = workspace.profile("mallory");
    let alice_db = workspace.db_path("alice");
    let mallory_db = workspace.db_path("mallory");

    run_dict_share("Empty", &alice, &alice_db).await.unwrap();
    let dictionary_id = open_store(&alice_db).await.unwrap().list_dictionaries().await.unwrap()[0]
        .id
        .clone();

    let result = run_add(
        draft("intrusion", "not welcome"),
        Some(&dictionary_id),
        &mallory,
        &mallory_db,
    )
    .await;
    assert!(matches!(
        result,
        Err(CliError::Sync(SyncError::PermissionDenied(_)))
    ));
    let words = list_all_words(&open_store(&mallory_db).await.unwrap())
        .await
        .unwrap();
    assert!(words.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn export_into_directory_uses_suggested_file_name() {
    let workspace = Workspace::new();
    let db_path = workspace.db_path("export");
    store_word(&db_path, "22222222-2222-7222-8222-222222222222", "hygge").await;

    let out_dir = workspace.dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    run_export(crate::cli::ExportFormat::Json, Some(&out_dir), &db_path)
        .await
        .unwrap();

    let files: Vec<_> = std::fs::read_dir(&out_dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("wordhoard-export-"));
    assert!(name.ends_with(".json"));
    assert!(std::fs::read_to_string(&files[0]).unwrap().contains("hygge"));
}
