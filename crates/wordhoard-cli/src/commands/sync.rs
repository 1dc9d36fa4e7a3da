use std::path::Path;

use wordhoard_core::services::ReconcileReport;
use wordhoard_core::sync::{PushReport, SignInReport};
use wordhoard_core::Scope;

use crate::commands::common::{
    connect, format_sync_conflict_lines, open_store, sync_conflict_to_item, Connection,
    ProfileContext, SyncConflictItem,
};
use crate::error::CliError;

/// Full round trip: sign in (which pushes), then pull every scope.
pub async fn run_sync(profile: &ProfileContext, db_path: &Path) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let engine = &connection.engine;

    let sign_in = engine.sign_in(connection.identity.clone()).await?;
    println!("{}", format_sign_in(&sign_in));

    let result = pull_everything(&connection).await;
    engine.sign_out().await;
    result?;

    println!("Sync completed");
    Ok(())
}

pub async fn run_sync_push(profile: &ProfileContext, db_path: &Path) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let report = connection
        .engine
        .push_unsynced(&connection.identity.user_id)
        .await?;
    println!("{}", format_push(&report));
    Ok(())
}

pub async fn run_sync_pull(profile: &ProfileContext, db_path: &Path) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    pull_everything(&connection).await
}

async fn pull_everything(connection: &Connection) -> Result<(), CliError> {
    let user_id = connection.identity.user_id.as_str();
    let engine = &connection.engine;

    let report = engine.pull_all(user_id).await?;
    println!("{}", format_pull(&connection.identity.private_scope(), &report));

    let dictionaries = connection.sharing().list_dictionaries(user_id).await?;
    for dictionary in &dictionaries {
        let scope = dictionary.scope();
        let report = engine.pull_scope(user_id, &scope).await?;
        println!("{}", format_pull(&scope, &report));
    }
    Ok(())
}

pub async fn run_sync_conflicts(
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let conflicts = store.list_conflicts(limit).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(sync_conflict_to_item)
            .collect::<Vec<SyncConflictItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No sync conflicts recorded.");
        return Ok(());
    }

    for line in format_sync_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sign_in(report: &SignInReport) -> String {
    if report.fresh_login {
        format!(
            "Signed in on this device for the first time; {} local word(s) queued. {}",
            report.marked_unsynced,
            format_push(&report.push)
        )
    } else {
        format!("Signed in. {}", format_push(&report.push))
    }
}

pub fn format_push(report: &PushReport) -> String {
    format!(
        "Pushed {} word(s) and {} delete(s).",
        report.pushed, report.deleted
    )
}

pub fn format_pull(scope: &Scope, report: &ReconcileReport) -> String {
    format!(
        "Pulled {scope}: {} new, {} updated, {} unchanged, {} conflict(s), {} skipped",
        report.inserted, report.updated, report.unchanged, report.conflicts, report.skipped
    )
}
