use std::path::Path;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use wordhoard_core::sync::{PushReport, SyncEvent};
use wordhoard_core::util::compact_text;

use crate::commands::common::{connect, ProfileContext};
use crate::commands::sync::{format_push, format_sign_in};
use crate::error::CliError;

const MIN_POLL_INTERVAL_MS: u64 = 50;

/// Sign in, listen to the private dictionary and every shared one, and
/// print changes until Ctrl-C.
///
/// The remote file is polled so writes from other processes reach the
/// listeners; local edits made meanwhile are pushed on the next tick.
pub async fn run_watch(
    interval_ms: u64,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let engine = &connection.engine;
    let user_id = connection.identity.user_id.clone();
    let mut events = engine.subscribe();

    let sign_in = engine.sign_in(connection.identity.clone()).await?;
    println!("{}", format_sign_in(&sign_in));

    let dictionaries = connection.sharing().list_dictionaries(&user_id).await?;
    for dictionary in &dictionaries {
        engine.activate_dictionary(&dictionary.id).await?;
    }
    println!(
        "Watching {} scope(s). Press Ctrl-C to stop.",
        engine.listeners().active_scopes().await.len()
    );

    let mut ticker =
        tokio::time::interval(Duration::from_millis(interval_ms.max(MIN_POLL_INTERVAL_MS)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if let Err(error) = connection.remote.reload().await {
                    tracing::warn!(error = %error, "Failed to reload remote store");
                }
                match engine.store().list_unsynced().await {
                    Ok(pending) if !pending.is_empty() => {
                        if let Err(error) = engine.push_unsynced(&user_id).await {
                            tracing::warn!(error = %error, "Push failed, retrying next tick");
                        }
                    }
                    Ok(_) => {}
                    Err(error) => tracing::warn!(error = %error, "Failed to read unsynced words"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped sync events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    engine.sign_out().await;
    println!("Stopped watching");
    Ok(())
}

/// One status line per event worth showing; snapshots that changed nothing are silent.
pub fn describe_event(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::StateChanged(state) => Some(format!("state: {}", state.label())),
        SyncEvent::SnapshotApplied { scope, report } => report.has_changes().then(|| {
            format!(
                "{scope}: {} new, {} updated, {} deleted",
                report.inserted, report.updated, report.deleted
            )
        }),
        SyncEvent::Pushed { pushed, deleted } => Some(format_push(&PushReport {
            pushed: *pushed,
            deleted: *deleted,
        })),
        SyncEvent::ListenerError { scope, message } => Some(format!(
            "listener error on {scope}: {}",
            compact_text(message)
        )),
    }
}
