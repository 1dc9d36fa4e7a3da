//! Wordhoard CLI - vocabulary notebook with private and shared dictionaries
//!
//! Sync runs against a JSON file standing in for the cloud document store.

mod cli;
mod commands;
mod config_profiles;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use wordhoard_core::models::WordDraft;
use wordhoard_core::services::WordUpdate;
use wordhoard_core::sync::Identity;

use crate::cli::{Cli, Commands, DictCommands, SyncCommands};
use crate::commands::add::run_add;
use crate::commands::answer::run_answer;
use crate::commands::auth::run_auth;
use crate::commands::common::{resolve_db_path, ProfileContext};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::dict::{
    run_dict_answer, run_dict_invite, run_dict_like, run_dict_list, run_dict_open,
    run_dict_remove, run_dict_share,
};
use crate::commands::edit::{run_define, run_edit, run_example};
use crate::commands::export::run_export;
use crate::commands::favorite::run_favorite;
use crate::commands::list::{run_list, ListOptions};
use crate::commands::show::run_show;
use crate::commands::sync::{run_sync, run_sync_conflicts, run_sync_pull, run_sync_push};
use crate::commands::tag::run_tag;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "wordhoard=info".parse::<tracing_subscriber::filter::Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global_profile = cli.profile.as_deref();
    let db_path = resolve_db_path(cli.db_path)?;
    let profile = ProfileContext::load(global_profile)?;

    match cli.command {
        Commands::Add {
            headword,
            definition,
            examples,
            part_of_speech,
            phonetic,
            tags,
            language,
            dict,
        } => {
            let draft = WordDraft {
                headword,
                definition,
                examples,
                part_of_speech,
                phonetic,
                tags,
                language,
            };
            run_add(draft, dict.as_deref(), &profile, &db_path).await
        }
        Commands::List {
            limit,
            tag,
            favorites,
            dict,
            private,
            json,
        } => {
            let options = ListOptions {
                limit,
                tag: tag.as_deref(),
                favorites_only: favorites,
                dict: dict.as_deref(),
                private_only: private,
                as_json: json,
            };
            run_list(&options, &db_path).await
        }
        Commands::Show { id, json } => run_show(&id, json, &profile, &db_path).await,
        Commands::Edit {
            id,
            headword,
            part_of_speech,
            phonetic,
            language,
        } => {
            let update = WordUpdate {
                headword,
                part_of_speech,
                phonetic,
                language,
                tags: None,
            };
            run_edit(&id, update, &db_path).await
        }
        Commands::Define {
            id,
            definition,
            meaning,
        } => run_define(&id, meaning, &definition, &db_path).await,
        Commands::Example {
            id,
            example,
            meaning,
        } => run_example(&id, meaning, &example, &db_path).await,
        Commands::Delete { id } => run_delete(&id, &db_path).await,
        Commands::Favorite { id, off } => run_favorite(&id, off, &db_path).await,
        Commands::Answer { id, result } => run_answer(&id, result.into(), &db_path).await,
        Commands::Tag { id, tags } => run_tag(id.as_deref(), tags, &db_path).await,
        Commands::Sync { command } => match command {
            None => run_sync(&profile, &db_path).await,
            Some(SyncCommands::Push) => run_sync_push(&profile, &db_path).await,
            Some(SyncCommands::Pull) => run_sync_pull(&profile, &db_path).await,
            Some(SyncCommands::Conflicts { limit, json }) => {
                run_sync_conflicts(limit, json, &db_path).await
            }
        },
        Commands::Watch { interval_ms } => run_watch(interval_ms, &profile, &db_path).await,
        Commands::Dict { command } => run_dict(command, &profile, &db_path).await,
        Commands::Export { format, output } => {
            run_export(format, output.as_deref(), &db_path).await
        }
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command, global_profile),
        Commands::Auth { command } => run_auth(command, global_profile),
    }
}

async fn run_dict(
    command: DictCommands,
    profile: &ProfileContext,
    db_path: &std::path::Path,
) -> Result<(), CliError> {
    match command {
        DictCommands::Share { name } => run_dict_share(&name, profile, db_path).await,
        DictCommands::List { cached, json } => run_dict_list(cached, json, profile, db_path).await,
        DictCommands::Open {
            dictionary_id,
            json,
        } => run_dict_open(&dictionary_id, json, profile, db_path).await,
        DictCommands::Invite {
            dictionary_id,
            user_id,
            email,
            display_name,
            role,
        } => {
            let member = Identity {
                user_id,
                email,
                display_name,
            };
            run_dict_invite(&dictionary_id, &member, role.into(), profile, db_path).await
        }
        DictCommands::Remove {
            dictionary_id,
            user_id,
        } => run_dict_remove(&dictionary_id, &user_id, profile, db_path).await,
        DictCommands::Like { id } => run_dict_like(&id, profile, db_path).await,
        DictCommands::Answer { id, result } => {
            run_dict_answer(&id, result.into(), profile, db_path).await
        }
    }
}
