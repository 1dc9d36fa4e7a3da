use std::path::Path;

use wordhoard_core::models::Role;
use wordhoard_core::sync::{Answer, Identity};
use wordhoard_core::{Scope, Word};

use crate::commands::common::{
    connect, dictionary_to_item, format_dictionary_lines, format_word_lines, open_store,
    resolve_word, word_to_list_item, Connection, DictionaryItem, ProfileContext, WordListItem,
};
use crate::commands::sync::format_pull;
use crate::error::CliError;

pub async fn run_dict_share(
    name: &str,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let dictionary = connection
        .sharing()
        .promote_private(&connection.identity, name)
        .await?;
    println!("{}  {}", dictionary.id, dictionary.name);
    Ok(())
}

pub async fn run_dict_list(
    cached: bool,
    as_json: bool,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let user_id = profile.profile.identity().map(|identity| identity.user_id);
    let dictionaries = if cached {
        open_store(db_path).await?.list_dictionaries().await?
    } else {
        let connection = connect(db_path, profile).await?;
        connection
            .sharing()
            .list_dictionaries(&connection.identity.user_id)
            .await?
    };

    if as_json {
        let json_items = dictionaries
            .iter()
            .map(|dictionary| dictionary_to_item(dictionary, user_id.as_deref()))
            .collect::<Vec<DictionaryItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if dictionaries.is_empty() {
        println!("No shared dictionaries.");
    } else {
        for line in format_dictionary_lines(&dictionaries, user_id.as_deref()) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Pull one shared dictionary and print its words.
pub async fn run_dict_open(
    dictionary_id: &str,
    as_json: bool,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let scope = Scope::shared(dictionary_id);
    let report = connection
        .engine
        .pull_scope(&connection.identity.user_id, &scope)
        .await?;
    let words = connection
        .engine
        .store()
        .words_in_scope(Some(dictionary_id))
        .await?;

    if as_json {
        let json_items = words
            .iter()
            .map(word_to_list_item)
            .collect::<Vec<WordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        println!("{}", format_pull(&scope, &report));
        for line in format_word_lines(&words) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_dict_invite(
    dictionary_id: &str,
    member: &Identity,
    role: Role,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let dictionary = connection
        .sharing()
        .add_collaborator(&connection.identity, dictionary_id, member, role)
        .await?;
    println!(
        "{} joined {} as {role}",
        member.email, dictionary.name
    );
    Ok(())
}

pub async fn run_dict_remove(
    dictionary_id: &str,
    user_id: &str,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let dictionary = connection
        .sharing()
        .remove_collaborator(&connection.identity, dictionary_id, user_id)
        .await?;
    println!("{user_id} removed from {}", dictionary.name);
    Ok(())
}

pub async fn run_dict_like(
    id: &str,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let (word, dictionary_id) = resolve_shared_word(id, &connection).await?;

    let liked = connection
        .sharing()
        .toggle_like(&connection.identity, &dictionary_id, &word.id)
        .await?;
    println!(
        "{} {}",
        word.headword,
        if liked { "liked" } else { "unliked" }
    );
    Ok(())
}

pub async fn run_dict_answer(
    id: &str,
    answer: Answer,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let connection = connect(db_path, profile).await?;
    let (word, dictionary_id) = resolve_shared_word(id, &connection).await?;

    let score = connection
        .sharing()
        .update_difficulty(&connection.identity, &dictionary_id, &word.id, answer.delta())
        .await?;
    println!("{}: your score {score}", word.headword);
    Ok(())
}

async fn resolve_shared_word(
    id: &str,
    connection: &Connection,
) -> Result<(Word, String), CliError> {
    let word = resolve_word(id, connection.engine.store()).await?;
    let dictionary_id = word
        .dictionary_id
        .clone()
        .ok_or_else(|| CliError::NotShared(word.id.to_string()))?;
    Ok((word, dictionary_id))
}
