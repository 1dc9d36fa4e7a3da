use std::path::Path;

use wordhoard_core::services::WordUpdate;

use crate::commands::common::{meaning_index, open_word_service, resolve_word};
use crate::error::CliError;

pub async fn run_edit(id: &str, update: WordUpdate, db_path: &Path) -> Result<(), CliError> {
    let words = open_word_service(db_path).await?;
    let word = resolve_word(id, words.store()).await?;

    let word = words.update_word(&word.id, update).await?;
    println!("{}", word.id);
    Ok(())
}

pub async fn run_define(
    id: &str,
    meaning: usize,
    definition: &str,
    db_path: &Path,
) -> Result<(), CliError> {
    let index = meaning_index(meaning)?;
    let words = open_word_service(db_path).await?;
    let word = resolve_word(id, words.store()).await?;

    let word = words.edit_definition(&word.id, index, definition).await?;
    println!("{} now has {} meaning(s)", word.headword, word.meanings.len());
    Ok(())
}

pub async fn run_example(
    id: &str,
    meaning: usize,
    example: &str,
    db_path: &Path,
) -> Result<(), CliError> {
    let index = meaning_index(meaning)?;
    let words = open_word_service(db_path).await?;
    let word = resolve_word(id, words.store()).await?;

    words.add_example(&word.id, index, example).await?;
    println!("{}", word.id);
    Ok(())
}
