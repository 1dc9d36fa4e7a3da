use std::path::Path;

use crate::commands::common::{open_word_service, resolve_word};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let words = open_word_service(db_path).await?;
    let word = resolve_word(id, words.store()).await?;

    words.delete_word(&word.id).await?;
    println!("{}", word.id);
    Ok(())
}
