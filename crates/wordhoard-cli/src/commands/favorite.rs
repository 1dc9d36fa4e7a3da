use std::path::Path;

use crate::commands::common::{open_word_service, resolve_word};
use crate::error::CliError;

pub async fn run_favorite(id: &str, off: bool, db_path: &Path) -> Result<(), CliError> {
    let words = open_word_service(db_path).await?;
    let word = resolve_word(id, words.store()).await?;

    let word = words.set_favorite(&word.id, !off).await?;
    println!(
        "{} {}",
        word.headword,
        if word.is_favorite { "is a favorite" } else { "is no longer a favorite" }
    );
    Ok(())
}
