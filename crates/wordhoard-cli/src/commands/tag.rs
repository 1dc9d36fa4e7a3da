use std::path::Path;

use wordhoard_core::services::WordUpdate;

use crate::commands::common::{open_word_service, render_tags, resolve_word};
use crate::error::CliError;

/// Replace a word's tags, or print every tag with its word count.
pub async fn run_tag(id: Option<&str>, tags: Vec<String>, db_path: &Path) -> Result<(), CliError> {
    let words = open_word_service(db_path).await?;

    let Some(id) = id else {
        for (tag, count) in words.store().list_tags().await? {
            println!("#{:<24}  {count}", tag.name);
        }
        return Ok(());
    };

    let word = resolve_word(id, words.store()).await?;
    let update = WordUpdate {
        tags: Some(tags),
        ..WordUpdate::default()
    };
    let word = words.update_word(&word.id, update).await?;
    println!("{}  {}", word.headword, render_tags(&word));
    Ok(())
}
