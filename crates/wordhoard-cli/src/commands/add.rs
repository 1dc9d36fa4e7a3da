use std::path::Path;

use wordhoard_core::models::WordDraft;

use crate::commands::common::{connect, open_word_service, ProfileContext};
use crate::error::CliError;

/// Create a word in the private dictionary, or in a shared one when `dict` is set.
pub async fn run_add(
    draft: WordDraft,
    dict: Option<&str>,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let words = open_word_service(db_path).await?;

    let word = match dict {
        None => words.create_word(draft).await?,
        Some(dictionary_id) => {
            let word = words.build_word(draft)?;
            let connection = connect(db_path, profile).await?;
            connection
                .sharing()
                .add_shared_word(&connection.identity, dictionary_id, word)
                .await?
        }
    };

    println!("{}", word.id);
    Ok(())
}
