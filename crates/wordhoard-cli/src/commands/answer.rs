use std::path::Path;

use wordhoard_core::sync::Answer;

use crate::commands::common::{open_word_service, resolve_word};
use crate::error::CliError;

pub async fn run_answer(id: &str, answer: Answer, db_path: &Path) -> Result<(), CliError> {
    let words = open_word_service(db_path).await?;
    let word = resolve_word(id, words.store()).await?;

    let score = words.record_answer(&word.id, answer).await?;
    println!("{}: score {score}", word.headword);
    Ok(())
}
