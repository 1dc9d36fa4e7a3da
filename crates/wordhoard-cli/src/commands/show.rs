use std::path::Path;

use crate::commands::common::{format_word_detail, open_store, resolve_word, ProfileContext};
use crate::error::CliError;

pub async fn run_show(
    id: &str,
    as_json: bool,
    profile: &ProfileContext,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let word = resolve_word(id, &store).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&word)?);
    } else {
        print!("{}", format_word_detail(&word, profile.profile.email.as_deref()));
    }
    Ok(())
}
