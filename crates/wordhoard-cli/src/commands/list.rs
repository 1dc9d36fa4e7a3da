use std::path::Path;

use wordhoard_core::db::WordFilter;

use crate::commands::common::{
    format_word_lines, list_words, open_store, scope_filter, word_to_list_item, WordListItem,
};
use crate::error::CliError;

pub struct ListOptions<'a> {
    pub limit: usize,
    pub tag: Option<&'a str>,
    pub favorites_only: bool,
    pub dict: Option<&'a str>,
    pub private_only: bool,
    pub as_json: bool,
}

pub async fn run_list(options: &ListOptions<'_>, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let filter = WordFilter {
        scope: scope_filter(options.dict, options.private_only),
        tag: options.tag.map(str::to_string),
        favorites_only: options.favorites_only,
    };
    let words = list_words(&store, &filter, options.limit).await?;

    if options.as_json {
        let json_items = words
            .iter()
            .map(word_to_list_item)
            .collect::<Vec<WordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_word_lines(&words) {
            println!("{line}");
        }
    }

    Ok(())
}
