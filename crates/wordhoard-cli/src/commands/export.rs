use std::path::Path;

use chrono::Utc;
use wordhoard_core::export::{render_words_export, suggested_export_file_name};

use crate::cli::ExportFormat;
use crate::commands::common::{list_all_words, open_store};
use crate::error::CliError;

/// Export every word. An `output_path` naming a directory gets a timestamped file inside it.
pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let words = list_all_words(&store).await?;
    let format = format.into();
    let rendered = render_words_export(&words, format)?;

    if let Some(path) = output_path {
        let path = if path.is_dir() {
            path.join(suggested_export_file_name(
                format,
                Utc::now().timestamp_millis(),
            ))
        } else {
            path.to_path_buf()
        };
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
