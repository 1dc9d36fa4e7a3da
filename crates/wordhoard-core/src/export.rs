//! Word export helpers shared by the clients.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::Word;

/// Export output format shared by all clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMeaning {
    pub definition: String,
    pub examples: Vec<String>,
}

/// Serializable word representation used in JSON and Markdown exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportWord {
    pub id: String,
    pub headword: String,
    pub language: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub part_of_speech: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary_id: Option<String>,
    pub meanings: Vec<ExportMeaning>,
    pub tags: Vec<String>,
    pub difficulty: i32,
    pub is_favorite: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Convert a word into an export record with meanings in display order.
#[must_use]
pub fn word_to_export_item(word: &Word) -> ExportWord {
    let mut meanings: Vec<_> = word.meanings.iter().collect();
    meanings.sort_by_key(|meaning| meaning.order);

    ExportWord {
        id: word.id.to_string(),
        headword: word.headword.clone(),
        language: word.language.clone(),
        part_of_speech: word.part_of_speech.clone(),
        phonetic: word.phonetic.clone(),
        dictionary_id: word.dictionary_id.clone(),
        meanings: meanings
            .into_iter()
            .map(|meaning| ExportMeaning {
                definition: meaning.definition.clone(),
                examples: meaning.examples.clone(),
            })
            .collect(),
        tags: word.tags.iter().cloned().collect(),
        difficulty: word.difficulty,
        is_favorite: word.is_favorite,
        created_at: word.created_at,
        updated_at: word.updated_at,
    }
}

/// Render words as pretty-printed JSON.
pub fn render_json_export(words: &[Word]) -> serde_json::Result<String> {
    let items = words
        .iter()
        .map(word_to_export_item)
        .collect::<Vec<ExportWord>>();
    serde_json::to_string_pretty(&items)
}

/// Render words in Markdown with frontmatter blocks.
#[must_use]
pub fn render_markdown_export(words: &[Word]) -> String {
    let mut output = String::new();

    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let item = word_to_export_item(word);
        let _ = writeln!(output, "---");
        let _ = writeln!(output, "id: {}", item.id);
        let _ = writeln!(output, "language: {}", item.language);
        let _ = writeln!(output, "difficulty: {}", item.difficulty);
        let _ = writeln!(output, "created_at: {}", item.created_at);
        let _ = writeln!(output, "updated_at: {}", item.updated_at);
        let _ = writeln!(output, "tags:");
        for tag in &item.tags {
            let _ = writeln!(output, "  - {tag}");
        }
        let _ = writeln!(output, "---");
        let _ = writeln!(output);

        let _ = write!(output, "# {}", item.headword);
        if let Some(phonetic) = &item.phonetic {
            let _ = write!(output, " {phonetic}");
        }
        output.push('\n');
        if !item.part_of_speech.is_empty() {
            let _ = writeln!(output, "\n_{}_", item.part_of_speech);
        }
        for (number, meaning) in item.meanings.iter().enumerate() {
            let _ = writeln!(output, "\n{}. {}", number + 1, meaning.definition);
            for example in &meaning.examples {
                let _ = writeln!(output, "   - {example}");
            }
        }
    }

    output
}

/// Render words based on selected export format.
pub fn render_words_export(words: &[Word], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(words),
        ExportFormat::Markdown => Ok(render_markdown_export(words)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("wordhoard-export-{timestamp_ms}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Meaning;

    fn sample() -> Word {
        let mut word = Word::new("petrichor", "en", 123);
        word.id = "cccccccc-cccc-7ccc-8ccc-111111111111".parse().unwrap();
        word.part_of_speech = "noun".into();
        word.phonetic = Some("/ˈpɛtrɪkɔː/".into());
        word.tags.insert("weather".into());
        word.tags.insert("c1".into());
        let mut second = Meaning::new("the smell of rain", 1, 123);
        second.add_example("The petrichor rose from the road.");
        word.meanings.push(second);
        word.meanings.push(Meaning::new("an earthy scent", 0, 123));
        word.updated_at = 456;
        word
    }

    #[test]
    fn export_item_orders_meanings_and_tags() {
        let item = word_to_export_item(&sample());
        assert_eq!(item.tags, vec!["c1", "weather"]);
        assert_eq!(item.meanings[0].definition, "an earthy scent");
        assert_eq!(item.meanings[1].examples.len(), 1);
    }

    #[test]
    fn render_markdown_export_includes_frontmatter_and_meanings() {
        let rendered = render_markdown_export(&[sample()]);
        assert!(rendered.contains("id: cccccccc-cccc-7ccc-8ccc-111111111111"));
        assert!(rendered.contains("created_at: 123"));
        assert!(rendered.contains("updated_at: 456"));
        assert!(rendered.contains("tags:\n  - c1\n  - weather"));
        assert!(rendered.contains("# petrichor /ˈpɛtrɪkɔː/"));
        assert!(rendered.contains("2. the smell of rain\n   - The petrichor rose from the road."));
    }

    #[test]
    fn render_json_export_skips_empty_optionals() {
        let word = Word::new("plain", "en", 1);
        let rendered = render_json_export(&[word]).unwrap();
        assert!(rendered.contains("\"headword\": \"plain\""));
        assert!(!rendered.contains("phonetic"));
        assert!(!rendered.contains("dictionary_id"));
    }

    #[test]
    fn suggested_export_file_name_uses_format_extension() {
        assert_eq!(
            suggested_export_file_name(ExportFormat::Json, 123),
            "wordhoard-export-123.json"
        );
        assert_eq!(
            suggested_export_file_name(ExportFormat::Markdown, 456),
            "wordhoard-export-456.md"
        );
    }
}
