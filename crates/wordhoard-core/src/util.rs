//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Push `value` onto `items` unless an equal entry is already present.
pub(crate) fn push_unique(items: &mut Vec<String>, value: &str) -> bool {
    if items.iter().any(|existing| existing == value) {
        false
    } else {
        items.push(value.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" serendipity ".to_string())),
            Some("serendipity".to_string())
        );
    }

    #[test]
    fn compact_text_truncates_long_values() {
        let long = "x".repeat(400);
        assert_eq!(compact_text(&long).len(), 180);
    }

    #[test]
    fn push_unique_skips_duplicates() {
        let mut items = vec!["a".to_string()];
        assert!(!push_unique(&mut items, "a"));
        assert!(push_unique(&mut items, "b"));
        assert_eq!(items, vec!["a", "b"]);
    }
}
