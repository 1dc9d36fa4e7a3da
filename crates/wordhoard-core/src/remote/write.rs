//! Write operations accepted by a [`RemoteStore`](super::RemoteStore) commit

use serde_json::{Map, Value};

use super::path::{DocPath, FieldPath};

/// One document write inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace the whole document
    Set { path: DocPath, data: Value },
    /// Update the listed fields, creating the document (and nested maps) when missing
    Merge {
        path: DocPath,
        fields: Vec<(FieldPath, Value)>,
    },
    /// Remove the document; deleting a missing document is not an error
    Delete { path: DocPath },
}

impl WriteOp {
    pub const fn path(&self) -> &DocPath {
        match self {
            Self::Set { path, .. } | Self::Merge { path, .. } | Self::Delete { path } => path,
        }
    }

    /// Merge write of every top-level field of `data` except `excluded`.
    ///
    /// Non-object `data` produces an empty field list.
    pub fn merge_top_level(path: DocPath, data: Value, excluded: &[&str]) -> Self {
        let fields = match data {
            Value::Object(map) => map
                .into_iter()
                .filter(|(key, _)| !excluded.contains(&key.as_str()))
                .map(|(key, value)| (FieldPath::field(key), value))
                .collect(),
            _ => Vec::new(),
        };
        Self::Merge { path, fields }
    }
}

/// Set `value` at `field` inside `document`, creating intermediate maps.
///
/// A non-object value sitting on the way is replaced by a map.
pub fn apply_field(document: &mut Value, field: &FieldPath, value: Value) {
    if !document.is_object() {
        *document = Value::Object(Map::new());
    }
    if let Value::Object(map) = document {
        set_in_map(map, field.segments(), value);
    }
}

fn set_in_map(map: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            map.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_in_map(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn apply_field_creates_nested_maps() {
        let mut doc = json!({"headword": "a"});
        apply_field(
            &mut doc,
            &FieldPath::new(["likes", "x.y@example.com"]),
            json!(true),
        );
        assert_eq!(
            doc,
            json!({"headword": "a", "likes": {"x.y@example.com": true}})
        );
    }

    #[test]
    fn apply_field_keeps_sibling_keys() {
        let mut doc = json!({"likes": {"a@x": true}});
        apply_field(&mut doc, &FieldPath::new(["likes", "b@x"]), json!(false));
        assert_eq!(doc, json!({"likes": {"a@x": true, "b@x": false}}));
    }

    #[test]
    fn merge_top_level_skips_excluded_fields() {
        let path = DocPath::dictionary_word("d", "w").unwrap();
        let op = WriteOp::merge_top_level(
            path.clone(),
            json!({"headword": "a", "likes": {}, "updatedAt": 5}),
            &["likes"],
        );
        let WriteOp::Merge { fields, .. } = op else {
            panic!("expected merge");
        };
        let names: Vec<String> = fields.iter().map(|(f, _)| f.to_string()).collect();
        assert_eq!(names, vec!["headword", "updatedAt"]);
    }
}
