//! Documents and foreign-key values
//!
//! Documents are plain JSON objects, the same representation the rest of
//! the ORM hydrates rows into. Key values are pulled out of them into a
//! hashable, ordered form so they can be batched as a set.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A loaded document (a JSON object)
pub type Document = JsonValue;

/// A batch of loaded documents
pub type Documents = Vec<Document>;

/// Distinct foreign-key values sent to the store in one lookup
pub type KeySet = BTreeSet<KeyValue>;

/// A single foreign-key or primary-key value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Integer(i64),
    Text(String),
}

impl KeyValue {
    /// Convert a JSON scalar into a key. Nulls, floats and composite values
    /// never identify a document.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(n) => n.as_i64().map(KeyValue::Integer),
            JsonValue::String(s) => Some(KeyValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Convert back into a JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            KeyValue::Integer(i) => JsonValue::from(*i),
            KeyValue::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Integer(i) => write!(f, "{}", i),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Integer(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::Text(value.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        KeyValue::Text(value)
    }
}

/// Key values stored in `field` of a document. Array fields yield one key
/// per element.
pub fn keys_of(document: &Document, field: &str) -> Vec<KeyValue> {
    match document.get(field) {
        Some(JsonValue::Array(items)) => items.iter().filter_map(KeyValue::from_json).collect(),
        Some(value) => KeyValue::from_json(value).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Collect the distinct key values of `field` across documents
pub fn collect_keys<'a, I>(documents: I, field: &str) -> KeySet
where
    I: IntoIterator<Item = &'a Document>,
{
    documents
        .into_iter()
        .flat_map(|doc| keys_of(doc, field))
        .collect()
}

/// Read a string field, used for type discriminators
pub fn string_field<'a>(document: &'a Document, field: &str) -> Option<&'a str> {
    document
        .get(field)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_value_from_json() {
        assert_eq!(KeyValue::from_json(&json!(7)), Some(KeyValue::Integer(7)));
        assert_eq!(KeyValue::from_json(&json!("a1")), Some(KeyValue::Text("a1".into())));
        assert_eq!(KeyValue::from_json(&json!(null)), None);
        assert_eq!(KeyValue::from_json(&json!(1.5)), None);
        assert_eq!(KeyValue::from_json(&json!({"id": 1})), None);
    }

    #[test]
    fn test_collect_keys_deduplicates() {
        let docs = vec![
            json!({"owner_id": 1}),
            json!({"owner_id": 2}),
            json!({"owner_id": 1}),
            json!({"owner_id": null}),
            json!({"name": "no key"}),
        ];

        let keys = collect_keys(&docs, "owner_id");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&KeyValue::Integer(1)));
        assert!(keys.contains(&KeyValue::Integer(2)));
    }

    #[test]
    fn test_collect_keys_flattens_arrays() {
        let docs = vec![json!({"tag_ids": ["a", "b"]}), json!({"tag_ids": ["b", "c"]})];
        let keys = collect_keys(&docs, "tag_ids");
        let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_string_field_ignores_empty() {
        let doc = json!({"ownable_type": "", "kind": "Dog"});
        assert_eq!(string_field(&doc, "ownable_type"), None);
        assert_eq!(string_field(&doc, "kind"), Some("Dog"));
    }
}
