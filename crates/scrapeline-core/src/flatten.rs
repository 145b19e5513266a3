//! Collapse nested documents into flat records.
//!
//! Nested objects become compound keys joined by [`SEPARATOR`], down to
//! [`MAX_DEPTH`] levels. Arrays of objects are expanded per element with the
//! element index as a key segment. Anything deeper, and arrays holding
//! scalars, stay as JSON values under their compound key.

use serde_json::{Map, Value};

use crate::record::{FlatRecord, RawResult};

/// Key segment separator for nested fields
pub const SEPARATOR: &str = "_";

/// Levels of nesting collapsed into compound keys
pub const MAX_DEPTH: usize = 3;

/// Key used when a document is not an object at all
pub const FALLBACK_KEY: &str = "value";

/// Flatten one fetch outcome. Total: every input shape maps to a record.
pub fn flatten(raw: RawResult) -> FlatRecord {
    match raw {
        RawResult::Empty => FlatRecord::new(),
        RawResult::Error { id, error } => {
            let mut out = FlatRecord::new();
            out.insert("id".to_string(), Value::String(id));
            out.insert("error".to_string(), error);
            out
        }
        RawResult::Document(Value::Object(doc)) => {
            let mut out = FlatRecord::new();
            flatten_object(doc, None, 0, &mut out);
            out
        }
        RawResult::Document(other) => {
            log::debug!("document is not an object, keeping it as-is");
            let mut out = FlatRecord::new();
            out.insert(FALLBACK_KEY.to_string(), other);
            out
        }
    }
}

fn join_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(p) => format!("{p}{SEPARATOR}{key}"),
        None => key.to_string(),
    }
}

fn flatten_object(
    obj: Map<String, Value>,
    prefix: Option<&str>,
    depth: usize,
    out: &mut FlatRecord,
) {
    for (key, value) in obj {
        let key = join_key(prefix, &key);
        flatten_value(key, value, depth, out);
    }
}

fn flatten_value(key: String, value: Value, depth: usize, out: &mut FlatRecord) {
    if depth >= MAX_DEPTH {
        out.insert(key, value);
        return;
    }
    match value {
        Value::Object(obj) if !obj.is_empty() => flatten_object(obj, Some(&key), depth + 1, out),
        Value::Array(items) if is_object_array(&items) => {
            for (idx, item) in items.into_iter().enumerate() {
                flatten_value(join_key(Some(&key), &idx.to_string()), item, depth + 1, out);
            }
        }
        other => {
            out.insert(key, other);
        }
    }
}

/// Non-empty array whose elements are all objects
fn is_object_array(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(Value::is_object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> FlatRecord {
        flatten(RawResult::Document(v))
    }

    #[test]
    fn empty_yields_no_fields() {
        assert!(flatten(RawResult::Empty).is_empty());
    }

    #[test]
    fn error_object_is_identity() {
        let error = json!([{"message": "not found", "path": ["announcement"]}]);
        let out = flatten(RawResult::Error {
            id: "X".into(),
            error: error.clone(),
        });
        let expected = json!({"id": "X", "error": error});
        assert_eq!(Value::Object(out), expected);
    }

    #[test]
    fn nested_objects_join_with_underscore() {
        let out = doc(json!({
            "id": "1",
            "category": {"id": "7", "slug": "appartement"},
        }));
        assert_eq!(out["id"], json!("1"));
        assert_eq!(out["category_id"], json!("7"));
        assert_eq!(out["category_slug"], json!("appartement"));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn depth_limit_keeps_deep_values() {
        let out = doc(json!({"a": {"b": {"c": {"d": {"e": 1}}}}}));
        assert_eq!(out["a_b_c_d"], json!({"e": 1}));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn object_arrays_are_index_qualified() {
        let out = doc(json!({
            "medias": [
                {"mediaUrl": "a.jpg", "mimeType": "image/jpeg"},
                {"mediaUrl": "b.jpg", "mimeType": "image/png"},
            ],
        }));
        assert_eq!(out["medias_0_mediaUrl"], json!("a.jpg"));
        assert_eq!(out["medias_1_mimeType"], json!("image/png"));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn index_step_counts_as_level() {
        let out = doc(json!({
            "cities": [{"id": "16", "region": {"id": "1", "parent": {"id": "0"}}}],
        }));
        assert_eq!(out["cities_0_id"], json!("16"));
        assert_eq!(out["cities_0_region_id"], json!("1"));
        assert_eq!(out["cities_0_region_parent"], json!({"id": "0"}));
    }

    #[test]
    fn scalar_arrays_are_retained() {
        let out = doc(json!({"tags": ["a", "b"], "empty": []}));
        assert_eq!(out["tags"], json!(["a", "b"]));
        assert_eq!(out["empty"], json!([]));
    }

    #[test]
    fn empty_nested_object_is_kept() {
        let out = doc(json!({"user": {}}));
        assert_eq!(out["user"], json!({}));
    }

    #[test]
    fn non_object_document_falls_back() {
        let out = doc(json!([1, 2, 3]));
        assert_eq!(out[FALLBACK_KEY], json!([1, 2, 3]));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn flattening_flat_output_is_idempotent() {
        let first = doc(json!({"a": {"b": 1}, "c": [{"d": true}]}));
        let second = doc(Value::Object(first.clone()));
        assert_eq!(first, second);
    }
}
