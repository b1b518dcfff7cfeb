//! Operator-injection guard: `$` and `.` in client-supplied keys become `_`.

use serde_json::{Map, Value};
use std::borrow::Cow;

const REPLACEMENT: &str = "_";

fn is_forbidden(c: char) -> bool {
    c == '$' || c == '.'
}

pub fn sanitize_key(key: &str) -> Cow<'_, str> {
    if key.contains(is_forbidden) {
        Cow::Owned(key.replace(is_forbidden, REPLACEMENT))
    } else {
        Cow::Borrowed(key)
    }
}

/// Rewrite object keys recursively, through arrays as well. Values are left alone.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        other => other,
    }
}

pub fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (sanitize_key(&k).into_owned(), sanitize_value(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_operator_characters() {
        assert_eq!(sanitize_key("$gt"), "_gt");
        assert_eq!(sanitize_key("a.b"), "a_b");
        assert!(matches!(sanitize_key("email"), Cow::Borrowed("email")));
    }

    #[test]
    fn sanitizes_nested_keys_only() {
        let input = json!({
            "name": "$admin",
            "email": {"$ne": null},
            "tags": [{"a.b": 1}]
        });
        let out = sanitize_value(input);
        assert_eq!(
            out,
            json!({
                "name": "$admin",
                "email": {"_ne": null},
                "tags": [{"a_b": 1}]
            })
        );
    }
}
