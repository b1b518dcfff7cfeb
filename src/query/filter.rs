//! Equality filter over top-level record fields.

use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    entries: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.push(field.into(), value);
        self
    }

    pub fn push(&mut self, field: String, value: Value) {
        self.entries.push((field, value));
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every entry equals the record's field of the same name.
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.entries
            .iter()
            .all(|(k, v)| fields.get(k).map(|actual| value_eq(actual, v)).unwrap_or(false))
    }

    /// JSON object form, used for JSONB containment (`doc @> filter`).
    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.iter().cloned().collect())
    }
}

pub(crate) fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}
