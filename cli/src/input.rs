//! Converting operator text to field values and back.

use crudify::{FieldDescriptor, FieldType};
use serde_json::{Number, Value};

/// Parse `raw` as a value of the field's type. The error is shown to the operator.
pub fn parse_field(field: &FieldDescriptor, raw: &str) -> Result<Value, String> {
    let raw = raw.trim();
    let value = match &field.kind {
        FieldType::String(_) => Value::String(raw.to_string()),
        FieldType::Number(_) => raw
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number))
            .ok_or_else(|| format!("{} expects a number", field.name))?,
        FieldType::Boolean => crate::prompt::parse_yes_no(raw)
            .map(Value::Bool)
            .ok_or_else(|| format!("{} expects yes or no", field.name))?,
        FieldType::Date => Value::String(raw.to_string()),
        FieldType::Array | FieldType::Object | FieldType::Unknown(_) => {
            serde_json::from_str(raw).map_err(|e| format!("{} expects JSON: {}", field.name, e))?
        }
    };
    if !field.kind.accepts(&value) {
        return Err(format!("{} expects a {}", field.name, field.kind.type_name()));
    }
    Ok(value)
}

/// Editable text form of a stored value: strings unquoted, everything else as JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Menu label for a record: its `name` (or first string field) and id.
pub fn record_label(record: &Value) -> String {
    let id = record.get("id").and_then(Value::as_str).unwrap_or("?");
    let title = record
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| {
            record.as_object().and_then(|m| {
                m.iter()
                    .filter(|(k, _)| !matches!(k.as_str(), "id" | "createdAt" | "updatedAt"))
                    .find_map(|(_, v)| v.as_str())
            })
        });
    match title {
        Some(t) => format!("{} (id: {})", t, id),
        None => format!("id: {}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(kind: FieldType) -> FieldDescriptor {
        FieldDescriptor::new("f", kind)
    }

    #[test]
    fn parses_by_type() {
        assert_eq!(parse_field(&field(FieldType::number()), " 42 ").unwrap(), json!(42));
        assert_eq!(parse_field(&field(FieldType::number()), "2.5").unwrap(), json!(2.5));
        assert!(parse_field(&field(FieldType::number()), "lots").is_err());
        assert_eq!(parse_field(&field(FieldType::Boolean), "yes").unwrap(), json!(true));
        assert_eq!(parse_field(&field(FieldType::Array), "[1, 2]").unwrap(), json!([1, 2]));
        assert!(parse_field(&field(FieldType::Array), "{}").is_err());
        assert!(parse_field(&field(FieldType::Date), "tomorrow").is_err());
        assert_eq!(parse_field(&field(FieldType::string()), "  Jo ").unwrap(), json!("Jo"));
    }

    #[test]
    fn labels_prefer_name() {
        let rec = json!({"id": "abc", "name": "John Doe", "email": "j@example.com"});
        assert_eq!(record_label(&rec), "John Doe (id: abc)");
        let rec = json!({"id": "abc", "price": 3});
        assert_eq!(record_label(&rec), "id: abc");
        assert_eq!(display(&json!("x")), "x");
        assert_eq!(display(&json!(true)), "true");
    }
}
