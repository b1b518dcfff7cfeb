//! Resource descriptors: field-level schema governing validation, filtering and synthesis.

use crate::config::types::{RawField, RawResource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StringRules {
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    /// Enumerated values; empty means unrestricted.
    pub allowed: Vec<String>,
    pub pattern: Option<String>,
    pub trim: bool,
    pub lowercase: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumberRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Field type with its constraint payload.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    String(StringRules),
    Number(NumberRules),
    Boolean,
    /// RFC 3339 timestamp string.
    Date,
    Array,
    Object,
    /// Type name not understood by this build (e.g. read back from an old schema cache).
    Unknown(String),
}

impl FieldType {
    pub fn string() -> Self {
        FieldType::String(StringRules::default())
    }

    pub fn number() -> Self {
        FieldType::Number(NumberRules::default())
    }

    pub fn type_name(&self) -> &str {
        match self {
            FieldType::String(_) => "string",
            FieldType::Number(_) => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Unknown(name) => name,
        }
    }

    /// Whether `value` has this type's JSON shape. Constraints are not checked here.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String(_) => value.is_string(),
            FieldType::Number(_) => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Date => value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Unknown(_) => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldType,
    pub required: bool,
    pub unique: bool,
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: &str, kind: FieldType) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            kind,
            required: false,
            unique: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

impl From<RawField> for FieldDescriptor {
    fn from(raw: RawField) -> Self {
        let kind = match raw.type_.to_lowercase().as_str() {
            "string" => FieldType::String(StringRules {
                min_length: raw.min_length,
                max_length: raw.max_length,
                allowed: raw.allowed,
                pattern: raw.pattern,
                trim: raw.trim,
                lowercase: raw.lowercase,
            }),
            "number" => FieldType::Number(NumberRules {
                min: raw.min,
                max: raw.max,
            }),
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            _ => FieldType::Unknown(raw.type_),
        };
        FieldDescriptor {
            name: raw.name,
            kind,
            required: raw.required,
            unique: raw.unique,
            default: raw.default,
        }
    }
}

impl From<FieldDescriptor> for RawField {
    fn from(field: FieldDescriptor) -> Self {
        let mut raw = RawField {
            name: field.name,
            type_: field.kind.type_name().to_string(),
            required: field.required,
            unique: field.unique,
            default: field.default,
            ..RawField::default()
        };
        match field.kind {
            FieldType::String(rules) => {
                raw.min_length = rules.min_length;
                raw.max_length = rules.max_length;
                raw.allowed = rules.allowed;
                raw.pattern = rules.pattern;
                raw.trim = rules.trim;
                raw.lowercase = rules.lowercase;
            }
            FieldType::Number(rules) => {
                raw.min = rules.min;
                raw.max = rules.max;
            }
            _ => {}
        }
        raw
    }
}

/// Ordered field list plus a resource name. Immutable once registered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawResource", into = "RawResource")]
pub struct ResourceDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(name: &str, fields: Vec<FieldDescriptor>) -> Self {
        ResourceDescriptor {
            name: name.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// URL path segment: lowercase plural of the resource name ("Company" -> "companies").
    pub fn path(&self) -> String {
        pluralize(&self.name.to_lowercase())
    }
}

impl From<RawResource> for ResourceDescriptor {
    fn from(raw: RawResource) -> Self {
        ResourceDescriptor {
            name: raw.name,
            fields: raw.fields.into_iter().map(FieldDescriptor::from).collect(),
        }
    }
}

impl From<ResourceDescriptor> for RawResource {
    fn from(resource: ResourceDescriptor) -> Self {
        RawResource {
            name: resource.name,
            fields: resource.fields.into_iter().map(RawField::from).collect(),
        }
    }
}

fn pluralize(word: &str) -> String {
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if let Some(stem) = word.strip_suffix("ie") {
        return format!("{}ies", stem);
    }
    format!("{}s", word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_is_plural_lowercase() {
        let path = |name: &str| ResourceDescriptor::new(name, vec![]).path();
        assert_eq!(path("User"), "users");
        assert_eq!(path("Company"), "companies");
        assert_eq!(path("SubCategorie"), "subcategories");
        assert_eq!(path("Address"), "addresses");
        assert_eq!(path("Key"), "keys");
    }

    #[test]
    fn raw_field_maps_to_tagged_type() {
        let field: FieldDescriptor = serde_json::from_value(json!({
            "name": "role",
            "type": "String",
            "enum": ["admin", "user"],
            "default": "user"
        }))
        .unwrap();
        assert_eq!(field.default, Some(json!("user")));
        match &field.kind {
            FieldType::String(rules) => assert_eq!(rules.allowed, vec!["admin", "user"]),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn unrecognized_type_is_kept_by_name() {
        let field: FieldDescriptor =
            serde_json::from_value(json!({"name": "owner", "type": "ObjectId", "required": true})).unwrap();
        assert_eq!(field.kind, FieldType::Unknown("ObjectId".into()));
        let back = serde_json::to_value(&field).unwrap();
        assert_eq!(back["type"], "ObjectId");
        assert_eq!(back["required"], true);
    }

    #[test]
    fn accepts_checks_shape_only() {
        assert!(FieldType::Date.accepts(&json!("2030-01-01T00:00:00Z")));
        assert!(!FieldType::Date.accepts(&json!("tomorrow")));
        assert!(FieldType::number().accepts(&json!(-5)));
        assert!(!FieldType::Boolean.accepts(&json!("true")));
        assert!(FieldType::Array.accepts(&json!([])));
    }
}
