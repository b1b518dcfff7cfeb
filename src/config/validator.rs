//! Descriptor validation: unique names, unique paths, well-formed constraints.

use crate::config::{FieldType, ResourceDescriptor};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Keys assigned by the store on every record; descriptors may not declare them.
pub const RESERVED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

pub fn validate(resources: &[ResourceDescriptor]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut paths = HashSet::new();

    for resource in resources {
        if resource.name.trim().is_empty() {
            return Err(ConfigError::Validation("resource name must not be empty".into()));
        }
        if !names.insert(resource.name.as_str()) {
            return Err(ConfigError::DuplicateResource(resource.name.clone()));
        }
        let path = resource.path();
        if !paths.insert(path.clone()) {
            return Err(ConfigError::DuplicatePathSegment(path));
        }

        let mut fields = HashSet::new();
        for field in &resource.fields {
            if !fields.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    resource: resource.name.clone(),
                    field: field.name.clone(),
                });
            }
            if RESERVED_FIELDS.contains(&field.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}.{} is assigned by the store and cannot be declared",
                    resource.name, field.name
                )));
            }
            if let FieldType::String(rules) = &field.kind {
                if let Some(pattern) = &rules.pattern {
                    regex::Regex::new(pattern).map_err(|e| {
                        ConfigError::Validation(format!("{}.{}: invalid pattern: {}", resource.name, field.name, e))
                    })?;
                }
            }
            if let Some(default) = &field.default {
                if !field.kind.accepts(default) {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: default does not match type {}",
                        resource.name,
                        field.name,
                        field.kind.type_name()
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldDescriptor;
    use serde_json::json;

    #[test]
    fn rejects_duplicate_paths() {
        let a = ResourceDescriptor::new("Box", vec![]);
        let b = ResourceDescriptor::new("box", vec![]);
        assert!(matches!(validate(&[a, b]), Err(ConfigError::DuplicatePathSegment(p)) if p == "boxes"));
    }

    #[test]
    fn rejects_duplicate_fields_and_reserved_names() {
        let dup = ResourceDescriptor::new(
            "User",
            vec![
                FieldDescriptor::new("name", FieldType::string()),
                FieldDescriptor::new("name", FieldType::number()),
            ],
        );
        assert!(matches!(validate(&[dup]), Err(ConfigError::DuplicateField { .. })));

        let reserved = ResourceDescriptor::new("User", vec![FieldDescriptor::new("id", FieldType::string())]);
        assert!(validate(&[reserved]).is_err());
    }

    #[test]
    fn rejects_default_of_wrong_type() {
        let r = ResourceDescriptor::new(
            "User",
            vec![FieldDescriptor::new("isActive", FieldType::Boolean).default_value(json!("yes"))],
        );
        assert!(validate(&[r]).is_err());
    }
}
