//! Resource registry: the static registration table built at startup.

use crate::config::{validate, FieldDescriptor, FieldType, NumberRules, ResourceDescriptor, StringRules};
use crate::error::ConfigError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct Registry {
    resources: Vec<Arc<ResourceDescriptor>>,
    by_path: HashMap<String, usize>,
}

impl Registry {
    /// Validates and indexes `resources`. Registration order is kept for listing and routing.
    pub fn new(resources: Vec<ResourceDescriptor>) -> Result<Self, ConfigError> {
        validate(&resources)?;
        let resources: Vec<_> = resources.into_iter().map(Arc::new).collect();
        let by_path = resources.iter().enumerate().map(|(i, r)| (r.path(), i)).collect();
        Ok(Registry { resources, by_path })
    }

    /// The built-in table, checked by the same validator as loaded resources.
    pub fn builtin() -> Self {
        Registry::new(builtin_resources()).expect("built-in resources are valid")
    }

    pub fn resources(&self) -> &[Arc<ResourceDescriptor>] {
        &self.resources
    }

    pub fn by_path(&self, path: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.by_path.get(path).map(|&i| &self.resources[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<ResourceDescriptor>> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn text() -> FieldType {
    FieldType::String(StringRules {
        trim: true,
        ..StringRules::default()
    })
}

fn non_negative() -> FieldType {
    FieldType::Number(NumberRules {
        min: Some(0.0),
        max: None,
    })
}

fn catalog_item(name: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(
        name,
        vec![
            FieldDescriptor::new("name", text()).required(),
            FieldDescriptor::new("price", non_negative()).required(),
            FieldDescriptor::new("stock", non_negative()).required(),
            FieldDescriptor::new("category", text()).required(),
            FieldDescriptor::new("subCategory", FieldType::Array),
            FieldDescriptor::new("description", text()).required(),
        ],
    )
}

/// Models served when no resource file is configured.
pub fn builtin_resources() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor::new(
            "User",
            vec![
                FieldDescriptor::new("name", text()).required(),
                FieldDescriptor::new(
                    "email",
                    FieldType::String(StringRules {
                        lowercase: true,
                        trim: true,
                        ..StringRules::default()
                    }),
                )
                .required()
                .unique(),
                FieldDescriptor::new(
                    "age",
                    FieldType::Number(NumberRules {
                        min: Some(0.0),
                        max: Some(120.0),
                    }),
                )
                .required(),
                FieldDescriptor::new("address", text()).required(),
                FieldDescriptor::new(
                    "password",
                    FieldType::String(StringRules {
                        min_length: Some(8),
                        ..StringRules::default()
                    }),
                )
                .required(),
                FieldDescriptor::new(
                    "role",
                    FieldType::String(StringRules {
                        allowed: vec!["admin".into(), "user".into(), "moderator".into()],
                        ..StringRules::default()
                    }),
                )
                .default_value(json!("user")),
                FieldDescriptor::new("isActive", FieldType::Boolean).default_value(json!(true)),
            ],
        ),
        catalog_item("Product"),
        ResourceDescriptor::new(
            "Company",
            vec![
                FieldDescriptor::new("name", text()).required().unique(),
                FieldDescriptor::new("address", text()).required(),
            ],
        ),
        ResourceDescriptor::new(
            "SubCategorie",
            vec![
                FieldDescriptor::new("name", text()).required().unique(),
                FieldDescriptor::new("parentCategory", FieldType::string()).required(),
            ],
        ),
        catalog_item("Card"),
        ResourceDescriptor::new(
            "Transporter",
            vec![
                FieldDescriptor::new("name", text()).required(),
                FieldDescriptor::new("email", text()).required(),
                FieldDescriptor::new("password", text()).required(),
                FieldDescriptor::new("role", text()).required(),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resources_are_valid() {
        validate(&builtin_resources()).unwrap();
        let registry = Registry::builtin();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.by_path("users").unwrap().name, "User");
        assert_eq!(registry.by_path("subcategories").unwrap().name, "SubCategorie");
        assert!(registry.by_name("Company").is_some());
        assert!(registry.by_path("user").is_none());
    }

    #[test]
    fn builtin_matches_validated_construction() {
        let checked = Registry::new(builtin_resources()).unwrap();
        let builtin = Registry::builtin();
        let paths = |r: &Registry| r.resources().iter().map(|d| d.path()).collect::<Vec<_>>();
        assert_eq!(paths(&builtin), paths(&checked));
        for path in paths(&checked) {
            assert_eq!(builtin.by_path(&path).unwrap().name, checked.by_path(&path).unwrap().name);
        }
    }

    #[test]
    fn new_rejects_invalid_table() {
        let twice = vec![ResourceDescriptor::new("User", vec![]), ResourceDescriptor::new("User", vec![])];
        assert!(Registry::new(twice).is_err());
    }
}
