//! Record validation and normalization from resource descriptors.

use crate::config::{FieldDescriptor, FieldType, NumberRules, ResourceDescriptor, StringRules};
use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

pub struct RecordValidator;

impl RecordValidator {
    /// Keep only declared fields (strict mode); undeclared keys are dropped silently.
    pub fn strip_unknown(fields: Map<String, Value>, descriptor: &ResourceDescriptor) -> Map<String, Value> {
        fields
            .into_iter()
            .filter(|(k, _)| descriptor.field(k).is_some())
            .collect()
    }

    /// Fill absent fields that declare a `default`.
    pub fn apply_defaults(fields: &mut Map<String, Value>, descriptor: &ResourceDescriptor) {
        for field in &descriptor.fields {
            if let Some(default) = &field.default {
                if !fields.contains_key(&field.name) {
                    fields.insert(field.name.clone(), default.clone());
                }
            }
        }
    }

    /// Apply `trim` / `lowercase` string transforms in place.
    pub fn normalize(fields: &mut Map<String, Value>, descriptor: &ResourceDescriptor) {
        for field in &descriptor.fields {
            let FieldType::String(rules) = &field.kind else {
                continue;
            };
            if let Some(Value::String(s)) = fields.get_mut(&field.name) {
                if rules.trim {
                    *s = s.trim().to_string();
                }
                if rules.lowercase {
                    *s = s.to_lowercase();
                }
            }
        }
    }

    /// Validate a complete record. Fields are checked in descriptor order and the first
    /// failing constraint is reported.
    pub fn validate(fields: &Map<String, Value>, descriptor: &ResourceDescriptor) -> Result<(), AppError> {
        for field in &descriptor.fields {
            check_field(field, fields.get(&field.name)).map_err(|msg| {
                AppError::Validation(format!("{} validation failed: {}", descriptor.name, msg))
            })?;
        }
        Ok(())
    }
}

fn check_field(field: &FieldDescriptor, value: Option<&Value>) -> Result<(), String> {
    let name = &field.name;
    let value = match value {
        None | Some(Value::Null) if field.required => return Err(format!("{} is required", name)),
        None | Some(Value::Null) => return Ok(()),
        Some(v) => v,
    };
    if !field.kind.accepts(value) {
        return Err(format!(
            "{} must be of type {}, got {}",
            name,
            field.kind.type_name(),
            json_type_name(value)
        ));
    }
    match &field.kind {
        FieldType::String(rules) => check_string(name, value.as_str().unwrap_or_default(), rules),
        FieldType::Number(rules) => check_number(name, value.as_f64().unwrap_or_default(), rules),
        _ => Ok(()),
    }
}

fn check_string(name: &str, s: &str, rules: &StringRules) -> Result<(), String> {
    let len = s.chars().count();
    if let Some(min) = rules.min_length {
        if len < min as usize {
            return Err(format!("{} must be at least {} characters", name, min));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max as usize {
            return Err(format!("{} must be at most {} characters", name, max));
        }
    }
    if !rules.allowed.is_empty() && !rules.allowed.iter().any(|a| a == s) {
        return Err(format!(
            "'{}' is not a valid value for {} (expected one of: {})",
            s,
            name,
            rules.allowed.join(", ")
        ));
    }
    if let Some(pattern) = &rules.pattern {
        let re = compiled(pattern).map_err(|_| format!("invalid pattern for {}", name))?;
        if !re.is_match(s) {
            return Err(format!("{} does not match required pattern", name));
        }
    }
    Ok(())
}

/// Compiled patterns keyed by source. Descriptors are fixed at startup, so the map stays small.
fn patterns() -> &'static RwLock<HashMap<String, Regex>> {
    static PATTERNS: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();
    PATTERNS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn compiled(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(re) = patterns().read().unwrap_or_else(|e| e.into_inner()).get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    patterns()
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(pattern.to_string(), re.clone());
    Ok(re)
}

fn check_number(name: &str, n: f64, rules: &NumberRules) -> Result<(), String> {
    if let Some(min) = rules.min {
        if n < min {
            return Err(format!("{} must be at least {}", name, min));
        }
    }
    if let Some(max) = rules.max {
        if n > max {
            return Err(format!("{} must be at most {}", name, max));
        }
    }
    Ok(())
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
