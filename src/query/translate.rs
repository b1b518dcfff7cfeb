//! Query translator: raw query parameters -> equality filter + page/limit.

use crate::config::{FieldType, ListOptions, ResourceDescriptor};
use crate::error::AppError;
use crate::query::Filter;
use crate::sanitize::sanitize_key;
use serde_json::{Number, Value};
use std::collections::HashMap;

/// Largest offset handed to a store; the Postgres driver binds offsets as `i64`.
pub const MAX_SKIP: u64 = i64::MAX as u64;

#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub page: u64,
    pub limit: u64,
}

impl ListQuery {
    /// Documents before this page. Saturates at [`MAX_SKIP`] for huge page numbers, which
    /// then yield an empty page instead of overflowing.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit).min(MAX_SKIP)
    }

    pub fn total_pages(&self, total_documents: u64) -> u64 {
        total_documents.div_ceil(self.limit)
    }
}

/// Keys naming a descriptor field become filter entries (in descriptor order); other keys are
/// ignored. `page` and `limit` must be positive integers.
pub fn translate(
    raw: &HashMap<String, String>,
    descriptor: &ResourceDescriptor,
    options: &ListOptions,
) -> Result<ListQuery, AppError> {
    let params: HashMap<String, &str> = raw
        .iter()
        .map(|(k, v)| (sanitize_key(k).into_owned(), v.as_str()))
        .collect();

    let page = match params.get("page") {
        Some(v) => parse_positive("page", v)?,
        None => 1,
    };
    let limit = match params.get("limit") {
        Some(v) => parse_positive("limit", v)?.min(options.max_limit),
        None => options.default_limit,
    };

    let mut filter = Filter::new();
    for field in &descriptor.fields {
        if let Some(allow) = &options.filter_allow {
            if !allow.iter().any(|a| a == &field.name) {
                continue;
            }
        }
        if let Some(raw_value) = params.get(field.name.as_str()) {
            filter.push(field.name.clone(), coerce(&field.kind, raw_value));
        }
    }

    Ok(ListQuery { filter, page, limit })
}

fn parse_positive(name: &str, value: &str) -> Result<u64, AppError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(AppError::Validation(format!(
            "{} must be a positive integer, got '{}'",
            name, value
        ))),
    }
}

/// Typed filter value for a field; falls back to the raw string when it does not parse.
fn coerce(kind: &FieldType, s: &str) -> Value {
    match kind {
        FieldType::Number(_) => {
            if let Ok(n) = s.parse::<i64>() {
                return Value::Number(n.into());
            }
            if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
                return Value::Number(n);
            }
        }
        FieldType::Boolean => {
            if s.eq_ignore_ascii_case("true") {
                return Value::Bool(true);
            }
            if s.eq_ignore_ascii_case("false") {
                return Value::Bool(false);
            }
        }
        FieldType::String(rules) => {
            let mut v = if rules.trim { s.trim().to_string() } else { s.to_string() };
            if rules.lowercase {
                v = v.to_lowercase();
            }
            return Value::String(v);
        }
        _ => {}
    }
    Value::String(s.to_string())
}
