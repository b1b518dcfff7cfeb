//! Process settings read from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use crate::rate_limit::{RateLimitConfig, DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW_SECS};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PAGE_LIMIT: u64 = 10;
pub const DEFAULT_MAX_LIMIT: u64 = 50;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String, schema: String },
    Memory,
}

/// List-endpoint tuning shared by every generated resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListOptions {
    pub default_limit: u64,
    /// Larger requested limits are clamped to this value.
    pub max_limit: u64,
    /// When set, only these field names act as filters.
    pub filter_allow: Option<Vec<String>>,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            filter_allow: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub store: StoreBackend,
    pub port: u16,
    pub resources_path: Option<PathBuf>,
    pub schema_cache_path: PathBuf,
    pub list: ListOptions,
    /// Fill absent required fields with synthesized values on create.
    pub synthesize_missing: bool,
    pub body_limit: usize,
    /// `None` when `RATE_LIMIT_MAX` is 0.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build settings from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).map(|s| s.trim()).filter(|s| !s.is_empty());

        let store = match get("STORE").unwrap_or("postgres").to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres {
                database_url: get("DATABASE_URL")
                    .ok_or(ConfigError::MissingEnv("DATABASE_URL"))?
                    .to_string(),
                schema: get("CRUDIFY_SCHEMA").unwrap_or("crudify").to_string(),
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidEnv {
                    name: "STORE",
                    value: other.to_string(),
                })
            }
        };

        let default_limit = parse_or(get("PAGINATION_DEFAULT_LIMIT"), "PAGINATION_DEFAULT_LIMIT", DEFAULT_PAGE_LIMIT)?;
        let max_limit = parse_or(get("PAGINATION_MAX_LIMIT"), "PAGINATION_MAX_LIMIT", DEFAULT_MAX_LIMIT)?;
        if default_limit == 0 || max_limit < default_limit {
            return Err(ConfigError::Validation(format!(
                "pagination limits must satisfy 1 <= default ({}) <= max ({})",
                default_limit, max_limit
            )));
        }
        let filter_allow = get("FILTER_ALLOW").map(|s| {
            s.split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect()
        });

        let rate_limit_max = parse_or(get("RATE_LIMIT_MAX"), "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX)?;
        let window_secs = parse_or(
            get("RATE_LIMIT_WINDOW_SECS"),
            "RATE_LIMIT_WINDOW_SECS",
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        )?;
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .filter(|w| *w > chrono::Duration::zero())
            .ok_or_else(|| ConfigError::InvalidEnv {
                name: "RATE_LIMIT_WINDOW_SECS",
                value: window_secs.to_string(),
            })?;
        let rate_limit = (rate_limit_max > 0).then_some(RateLimitConfig {
            max_requests: rate_limit_max,
            window,
        });

        Ok(Settings {
            store,
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
            resources_path: get("CRUDIFY_RESOURCES").map(PathBuf::from),
            schema_cache_path: PathBuf::from(get("SCHEMA_CACHE_PATH").unwrap_or("schema-cache.json")),
            list: ListOptions {
                default_limit,
                max_limit,
                filter_allow,
            },
            synthesize_missing: parse_or(get("SYNTHESIZE_MISSING"), "SYNTHESIZE_MISSING", false)?,
            body_limit: parse_or(get("BODY_LIMIT_BYTES"), "BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
            rate_limit,
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(s) => s.parse().map_err(|_| ConfigError::InvalidEnv {
            name,
            value: s.to_string(),
        }),
    }
}
