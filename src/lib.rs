//! Crudify: descriptor-driven CRUD routes over a document store.

pub mod config;
pub mod error;
pub mod query;
pub mod rate_limit;
pub mod registry;
pub mod response;
pub mod routes;
pub mod sanitize;
pub mod schema_cache;
pub mod service;
pub mod state;
pub mod store;
pub mod synth;

pub use config::{load_resources, FieldDescriptor, FieldType, ResourceDescriptor, Settings, StoreBackend};
pub use error::{AppError, ConfigError, ErrorBody, StoreError};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use registry::Registry;
pub use response::{Deleted, Page};
pub use routes::{api_routes, app, crudify, AppOptions};
pub use schema_cache::{SchemaCache, SchemaDiff};
pub use service::CrudService;
pub use state::AppState;
pub use store::{DocumentStore, MemoryStore, PgStore};
pub use synth::synthesize;
