//! Document store seam. Every handler re-reads or re-persists through a [`DocumentStore`];
//! nothing above this layer keeps an authoritative copy of a record.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::ResourceDescriptor;
use crate::error::StoreError;
use crate::query::Filter;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored record: user fields plus the store-assigned id and timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// JSON shape returned to clients: `{"id", ...fields, "createdAt", "updatedAt"}`.
    pub fn into_record(self) -> Value {
        let mut out = Map::with_capacity(self.fields.len() + 3);
        out.insert("id".into(), Value::String(self.id.to_string()));
        out.extend(self.fields);
        out.insert(
            "createdAt".into(),
            Value::String(self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        out.insert(
            "updatedAt".into(),
            Value::String(self.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Value::Object(out)
    }
}

/// Collections are addressed by the resource path (`users`, `products`, ...).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Prepare storage for a resource, including unique indexes for `unique` fields.
    async fn ensure_collection(&self, descriptor: &ResourceDescriptor) -> Result<(), StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Documents matching `filter` in insertion order, after skipping `skip`, at most `limit`.
    async fn find(&self, collection: &str, filter: &Filter, skip: u64, limit: u64) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> Result<Document, StoreError>;

    /// Replace the fields of an existing document. `None` when `id` does not exist.
    async fn replace(&self, collection: &str, id: Uuid, fields: Map<String, Value>) -> Result<Option<Document>, StoreError>;

    /// Remove a document, returning it. `None` when `id` does not exist.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Display form of a JSON value for duplicate-key messages.
pub(crate) fn display_value(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_places_id_first_and_timestamps_last() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let doc = Document {
            id: Uuid::nil(),
            fields: json!({"name": "John Doe"}).as_object().cloned().unwrap(),
            created_at: at,
            updated_at: at,
        };
        let record = doc.into_record();
        assert_eq!(record["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(record["name"], "John Doe");
        assert_eq!(record["createdAt"], "2024-05-01T10:00:00.000Z");
    }
}
