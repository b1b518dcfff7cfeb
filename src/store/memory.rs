//! In-process store used by tests and `STORE=memory` demos. Enforces unique fields like an index would.

use super::{display_value, Document, DocumentStore};
use crate::config::ResourceDescriptor;
use crate::error::StoreError;
use crate::query::{value_eq, Filter};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct Collection {
    docs: Vec<Document>,
    unique: Vec<String>,
}

impl Collection {
    fn check_unique(&self, fields: &Map<String, Value>, exclude: Option<Uuid>) -> Result<(), StoreError> {
        for name in &self.unique {
            let Some(value) = fields.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = self
                .docs
                .iter()
                .filter(|d| Some(d.id) != exclude)
                .any(|d| d.fields.get(name).map(|v| value_eq(v, value)).unwrap_or(false));
            if taken {
                return Err(StoreError::Duplicate {
                    field: name.clone(),
                    value: display_value(Some(value)),
                });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, descriptor: &ResourceDescriptor) -> Result<(), StoreError> {
        let mut guard = self.write()?;
        let collection = guard.entry(descriptor.path()).or_default();
        collection.unique = descriptor
            .fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| f.name.clone())
            .collect();
        Ok(())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.read()?;
        Ok(guard
            .get(collection)
            .map(|c| c.docs.iter().filter(|d| filter.matches(&d.fields)).count() as u64)
            .unwrap_or(0))
    }

    async fn find(&self, collection: &str, filter: &Filter, skip: u64, limit: u64) -> Result<Vec<Document>, StoreError> {
        let guard = self.read()?;
        let Some(c) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(c.docs
            .iter()
            .filter(|d| filter.matches(&d.fields))
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let guard = self.read()?;
        Ok(guard
            .get(collection)
            .and_then(|c| c.docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> Result<Document, StoreError> {
        let mut guard = self.write()?;
        let c = guard.entry(collection.to_string()).or_default();
        c.check_unique(&fields, None)?;
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4(),
            fields,
            created_at: now,
            updated_at: now,
        };
        c.docs.push(doc.clone());
        Ok(doc)
    }

    async fn replace(&self, collection: &str, id: Uuid, fields: Map<String, Value>) -> Result<Option<Document>, StoreError> {
        let mut guard = self.write()?;
        let Some(c) = guard.get_mut(collection) else {
            return Ok(None);
        };
        if !c.docs.iter().any(|d| d.id == id) {
            return Ok(None);
        }
        c.check_unique(&fields, Some(id))?;
        let Some(doc) = c.docs.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        doc.fields = fields;
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let mut guard = self.write()?;
        let Some(c) = guard.get_mut(collection) else {
            return Ok(None);
        };
        Ok(c.docs.iter().position(|d| d.id == id).map(|i| c.docs.remove(i)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldDescriptor, FieldType};
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    async fn store_with_companies() -> MemoryStore {
        let store = MemoryStore::new();
        let descriptor = ResourceDescriptor::new(
            "Company",
            vec![FieldDescriptor::new("name", FieldType::string()).required().unique()],
        );
        store.ensure_collection(&descriptor).await.unwrap();
        store
    }

    #[tokio::test]
    async fn insert_find_and_delete() {
        let store = store_with_companies().await;
        let a = store.insert("companies", fields(json!({"name": "Acme"}))).await.unwrap();
        store.insert("companies", fields(json!({"name": "Globex"}))).await.unwrap();

        assert_eq!(store.count("companies", &Filter::new()).await.unwrap(), 2);
        let page = store.find("companies", &Filter::new(), 1, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].fields["name"], "Globex");

        let removed = store.delete("companies", a.id).await.unwrap().unwrap();
        assert_eq!(removed.id, a.id);
        assert!(store.delete("companies", a.id).await.unwrap().is_none());
        assert!(store.find_by_id("companies", a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_fields_are_enforced() {
        let store = store_with_companies().await;
        let a = store.insert("companies", fields(json!({"name": "Acme"}))).await.unwrap();
        let err = store.insert("companies", fields(json!({"name": "Acme"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "name"));

        let b = store.insert("companies", fields(json!({"name": "Initech"}))).await.unwrap();
        assert!(store.replace("companies", b.id, fields(json!({"name": "Acme"}))).await.is_err());
        // Re-saving a document with its own value is not a conflict.
        assert!(store.replace("companies", a.id, fields(json!({"name": "Acme"}))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_collection_reads_as_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.count("ghosts", &Filter::new()).await.unwrap(), 0);
        assert!(store.replace("ghosts", Uuid::new_v4(), Map::new()).await.unwrap().is_none());
    }
}
