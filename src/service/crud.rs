//! Generic CRUD over one resource: the five operations the route generator exposes.

use crate::config::{ListOptions, ResourceDescriptor};
use crate::error::AppError;
use crate::query::translate;
use crate::response::{Deleted, Page};
use crate::sanitize::sanitize_value;
use crate::service::RecordValidator;
use crate::store::DocumentStore;
use crate::synth::synthesize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// CRUD operations bound to one descriptor. Holds no record state; every call goes to the store.
pub struct CrudService {
    descriptor: Arc<ResourceDescriptor>,
    collection: String,
    store: Arc<dyn DocumentStore>,
    options: ListOptions,
    synthesize_missing: bool,
}

impl CrudService {
    pub fn new(descriptor: Arc<ResourceDescriptor>, store: Arc<dyn DocumentStore>) -> Self {
        CrudService {
            collection: descriptor.path(),
            descriptor,
            store,
            options: ListOptions::default(),
            synthesize_missing: false,
        }
    }

    pub fn with_options(mut self, options: ListOptions) -> Self {
        self.options = options;
        self
    }

    /// Fill absent required fields with synthesized values on create.
    pub fn with_synthesize_missing(mut self, enabled: bool) -> Self {
        self.synthesize_missing = enabled;
        self
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Paginated, filtered list. Count and fetch run concurrently and are not snapshot-consistent.
    pub async fn list(&self, raw: &HashMap<String, String>) -> Result<Page<Value>, AppError> {
        let query = translate(raw, &self.descriptor, &self.options)?;
        let (total, docs) = tokio::try_join!(
            self.store.count(&self.collection, &query.filter),
            self.store.find(&self.collection, &query.filter, query.skip(), query.limit),
        )?;
        Ok(Page {
            total_documents: total,
            total_pages: query.total_pages(total),
            current_page: query.page,
            documents: docs.into_iter().map(|d| d.into_record()).collect(),
        })
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Value, AppError> {
        let id = self.parse_id(id)?;
        let doc = self
            .store
            .find_by_id(&self.collection, id)
            .await?
            .ok_or_else(|| self.not_found())?;
        Ok(doc.into_record())
    }

    pub async fn create(&self, body: Value) -> Result<Value, AppError> {
        let mut fields = RecordValidator::strip_unknown(self.body_to_map(body)?, &self.descriptor);
        RecordValidator::apply_defaults(&mut fields, &self.descriptor);
        if self.synthesize_missing {
            fields = synthesize(&fields, &self.descriptor, &mut StdRng::from_entropy());
        }
        RecordValidator::normalize(&mut fields, &self.descriptor);
        RecordValidator::validate(&fields, &self.descriptor)?;
        let doc = self.store.insert(&self.collection, fields).await?;
        tracing::info!(resource = %self.descriptor.name, id = %doc.id, "created");
        Ok(doc.into_record())
    }

    /// Partial update: body fields are merged over the stored ones and the merged record is re-validated.
    pub async fn update(&self, id: &str, body: Value) -> Result<Value, AppError> {
        let id = self.parse_id(id)?;
        let changes = RecordValidator::strip_unknown(self.body_to_map(body)?, &self.descriptor);
        let existing = self
            .store
            .find_by_id(&self.collection, id)
            .await?
            .ok_or_else(|| self.not_found())?;
        let mut merged = existing.fields;
        merged.extend(changes);
        RecordValidator::normalize(&mut merged, &self.descriptor);
        RecordValidator::validate(&merged, &self.descriptor)?;
        let doc = self
            .store
            .replace(&self.collection, id, merged)
            .await?
            .ok_or_else(|| self.not_found())?;
        tracing::info!(resource = %self.descriptor.name, %id, "updated");
        Ok(doc.into_record())
    }

    pub async fn delete(&self, id: &str) -> Result<Deleted, AppError> {
        let id = self.parse_id(id)?;
        let doc = self
            .store
            .delete(&self.collection, id)
            .await?
            .ok_or_else(|| self.not_found())?;
        tracing::info!(resource = %self.descriptor.name, %id, "deleted");
        Ok(Deleted {
            message: format!("{} deleted", self.descriptor.name),
            record: doc.into_record(),
        })
    }

    fn parse_id(&self, id: &str) -> Result<Uuid, AppError> {
        Uuid::parse_str(id.trim())
            .map_err(|_| AppError::Validation(format!("invalid {} id: '{}'", self.descriptor.name, id)))
    }

    fn body_to_map(&self, body: Value) -> Result<Map<String, Value>, AppError> {
        match sanitize_value(body) {
            Value::Object(m) => Ok(m),
            _ => Err(AppError::Validation("body must be a JSON object".into())),
        }
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(self.descriptor.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn service(path: &str) -> CrudService {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let descriptor = Registry::builtin().by_path(path).unwrap().clone();
        store.ensure_collection(&descriptor).await.unwrap();
        CrudService::new(descriptor, store)
    }

    fn user(n: usize) -> Value {
        json!({
            "name": format!("User {}", n),
            "email": format!("user{}@example.com", n),
            "age": 20 + n,
            "address": "1 Main St",
            "password": "securePassword123"
        })
    }

    fn q(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let svc = service("users").await;
        let created = svc.create(user(1)).await.unwrap();
        let id = created["id"].as_str().unwrap();
        let fetched = svc.get_by_id(id).await.unwrap();
        assert_eq!(fetched, created);
        for (k, v) in user(1).as_object().unwrap() {
            assert_eq!(&fetched[k], v, "{}", k);
        }
        assert_eq!(fetched["role"], "user");
        assert!(fetched["createdAt"].is_string());
    }

    #[tokio::test]
    async fn pagination_metadata() {
        let svc = service("users").await;
        for n in 0..12 {
            svc.create(user(n)).await.unwrap();
        }
        let page = svc.list(&q(&[("page", "2"), ("limit", "5")])).await.unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_documents, 12);
        assert_eq!(page.documents.len(), 5);
        assert_eq!(page.documents[0]["name"], "User 5");

        let last = svc.list(&q(&[("page", "3"), ("limit", "5")])).await.unwrap();
        assert_eq!(last.documents.len(), 2);
        let beyond = svc.list(&q(&[("page", "9"), ("limit", "5")])).await.unwrap();
        assert!(beyond.documents.is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_field() {
        let svc = service("users").await;
        for n in 0..4 {
            svc.create(user(n)).await.unwrap();
        }
        let page = svc.list(&q(&[("age", "22")])).await.unwrap();
        assert_eq!(page.total_documents, 1);
        assert_eq!(page.documents[0]["name"], "User 2");
    }

    #[tokio::test]
    async fn invalid_pagination_is_a_validation_error() {
        let svc = service("users").await;
        assert!(matches!(svc.list(&q(&[("page", "0")])).await, Err(AppError::Validation(_))));
        assert!(matches!(svc.list(&q(&[("limit", "-3")])).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_and_malformed_ids() {
        let svc = service("users").await;
        let missing = Uuid::new_v4().to_string();
        assert!(matches!(svc.get_by_id(&missing).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.get_by_id("not-an-id").await, Err(AppError::Validation(_))));
        assert!(matches!(svc.update(&missing, json!({"age": 5})).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let svc = service("users").await;
        let created = svc.create(user(1)).await.unwrap();
        let id = created["id"].as_str().unwrap();
        let deleted = svc.delete(id).await.unwrap();
        assert_eq!(deleted.message, "User deleted");
        assert_eq!(deleted.record["id"], created["id"]);
        assert!(matches!(svc.delete(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_merges_and_revalidates() {
        let svc = service("users").await;
        let created = svc.create(user(1)).await.unwrap();
        let id = created["id"].as_str().unwrap();

        let updated = svc.update(id, json!({"age": 45, "email": " NEW@Example.com"})).await.unwrap();
        assert_eq!(updated["age"], 45);
        assert_eq!(updated["email"], "new@example.com");
        assert_eq!(updated["name"], "User 1");

        let err = svc.update(id, json!({"age": 500})).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("age must be at most 120")));
        assert_eq!(svc.get_by_id(id).await.unwrap()["age"], 45);
    }

    #[tokio::test]
    async fn create_reports_validation_and_duplicates() {
        let svc = service("users").await;
        let err = svc.create(json!({"name": "John Doe"})).await.unwrap_err();
        assert_eq!(err.to_string(), "User validation failed: email is required");

        svc.create(user(1)).await.unwrap();
        let err = svc.create(user(1)).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);

        assert!(matches!(svc.create(json!([1, 2])).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn synthesize_missing_fills_required_fields() {
        let svc = service("users").await.with_synthesize_missing(true);
        let created = svc.create(json!({"name": "John Doe"})).await.unwrap();
        assert_eq!(created["name"], "John Doe");
        assert!(created["email"].as_str().unwrap().ends_with("@example.com"));
        assert!(created["age"].is_number());
    }
}
