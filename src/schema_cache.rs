//! Schema cache: a JSON file mapping resource name to its last-seen field list.
//! Compared against the live registry at startup to report drift; the CLI also reads it
//! as a fallback source of descriptors.

use crate::config::{FieldDescriptor, ResourceDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub type CacheContents = BTreeMap<String, Vec<FieldDescriptor>>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("schema cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema cache json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Field-level difference between a cached schema and the live one.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Present in both, with a different definition.
    pub changed: Vec<String>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Compare `previous` cached fields against the live descriptor, in live field order.
pub fn diff(previous: &[FieldDescriptor], current: &ResourceDescriptor) -> SchemaDiff {
    let current_names: HashSet<&str> = current.fields.iter().map(|f| f.name.as_str()).collect();
    let mut out = SchemaDiff::default();
    for field in &current.fields {
        match previous.iter().find(|p| p.name == field.name) {
            None => out.added.push(field.name.clone()),
            Some(p) if p != field => out.changed.push(field.name.clone()),
            Some(_) => {}
        }
    }
    out.removed = previous
        .iter()
        .filter(|p| !current_names.contains(p.name.as_str()))
        .map(|p| p.name.clone())
        .collect();
    out
}

pub struct SchemaCache {
    path: PathBuf,
}

impl SchemaCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SchemaCache { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached contents; a missing file reads as empty.
    pub async fn load(&self) -> Result<CacheContents, CacheError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CacheContents::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, contents: &CacheContents) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(contents)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Cached resources as descriptors, sorted by name.
    pub async fn descriptors(&self) -> Result<Vec<ResourceDescriptor>, CacheError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|(name, fields)| ResourceDescriptor::new(&name, fields))
            .collect())
    }

    /// Diff every live descriptor against the cache, log drift, and rewrite the cache when
    /// anything differs. Cached resources no longer registered are left in place.
    pub async fn detect_changes(
        &self,
        resources: &[Arc<ResourceDescriptor>],
    ) -> Result<Vec<(String, SchemaDiff)>, CacheError> {
        let mut contents = self.load().await?;
        let mut drift = Vec::new();
        for resource in resources {
            let changes = match contents.get(&resource.name) {
                Some(previous) => diff(previous, resource),
                None => {
                    tracing::info!(resource = %resource.name, "schema not cached yet");
                    SchemaDiff {
                        added: resource.field_names().into_iter().map(String::from).collect(),
                        ..SchemaDiff::default()
                    }
                }
            };
            if changes.is_empty() {
                continue;
            }
            tracing::warn!(
                resource = %resource.name,
                added = ?changes.added,
                removed = ?changes.removed,
                changed = ?changes.changed,
                "schema drift detected"
            );
            contents.insert(resource.name.clone(), resource.fields.clone());
            drift.push((resource.name.clone(), changes));
        }
        if !drift.is_empty() {
            self.save(&contents).await?;
            tracing::info!(path = %self.path.display(), "schema cache updated");
        }
        Ok(drift)
    }
}
