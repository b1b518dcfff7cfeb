//! Load resource descriptors from a JSON file (array of `{name, fields}`).

use crate::config::{validate, ResourceDescriptor};
use crate::error::ConfigError;
use std::path::Path;

pub fn parse_resources(json: &str) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let resources: Vec<ResourceDescriptor> =
        serde_json::from_str(json).map_err(|e| ConfigError::Load(format!("resource file: {}", e)))?;
    validate(&resources)?;
    Ok(resources)
}

pub async fn load_resources(path: &Path) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let resources = parse_resources(&json)?;
    tracing::info!(path = %path.display(), count = resources.len(), "loaded resource descriptors");
    Ok(resources)
}
