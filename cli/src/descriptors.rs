//! Where the client gets resource descriptors from: the server, else the schema cache, else built-ins.

use crate::client::ApiClient;
use crudify::{Registry, ResourceDescriptor, SchemaCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorSource {
    Server,
    Cache,
    Builtin,
}

pub async fn discover(client: &ApiClient, cache: &SchemaCache) -> (Vec<ResourceDescriptor>, DescriptorSource) {
    match client.schemas().await {
        Ok(list) if !list.is_empty() => return (list, DescriptorSource::Server),
        Ok(_) => tracing::warn!(url = %client.base_url(), "server reported no resources"),
        Err(e) => tracing::warn!(url = %client.base_url(), error = %e, "could not fetch schemas"),
    }
    match cache.descriptors().await {
        Ok(list) if !list.is_empty() => {
            tracing::info!(path = %cache.path().display(), "using cached schemas");
            return (list, DescriptorSource::Cache);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(path = %cache.path().display(), error = %e, "schema cache unreadable"),
    }
    let builtin = Registry::builtin()
        .resources()
        .iter()
        .map(|r| r.as_ref().clone())
        .collect();
    (builtin, DescriptorSource::Builtin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudify::{FieldDescriptor, FieldType};
    use std::sync::Arc;

    // Port 9 (discard) is never served in the test environment.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    #[tokio::test]
    async fn falls_back_to_cache_then_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SchemaCache::new(dir.path().join("cache.json"));
        let client = ApiClient::new(UNREACHABLE);

        let (list, source) = discover(&client, &cache).await;
        assert_eq!(source, DescriptorSource::Builtin);
        assert_eq!(list[0].name, "User");

        let book = ResourceDescriptor::new("Book", vec![FieldDescriptor::new("title", FieldType::string())]);
        cache.detect_changes(&[Arc::new(book)]).await.unwrap();
        let (list, source) = discover(&client, &cache).await;
        assert_eq!(source, DescriptorSource::Cache);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].path(), "books");
    }
}
