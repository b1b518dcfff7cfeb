//! crudify-server: serves the generated CRUD routes for every registered resource.
//!
//! Configuration comes from the environment (optionally a `.env` file); see `Settings`.

use crudify::{
    app, load_resources, AppOptions, AppState, DocumentStore, MemoryStore, PgStore, Registry, SchemaCache, Settings,
    StoreBackend,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crudify=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let registry = match &settings.resources_path {
        Some(path) => Registry::new(load_resources(path).await?)?,
        None => Registry::builtin(),
    };

    let store: Arc<dyn DocumentStore> = match &settings.store {
        StoreBackend::Postgres { database_url, schema } => {
            tracing::info!(%schema, "using postgres store");
            Arc::new(PgStore::connect(database_url, schema).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; records are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    for descriptor in registry.resources() {
        store.ensure_collection(descriptor).await?;
    }

    let cache = SchemaCache::new(&settings.schema_cache_path);
    if let Err(e) = cache.detect_changes(registry.resources()).await {
        tracing::warn!(error = %e, path = %cache.path().display(), "schema drift check skipped");
    }

    let state = AppState::new(store, registry);
    let app = app(state, &AppOptions::from(&settings));

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("crudify listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
