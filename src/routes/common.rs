//! Common routes: health, readiness, version, registered schemas.

use crate::config::ResourceDescriptor;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct Status {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<&'static str>,
}

async fn health() -> Json<Status> {
    Json(Status { status: "ok", store: None })
}

/// 503 until the store answers a ping.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Status>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(Status { status: "ok", store: Some("ok") })),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Status {
                    status: "degraded",
                    store: Some("unavailable"),
                }),
            )
        }
    }
}

#[derive(Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    resources: Vec<String>,
}

async fn version(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        resources: state.registry.resources().iter().map(|r| r.path()).collect(),
    })
}

async fn schemas(State(state): State<AppState>) -> Json<Vec<ResourceDescriptor>> {
    Json(
        state
            .registry
            .resources()
            .iter()
            .map(|r| r.as_ref().clone())
            .collect(),
    )
}

/// GET /health, GET /ready, GET /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}

/// GET /schemas: every registered descriptor, in registration order. Mounted under `/api`.
pub fn schema_routes(state: AppState) -> Router {
    Router::new().route("/schemas", get(schemas)).with_state(state)
}
