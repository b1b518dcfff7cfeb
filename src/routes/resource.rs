//! Route generator: binds a [`CrudService`] to list/get/create/update/delete handlers.

use crate::error::AppError;
use crate::response::{created, ok};
use crate::service::CrudService;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

type Service = State<Arc<CrudService>>;

/// Five handlers for one resource, to be nested under its path (`/api/users`):
/// `GET /`, `POST /`, `GET /:id`, `PUT /:id`, `DELETE /:id`.
pub fn crudify(service: CrudService) -> Router {
    tracing::info!(resource = %service.descriptor().name, path = %service.descriptor().path(), "mounting routes");
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(read).put(update).delete(delete_handler))
        .with_state(Arc::new(service))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

async fn list(
    State(svc): Service,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(svc.list(&params).await?))
}

async fn read(State(svc): Service, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    Ok(ok(svc.get_by_id(&id).await?))
}

async fn create(
    State(svc): Service,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(body)?;
    Ok(created(svc.create(body).await?))
}

async fn update(
    State(svc): Service,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(body)?;
    Ok(ok(svc.update(&id, body).await?))
}

async fn delete_handler(State(svc): Service, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    Ok(ok(svc.delete(&id).await?))
}
