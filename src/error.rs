//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate field '{field}' in resource {resource}")]
    DuplicateField { resource: String, field: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures raised by a [`crate::store::DocumentStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{field} must be unique: '{value}' already exists")]
    Duplicate { field: String, value: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("too many requests from this IP, try again in {retry_after} seconds")]
    RateLimited { retry_after: u64 },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Duplicate { .. }) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) | AppError::Store(StoreError::Duplicate { .. }) => "validation_error",
            AppError::Store(_) => "store_error",
            AppError::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Error payload returned by every failing handler. The CLI prints `message` as-is.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            message: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("User".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Store(StoreError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Store(StoreError::Duplicate {
                field: "email".into(),
                value: "a@b.c".into()
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn rate_limited_is_429() {
        let e = AppError::RateLimited { retry_after: 30 };
        assert_eq!(e.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(e.code(), "rate_limited");
        assert!(e.to_string().contains("30 seconds"));
    }

    #[test]
    fn not_found_message_names_resource() {
        assert_eq!(AppError::NotFound("User".into()).to_string(), "User not found");
    }
}
