//! Router assembly: generated resource routes under `/api`, common routes, docs, middleware.

mod common;
mod docs;
mod resource;

pub use common::{common_routes, schema_routes};
pub use docs::{docs_routes, openapi};
pub use resource::crudify;

use crate::config::{ListOptions, Settings, DEFAULT_BODY_LIMIT};
use crate::rate_limit::{limit_by_ip, RateLimitConfig, RateLimiter};
use crate::service::CrudService;
use crate::state::AppState;
use axum::http::{header, HeaderValue};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Per-request behavior shared by every generated resource router.
#[derive(Clone, Debug)]
pub struct AppOptions {
    pub list: ListOptions,
    pub synthesize_missing: bool,
    pub body_limit: usize,
    /// Per-IP request limit; `None` turns limiting off.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for AppOptions {
    fn default() -> Self {
        AppOptions {
            list: ListOptions::default(),
            synthesize_missing: false,
            body_limit: DEFAULT_BODY_LIMIT,
            rate_limit: Some(RateLimitConfig::default()),
        }
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        AppOptions {
            list: settings.list.clone(),
            synthesize_missing: settings.synthesize_missing,
            body_limit: settings.body_limit,
            rate_limit: settings.rate_limit.clone(),
        }
    }
}

/// One crudified router per registered resource, nested at its path, plus `/schemas`.
/// Mount the result under `/api`.
pub fn api_routes(state: &AppState, options: &AppOptions) -> Router {
    state
        .registry
        .resources()
        .iter()
        .fold(schema_routes(state.clone()), |router, descriptor| {
            let service = CrudService::new(descriptor.clone(), state.store.clone())
                .with_options(options.list.clone())
                .with_synthesize_missing(options.synthesize_missing);
            router.nest(&format!("/{}", descriptor.path()), crudify(service))
        })
}

/// Full application router with CORS, tracing, rate and body limits, and security headers.
///
/// The rate limiter keys on the peer address, so serve with
/// `into_make_service_with_connect_info::<SocketAddr>()`; without it `X-Forwarded-For` is used.
pub fn app(state: AppState, options: &AppOptions) -> Router {
    let router = Router::new()
        .nest("/api", api_routes(&state, options))
        .merge(docs_routes(&state.registry))
        .merge(common_routes(state));
    let router = match &options.rate_limit {
        Some(config) => router.layer(middleware::from_fn_with_state(
            Arc::new(RateLimiter::new(config.clone())),
            limit_by_ip,
        )),
        None => router,
    };
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(RequestBodyLimitLayer::new(options.body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
