//! Shared application state for the non-resource routes.

use crate::registry::Registry;
use crate::store::DocumentStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    /// Fixed at startup; routes are generated from it once.
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, registry: Registry) -> Self {
        AppState {
            store,
            registry: Arc::new(registry),
        }
    }
}
