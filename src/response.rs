//! Response payloads for the generated resource routes.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a list request. Counts may come from a different snapshot than `documents`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_documents: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub documents: Vec<T>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Deleted {
    pub message: String,
    pub record: Value,
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}
