//! HTTP client for the generated `/api/<path>` routes.

use crate::error::CliError;
use crudify::{Deleted, ErrorBody, Page, ResourceDescriptor};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    pub async fn schemas(&self) -> Result<Vec<ResourceDescriptor>, CliError> {
        decode(self.http.get(self.url("schemas")).send().await?).await
    }

    pub async fn list(&self, resource: &str, query: &[(String, String)]) -> Result<Page<Value>, CliError> {
        decode(self.http.get(self.url(resource)).query(query).send().await?).await
    }

    pub async fn get(&self, resource: &str, id: &str) -> Result<Value, CliError> {
        decode(self.http.get(self.url(&format!("{}/{}", resource, id))).send().await?).await
    }

    pub async fn create(&self, resource: &str, body: &Value) -> Result<Value, CliError> {
        decode(self.http.post(self.url(resource)).json(body).send().await?).await
    }

    pub async fn update(&self, resource: &str, id: &str, body: &Value) -> Result<Value, CliError> {
        let url = self.url(&format!("{}/{}", resource, id));
        decode(self.http.put(url).json(body).send().await?).await
    }

    pub async fn delete(&self, resource: &str, id: &str) -> Result<Deleted, CliError> {
        decode(self.http.delete(self.url(&format!("{}/{}", resource, id))).send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let text = response.text().await?;
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    tracing::debug!(status = status.as_u16(), %message, "request rejected");
    Err(CliError::Api {
        status: status.as_u16(),
        message,
    })
}
