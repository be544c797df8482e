//! HTTP client for the Iris file API.
//!
//! [`ApiClient`] wraps the `/files` endpoints; [`UploadTransport`] sits on top
//! of it and holds the selection a user is about to upload to a story.

pub mod api;
pub mod transport;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the Iris API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        // Uploads of ten 50 MiB parts need more than the usual request budget.
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: IRIS_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("IRIS_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.build_url(path))
            .send()
            .await
            .context("Failed to send request")?;

        parse_json(response).await
    }

    /// PUT JSON body and deserialize response.
    pub async fn put_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .put(self.build_url(path))
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        parse_json(response).await
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.build_url(path))
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;

        parse_json(response).await
    }

    /// DELETE request and deserialize response.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .delete(self.build_url(path))
            .send()
            .await
            .context("Failed to send request")?;

        parse_json(response).await
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow::anyhow!(
            "API request failed with status {}: {}",
            status,
            error_message(&error_text)
        ));
    }

    response
        .json()
        .await
        .context("Failed to parse response as JSON")
}

/// The server's `error` field when the body is an error response, the raw body otherwise.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

pub use iris_core::models::{
    FileEnvelope, FileListResponse, FileResponse, FileSummary, MessageResponse, UpdateFileRequest,
    UploadResponse,
};
pub use transport::{FileUploader, TransportError, UploadFile, UploadStatus, UploadTransport};
