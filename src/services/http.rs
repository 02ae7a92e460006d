//! `reqwest` implementation of the collaborator services

use super::{BackgroundService, ImageFetcher, RemovedImage};
use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use crate::removal::Upload;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};

const REMOVE_BACKGROUND_PATH: &str = "/remove-background";
const BACKGROUNDS_PATH: &str = "/api/backgrounds";

/// Body of `GET /api/backgrounds`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundsResponse {
    /// Candidate image URLs in display order; may be absent
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// Error message sent alongside failed upstream lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decode a backgrounds listing; a missing or null `images` field means no results
///
/// # Errors
/// `GalleryQueryFailed` when the body is not the expected JSON object.
pub fn parse_backgrounds(body: &[u8]) -> Result<Vec<String>> {
    let response: BackgroundsResponse = serde_json::from_slice(body)
        .map_err(|e| PreviewError::gallery(format!("malformed backgrounds response: {}", e)))?;
    Ok(response.images.unwrap_or_default())
}

/// HTTP client for the page's server
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend using the config's base URL, timeout and user agent
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(config: &PreviewConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PreviewError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through, anything else is resolved against the base URL
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl BackgroundService for HttpBackend {
    async fn remove_background(&self, upload: &Upload) -> Result<RemovedImage> {
        let url = self.resolve_url(REMOVE_BACKGROUND_PATH);
        log::debug!("Uploading {} ({} bytes) to {}", upload.file_name(), upload.len(), url);

        let mut part = multipart::Part::bytes(upload.bytes().to_vec())
            .file_name(upload.file_name().to_string());
        if let Some(content_type) = upload.content_type() {
            part = part
                .mime_str(content_type)
                .map_err(|e| PreviewError::removal(format!("invalid content type: {}", e)))?;
        }
        let form = multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PreviewError::removal(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PreviewError::removal(PreviewError::status_error(
                REMOVE_BACKGROUND_PATH,
                status.as_u16(),
                &body,
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PreviewError::removal(format!("failed to read response body: {}", e)))?;

        Ok(RemovedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn list_backgrounds(&self, category: &str) -> Result<Vec<String>> {
        let url = self.resolve_url(BACKGROUNDS_PATH);
        let response = self
            .client
            .get(&url)
            .query(&[("query", category)])
            .send()
            .await
            .map_err(|e| PreviewError::gallery(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PreviewError::gallery(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(PreviewError::gallery(PreviewError::status_error(
                BACKGROUNDS_PATH,
                status.as_u16(),
                &String::from_utf8_lossy(&body),
            )));
        }

        parse_backgrounds(&body)
    }
}

#[async_trait]
impl ImageFetcher for HttpBackend {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PreviewError::network_error(&format!("GET {}", url), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::Network(PreviewError::status_error(
                &url,
                status.as_u16(),
                "",
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PreviewError::network_error(&format!("GET {}", url), e))?;
        Ok(bytes.to_vec())
    }
}
