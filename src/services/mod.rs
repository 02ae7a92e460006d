//! Collaborator services behind the preview pipeline
//!
//! The pipeline talks to the outside world only through the traits in this
//! module, so sessions can run against the real HTTP server or in-memory fakes.

mod http;
mod io;
mod notify;

pub use http::{parse_backgrounds, BackgroundsResponse, HttpBackend};
pub use io::ImageIOService;
pub use notify::{
    ConsoleNotifier, MemoryNotifier, Notification, Notifier, NoOpNotifier, PipelineStage,
};

use crate::error::Result;
use crate::removal::Upload;
use async_trait::async_trait;

/// Binary payload returned by the removal endpoint
#[derive(Debug, Clone)]
pub struct RemovedImage {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the server, if any
    pub content_type: Option<String>,
}

/// The two server endpoints used by the page
#[async_trait]
pub trait BackgroundService: Send + Sync {
    /// `POST /remove-background` with multipart field `image`
    ///
    /// # Errors
    /// `RemovalFailed` on any non-2xx status or transport failure.
    async fn remove_background(&self, upload: &Upload) -> Result<RemovedImage>;

    /// `GET /api/backgrounds?query=<category>`
    ///
    /// # Errors
    /// `GalleryQueryFailed` on a failed request or malformed JSON.
    async fn list_backgrounds(&self, category: &str) -> Result<Vec<String>>;
}

/// Retrieves remote image bytes (placeholders, backgrounds)
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the resource at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
