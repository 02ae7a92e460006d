//! Background compositor: replacement backgrounds beneath the transformed image

use crate::error::{PreviewError, Result};
use crate::filters::FilterId;
use crate::image_state::LogicalImage;
use crate::services::ImageFetcher;
use crate::surface::Surface;
use std::time::Duration;

/// The background most recently composited onto the transformed surface
#[derive(Debug, Clone)]
pub struct ActiveBackground {
    url: String,
}

impl ActiveBackground {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Fetch and decode the background at `url`
///
/// # Errors
/// `BackgroundFetchFailed` when the resource is unreachable, times out or does
/// not decode.
pub async fn load_background(
    fetcher: &dyn ImageFetcher,
    url: &str,
    timeout: Duration,
) -> Result<LogicalImage> {
    let bytes = tokio::time::timeout(timeout, fetcher.fetch(url))
        .await
        .map_err(|_| {
            PreviewError::background(format!("{}: no response within {}s", url, timeout.as_secs()))
        })?
        .map_err(|e| PreviewError::background(format!("{}: {}", url, e)))?;

    LogicalImage::decode_async(bytes.into())
        .await
        .map_err(|e| PreviewError::background(format!("{}: {}", url, e)))
}

/// Draw `background` then `foreground` onto `surface` at its current size
///
/// The surface content is fully replaced; nothing from earlier composites
/// survives. Returns `false` when the surface has never been drawn.
pub fn composite(
    surface: &mut Surface,
    background: &LogicalImage,
    foreground: &LogicalImage,
    filter: FilterId,
) -> bool {
    surface.composite(background.image(), foreground, filter)
}
