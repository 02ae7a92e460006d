//! Source image state: the two logical images behind the preview surfaces

use crate::error::{PreviewError, Result};
use crate::tokens::RequestRole;
use image::{DynamicImage, GenericImageView};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Which of the two logical images (and surfaces) an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRole {
    Original,
    Transformed,
}

impl ImageRole {
    #[must_use]
    pub fn request_role(self) -> RequestRole {
        match self {
            Self::Original => RequestRole::Original,
            Self::Transformed => RequestRole::Transformed,
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Transformed => f.write_str("transformed"),
        }
    }
}

/// Where a transformed image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Page-supplied placeholder shown before any removal result exists
    Placeholder,
    /// A genuine result from the removal endpoint
    RemovalResult,
}

/// Result of an asynchronous load or composite that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result was committed and drawn
    Applied,
    /// A newer request for the same role was issued first; the result was dropped
    Superseded,
    /// Nothing to draw against yet (no transformed image is ready)
    Skipped,
}

/// A decoded raster image plus its natural dimensions
///
/// Cloning is cheap; the pixels are shared and never mutated.
#[derive(Debug, Clone)]
pub struct LogicalImage {
    image: Arc<DynamicImage>,
    width: u32,
    height: u32,
}

impl LogicalImage {
    /// Wrap an already decoded image
    ///
    /// # Errors
    /// Returns `DecodeFailed` for images with a zero dimension.
    pub fn from_image(image: DynamicImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PreviewError::decode(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }
        Ok(Self {
            image: Arc::new(image),
            width,
            height,
        })
    }

    /// Decode image bytes (PNG, JPEG, TIFF, WebP) on the current thread
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(PreviewError::decode("empty image payload"));
        }
        let image = image::load_from_memory(bytes)
            .map_err(|e| PreviewError::decode(format!("{} ({} bytes)", e, bytes.len())))?;
        Self::from_image(image)
    }

    /// Decode on the blocking pool so the event loop keeps running
    pub async fn decode_async(bytes: Arc<[u8]>) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::decode(&bytes))
            .await
            .map_err(|e| PreviewError::internal(format!("decode task failed: {}", e)))?
    }

    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// In-memory handle for fetched image data, the analogue of an object URL
#[derive(Debug, Clone)]
pub struct EphemeralResource {
    id: Uuid,
    bytes: Arc<[u8]>,
    content_type: Option<String>,
}

impl EphemeralResource {
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: bytes.into(),
            content_type,
        }
    }

    #[must_use]
    pub fn url(&self) -> String {
        format!("blob:imgly-bgcompose/{}", self.id)
    }

    #[must_use]
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Input accepted by the image loaders
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raw encoded bytes, e.g. a selected file
    Bytes(Arc<[u8]>),
    /// Result payload held in memory
    Resource(EphemeralResource),
    /// Local file
    Path(PathBuf),
    /// Remote image fetched through the session's `ImageFetcher`
    Url(String),
}

impl ImageSource {
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Short description for logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            Self::Resource(resource) => resource.url(),
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
        }
    }

    /// Interpret a bootstrap attribute: `http(s)://` is remote, anything else a path
    #[must_use]
    pub fn from_location(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::Path(PathBuf::from(location))
        }
    }
}

/// The two logical images plus the placeholder flag
#[derive(Debug, Clone)]
pub struct SourceImageState {
    original: Option<LogicalImage>,
    transformed: Option<LogicalImage>,
    placeholder: bool,
}

impl Default for SourceImageState {
    fn default() -> Self {
        Self {
            original: None,
            transformed: None,
            placeholder: true,
        }
    }
}

impl SourceImageState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, role: ImageRole) -> Option<&LogicalImage> {
        match role {
            ImageRole::Original => self.original.as_ref(),
            ImageRole::Transformed => self.transformed.as_ref(),
        }
    }

    /// Replace the image for `role` wholesale
    ///
    /// A transformed image whose origin is a removal result clears the
    /// placeholder flag. The flag never returns to `true`.
    pub fn replace(&mut self, role: ImageRole, image: LogicalImage, origin: ImageOrigin) {
        match role {
            ImageRole::Original => self.original = Some(image),
            ImageRole::Transformed => {
                self.transformed = Some(image);
                if origin == ImageOrigin::RemovalResult {
                    self.placeholder = false;
                }
            },
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}
