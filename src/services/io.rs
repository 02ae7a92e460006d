//! Image I/O operations service
//!
//! Keeps file system access and PNG encoding out of the session logic.

use crate::error::{PreviewError, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Service for image file input/output
pub struct ImageIOService;

impl ImageIOService {
    /// Read an encoded image file without decoding it
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    pub async fn read_image_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        tokio::fs::read(path_ref)
            .await
            .map_err(|e| PreviewError::file_io_error("read image file", path_ref, &e))
    }

    /// MIME type guessed from the file extension
    ///
    /// # Examples
    /// ```rust
    /// use imgly_bgcompose::services::ImageIOService;
    ///
    /// assert_eq!(ImageIOService::content_type_for("photo.jpg"), Some("image/jpeg"));
    /// assert_eq!(ImageIOService::content_type_for("notes.txt"), None);
    /// ```
    pub fn content_type_for<P: AsRef<Path>>(path: P) -> Option<&'static str> {
        ImageFormat::from_path(path.as_ref())
            .ok()
            .map(|format| format.to_mime_type())
    }

    /// Encode RGBA pixels as PNG
    ///
    /// # Errors
    /// - The encoder rejected the buffer (e.g. zero-sized image)
    pub fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(PreviewError::export("cannot encode an empty surface"));
        }
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(pixels.clone())
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
        log::debug!(
            "Encoded {}x{} PNG ({} bytes)",
            pixels.width(),
            pixels.height(),
            buffer.len()
        );
        Ok(buffer)
    }

    /// Write bytes to `path`, creating the parent directory if needed
    ///
    /// # Errors
    /// - Parent directory cannot be created
    /// - File cannot be written
    pub async fn write_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PreviewError::file_io_error("create output directory", parent, &e)
            })?;
        }
        tokio::fs::write(path_ref, bytes)
            .await
            .map_err(|e| PreviewError::file_io_error("write file", path_ref, &e))
    }
}
