//! Export unit: the transformed surface as a downloadable PNG
//!
//! An [`ExportControl`] can only be obtained from a session whose transformed
//! image is a real removal result, so exporting the placeholder is impossible
//! rather than merely discouraged.

use crate::error::{PreviewError, Result};
use crate::services::{ImageIOService, Notification, PipelineStage};
use crate::tracing_config::spans;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// A serialized composite ready to be offered for download
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

impl ExportedFile {
    /// Encode `pixels` as PNG under `file_name`
    ///
    /// # Errors
    /// `Export` for an empty surface, `Image` if encoding fails.
    pub fn encode(file_name: impl Into<String>, pixels: &RgbaImage) -> Result<Self> {
        let bytes = ImageIOService::encode_png(pixels)?;
        Ok(Self {
            file_name: file_name.into(),
            bytes,
            width: pixels.width(),
            height: pixels.height(),
            created_at: Utc::now(),
        })
    }

    /// Write the file into `dir` and return its path
    ///
    /// # Errors
    /// - Directory cannot be created or file cannot be written
    pub async fn save_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        ImageIOService::write_file(&path, &self.bytes)
            .instrument(spans::export(&self.file_name))
            .await?;
        tracing::info!(
            path = %path.display(),
            bytes = self.bytes.len(),
            "💾 Exported composite"
        );
        Ok(path)
    }
}

/// Capability to export; handed out only once a real result exists
pub struct ExportControl {
    pub(crate) session: crate::session::PreviewSession,
}

impl ExportControl {
    /// Serialize the transformed surface's current pixels
    ///
    /// # Errors
    /// `Export` when the surface holds no pixels.
    pub fn export(&self) -> Result<ExportedFile> {
        let (pixels, file_name) = self.session.export_snapshot()?;
        ExportedFile::encode(file_name, &pixels)
    }

    /// Export and write into `dir` in one step
    ///
    /// # Errors
    /// Any error from [`ExportControl::export`] or [`ExportedFile::save_to`].
    pub async fn export_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let result = match self.export() {
            Ok(file) => file.save_to(dir).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            self.session.notify(Notification::StageFailed {
                stage: PipelineStage::Export,
                message: e.to_string(),
            });
        }
        result
    }
}

impl std::fmt::Debug for ExportControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportControl").finish_non_exhaustive()
    }
}

pub(crate) fn not_exportable() -> PreviewError {
    PreviewError::export("no removal result to export yet")
}
