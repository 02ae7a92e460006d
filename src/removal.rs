//! Removal request pipeline: uploads and the result handle they produce

use crate::error::{PreviewError, Result};
use crate::image_state::{EphemeralResource, LoadOutcome};
use crate::services::{BackgroundService, ImageIOService};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A user-selected file ready to be sent to the removal endpoint
#[derive(Debug, Clone)]
pub struct Upload {
    file_name: String,
    bytes: Arc<[u8]>,
    content_type: Option<String>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk, guessing its content type from the extension
    ///
    /// # Errors
    /// - File cannot be read
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let bytes = ImageIOService::read_image_bytes(path_ref).await?;
        let file_name = path_ref
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        let mut upload = Self::new(file_name, bytes);
        if let Some(content_type) = ImageIOService::content_type_for(path_ref) {
            upload = upload.with_content_type(content_type);
        }
        Ok(upload)
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn shared_bytes(&self) -> Arc<[u8]> {
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

/// What a form submission ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No file was selected; nothing was sent
    NoFile,
    /// The removal result went through the transformed loader
    Loaded(LoadOutcome),
}

/// Pick the upload to send, ignoring a missing or empty selection
#[must_use]
pub fn selected_upload(upload: Option<&Upload>) -> Option<&Upload> {
    upload.filter(|upload| !upload.is_empty() && !upload.file_name().is_empty())
}

/// Send `upload` and wrap the returned payload in an ephemeral handle
///
/// # Errors
/// `RemovalFailed` for failed or timed out requests and for empty payloads.
pub async fn request_removal(
    service: &dyn BackgroundService,
    upload: &Upload,
    timeout: Duration,
) -> Result<EphemeralResource> {
    let removed = tokio::time::timeout(timeout, service.remove_background(upload))
        .await
        .map_err(|_| {
            PreviewError::removal(format!("no response within {}s", timeout.as_secs()))
        })??;

    if removed.bytes.is_empty() {
        return Err(PreviewError::removal("server returned an empty image"));
    }

    Ok(EphemeralResource::new(removed.bytes, removed.content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RemovedImage;
    use async_trait::async_trait;

    struct FixedService(Vec<u8>);

    #[async_trait]
    impl BackgroundService for FixedService {
        async fn remove_background(&self, _upload: &Upload) -> Result<RemovedImage> {
            Ok(RemovedImage {
                bytes: self.0.clone(),
                content_type: Some("image/png".to_string()),
            })
        }

        async fn list_backgrounds(&self, _category: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct SlowService;

    #[async_trait]
    impl BackgroundService for SlowService {
        async fn remove_background(&self, _upload: &Upload) -> Result<RemovedImage> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(PreviewError::internal("unreachable"))
        }

        async fn list_backgrounds(&self, _category: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_selected_upload_skips_empty_files() {
        let empty = Upload::new("a.png", Vec::<u8>::new());
        let unnamed = Upload::new("", vec![1u8]);
        let real = Upload::new("b.png", vec![1u8, 2]);
        assert!(selected_upload(None).is_none());
        assert!(selected_upload(Some(&empty)).is_none());
        assert!(selected_upload(Some(&unnamed)).is_none());
        assert_eq!(selected_upload(Some(&real)).map(Upload::len), Some(2));
    }

    #[tokio::test]
    async fn test_request_removal_wraps_payload() {
        let service = FixedService(vec![9u8, 9, 9]);
        let upload = Upload::new("cat.jpg", vec![1u8]).with_content_type("image/jpeg");
        let resource = request_removal(&service, &upload, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(&*resource.bytes(), &[9u8, 9, 9]);
        assert_eq!(resource.content_type(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_empty_payload_is_a_removal_failure() {
        let service = FixedService(Vec::new());
        let upload = Upload::new("cat.jpg", vec![1u8]);
        assert!(matches!(
            request_removal(&service, &upload, Duration::from_secs(5)).await,
            Err(PreviewError::RemovalFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_removal_times_out() {
        let upload = Upload::new("cat.jpg", vec![1u8]);
        let error = request_removal(&SlowService, &upload, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(error, PreviewError::RemovalFailed(_)));
        assert!(error.to_string().contains("30s"));
    }
}
