//! Error types for preview and compositing operations

use thiserror::Error;

/// Result type alias for preview operations
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Error types for the preview pipeline
///
/// The first four variants form the pipeline's failure taxonomy. None of them is
/// fatal to a session: the session stays usable after any single failure.
#[derive(Error, Debug)]
pub enum PreviewError {
    /// Image bytes could not be rasterized (original or transformed role)
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// The removal endpoint answered with a non-success status or was unreachable
    #[error("Background removal failed: {0}")]
    RemovalFailed(String),

    /// A background image was unreachable or undecodable
    #[error("Background fetch failed: {0}")]
    BackgroundFetchFailed(String),

    /// The backgrounds listing request failed or returned malformed JSON
    #[error("Gallery query failed: {0}")]
    GalleryQueryFailed(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The export unit could not serialize the surface
    #[error("Export failed: {0}")]
    Export(String),

    /// A thumbnail index that is not part of the current gallery
    #[error("No background candidate at index {0}")]
    NoSuchCandidate(usize),

    /// Transport-level failures outside the taxonomy above
    #[error("Network error: {0}")]
    Network(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PreviewError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::DecodeFailed(msg.into())
    }

    /// Create a new removal error
    pub fn removal<S: Into<String>>(msg: S) -> Self {
        Self::RemovalFailed(msg.into())
    }

    /// Create a new background fetch error
    pub fn background<S: Into<String>>(msg: S) -> Self {
        Self::BackgroundFetchFailed(msg.into())
    }

    /// Create a new gallery query error
    pub fn gallery<S: Into<String>>(msg: S) -> Self {
        Self::GalleryQueryFailed(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new export error
    pub fn export<S: Into<String>>(msg: S) -> Self {
        Self::Export(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a network error with context about the failed operation
    pub fn network_error(context: &str, error: impl std::fmt::Display) -> Self {
        Self::Network(format!("{}: {}", context, error))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create a status error for an HTTP exchange
    pub fn status_error(endpoint: &str, status: u16, body: &str) -> String {
        let body = body.trim();
        if body.is_empty() {
            format!("{} returned HTTP {}", endpoint, status)
        } else {
            format!("{} returned HTTP {}: {}", endpoint, status, body)
        }
    }

    /// Whether this failure belongs to the pipeline taxonomy rather than the environment
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailed(_)
                | Self::RemovalFailed(_)
                | Self::BackgroundFetchFailed(_)
                | Self::GalleryQueryFailed(_)
        )
    }
}
