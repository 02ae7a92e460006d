//! Configuration types for preview sessions

use crate::error::{PreviewError, Result};
use crate::surface::DEFAULT_SURFACE_WIDTH;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding [`PreviewConfig::base_url`]
pub const BASE_URL_ENV: &str = "BGCOMPOSE_BASE_URL";

/// Environment variable overriding [`PreviewConfig::request_timeout_secs`]
pub const TIMEOUT_ENV: &str = "BGCOMPOSE_TIMEOUT_SECS";

/// File name offered for exported composites
pub const DEFAULT_EXPORT_FILE_NAME: &str = "transformed-image.png";

/// Largest accepted surface or thumbnail width
const MAX_WIDTH: u32 = 8192;

/// Configuration for a preview session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Base URL of the server hosting `/remove-background` and `/api/backgrounds`
    pub base_url: String,

    /// Fixed display width of both surfaces
    pub surface_width: u32,

    /// Display width of gallery thumbnails
    pub thumbnail_width: u32,

    /// Upper bound for every remote request, in seconds
    pub request_timeout_secs: u64,

    /// File name used by the export unit
    pub export_file_name: String,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            surface_width: DEFAULT_SURFACE_WIDTH,
            thumbnail_width: 200,
            request_timeout_secs: 30,
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            user_agent: format!("imgly-bgcompose/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PreviewConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use imgly_bgcompose::PreviewConfig;
    ///
    /// let config = PreviewConfig::builder()
    ///     .base_url("http://localhost:5000")
    ///     .request_timeout_secs(10)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.surface_width, 400);
    /// ```
    #[must_use]
    pub fn builder() -> PreviewConfigBuilder {
        PreviewConfigBuilder::default()
    }

    /// Defaults overridden by `BGCOMPOSE_BASE_URL` and `BGCOMPOSE_TIMEOUT_SECS`
    ///
    /// # Errors
    /// - Timeout variable is not a number
    /// - Resulting configuration fails validation
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            builder = builder.base_url(base_url);
        }
        if let Ok(timeout) = std::env::var(TIMEOUT_ENV) {
            let secs = timeout.trim().parse::<u64>().map_err(|e| {
                PreviewError::invalid_config(format!("{} must be a number: {}", TIMEOUT_ENV, e))
            })?;
            builder = builder.request_timeout_secs(secs);
        }
        builder.build()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Empty or non-HTTP base URL
    /// - Surface or thumbnail width outside 1-8192
    /// - Zero timeout
    /// - Export file name that is empty or contains a path separator
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(PreviewError::invalid_config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.surface_width == 0 || self.surface_width > MAX_WIDTH {
            return Err(PreviewError::config_value_error(
                "surface width",
                self.surface_width,
                "1-8192",
                Some(DEFAULT_SURFACE_WIDTH),
            ));
        }

        if self.thumbnail_width == 0 || self.thumbnail_width > MAX_WIDTH {
            return Err(PreviewError::config_value_error(
                "thumbnail width",
                self.thumbnail_width,
                "1-8192",
                Some(200),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(PreviewError::config_value_error(
                "request timeout",
                self.request_timeout_secs,
                "1 or more seconds",
                Some(30),
            ));
        }

        if self.export_file_name.is_empty()
            || self.export_file_name.contains(['/', '\\'])
        {
            return Err(PreviewError::invalid_config(format!(
                "Export file name must be a bare file name, got '{}'",
                self.export_file_name
            )));
        }

        Ok(())
    }
}

/// Builder for `PreviewConfig`
#[derive(Debug, Default)]
pub struct PreviewConfigBuilder {
    config: PreviewConfig,
}

impl PreviewConfigBuilder {
    /// Set the server base URL; a trailing slash is dropped
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn surface_width(mut self, width: u32) -> Self {
        self.config.surface_width = width;
        self
    }

    #[must_use]
    pub fn thumbnail_width(mut self, width: u32) -> Self {
        self.config.thumbnail_width = width;
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn export_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.export_file_name = name.into();
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration with validation
    ///
    /// # Errors
    /// Any rule checked by [`PreviewConfig::validate`].
    pub fn build(self) -> Result<PreviewConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
