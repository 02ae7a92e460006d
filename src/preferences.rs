//! Persisted light/dark theme preference
//!
//! Stored as `{"mode": "dark"}` in `preferences.json` under the user's config
//! directory. A missing or unreadable file means `light`.

use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable overriding the preference directory
pub const PREFERENCES_DIR_ENV: &str = "BGCOMPOSE_CONFIG_DIR";

const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(PreviewError::invalid_config(format!(
                "Unknown theme '{}' (expected light or dark)",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPreferences {
    mode: Theme,
}

/// Reads and writes the theme preference file
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Store in the default location
    ///
    /// # Errors
    /// - The user config directory cannot be determined
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(Self::default_dir()?.join(PREFERENCES_FILE)))
    }

    /// Store at an explicit file path
    #[must_use]
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(PREFERENCES_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        Ok(dirs::config_dir()
            .ok_or_else(|| {
                PreviewError::invalid_config(format!(
                    "Failed to determine config directory. Set {} environment variable.",
                    PREFERENCES_DIR_ENV
                ))
            })?
            .join("imgly-bgcompose"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored theme; `Light` if nothing valid is stored
    #[must_use]
    pub fn load_theme(&self) -> Theme {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return Theme::default(),
        };
        match serde_json::from_str::<StoredPreferences>(&contents) {
            Ok(stored) => stored.mode,
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable preferences at {}: {}",
                    self.path.display(),
                    e
                );
                Theme::default()
            },
        }
    }

    /// # Errors
    /// - Parent directory cannot be created or file cannot be written
    pub fn save_theme(&self, theme: Theme) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    PreviewError::file_io_error("create preferences directory", parent, &e)
                })?;
            }
        }
        let json = serde_json::to_string(&StoredPreferences { mode: theme })
            .map_err(|e| PreviewError::internal(format!("serialize preferences: {}", e)))?;
        fs::write(&self.path, json)
            .map_err(|e| PreviewError::file_io_error("write preferences", &self.path, &e))?;
        log::debug!("Saved theme '{}' to {}", theme, self.path.display());
        Ok(())
    }

    /// Flip the stored theme and persist it
    ///
    /// # Errors
    /// Same as [`PreferenceStore::save_theme`].
    pub fn toggle(&self) -> Result<Theme> {
        let theme = self.load_theme().toggled();
        self.save_theme(theme)?;
        Ok(theme)
    }
}
