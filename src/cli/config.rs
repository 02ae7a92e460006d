//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::PreviewConfig;
use anyhow::{Context, Result};

/// Convert CLI arguments to a `PreviewConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Environment defaults, then command-line overrides
    pub(crate) fn from_cli(cli: &Cli) -> Result<PreviewConfig> {
        let mut config =
            PreviewConfig::from_env().context("Invalid BGCOMPOSE_* environment settings")?;

        if let Some(server) = &cli.server {
            config.base_url = server.trim_end_matches('/').to_string();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_server_flag_overrides_base_url() {
        let cli = Cli::try_parse_from([
            "imgly-bgcompose",
            "--input",
            "photo.jpg",
            "--server",
            "https://bg.example.com/",
        ])
        .unwrap();

        let config = CliConfigBuilder::from_cli(&cli).unwrap();
        assert_eq!(config.base_url, "https://bg.example.com");
        assert_eq!(config.surface_width, 400);
    }

    #[test]
    fn test_invalid_server_is_rejected() {
        let cli = Cli::try_parse_from([
            "imgly-bgcompose",
            "--input",
            "photo.jpg",
            "--server",
            "localhost:5000",
        ])
        .unwrap();

        assert!(CliConfigBuilder::from_cli(&cli).is_err());
    }
}
