//! Background Compositing CLI Tool
//!
//! Runs the whole preview flow headlessly: load a photo, remove its background
//! through the server, apply a filter, composite a gallery background and
//! export the result as PNG.

use super::config::CliConfigBuilder;
use crate::{
    error::PreviewError,
    filters::FilterId,
    gallery::{BackgroundCategory, GalleryView},
    image_state::{ImageRole, ImageSource, LoadOutcome},
    preferences::{PreferenceStore, Theme},
    removal::{SubmitOutcome, Upload},
    services::{ConsoleNotifier, PipelineStage},
    session::{GalleryOutcome, PageBootstrap, PreviewSession},
    tracing_config::{events, init_cli_tracing, spans},
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use instant::Instant;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Instrument};

/// Background compositing CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "imgly-bgcompose")]
pub struct Cli {
    /// Photo to send for background removal
    #[arg(short, long, value_name = "INPUT", required_unless_present_any = &["list_filters", "theme"])]
    pub input: Option<PathBuf>,

    /// Base URL of the background removal server [default: $BGCOMPOSE_BASE_URL or http://127.0.0.1:5000]
    #[arg(short, long, value_name = "URL")]
    pub server: Option<String>,

    /// Filter applied to the transformed image (see --list-filters)
    #[arg(short, long, default_value = "none")]
    pub filter: String,

    /// Background category to query (e.g. beach, city, mountains)
    #[arg(short, long)]
    pub category: Option<String>,

    /// Index of the gallery thumbnail to composite beneath the result
    #[arg(short, long, default_value_t = 0)]
    pub pick: usize,

    /// Directory the exported PNG is written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Placeholder shown on the original surface before a photo is loaded (path or URL)
    #[arg(long, value_name = "LOCATION")]
    pub placeholder_original: Option<String>,

    /// Placeholder shown on the transformed surface before a result exists (path or URL)
    #[arg(long, value_name = "LOCATION")]
    pub placeholder_transformed: Option<String>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// List available filters and exit
    #[arg(long)]
    pub list_filters: bool,

    /// Show, set or toggle the stored theme preference
    #[arg(long, value_enum)]
    pub theme: Option<CliThemeAction>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliThemeAction {
    Show,
    Light,
    Dark,
    Toggle,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let session_id = uuid::Uuid::new_v4().to_string();

    init_cli_tracing(cli.verbose, &session_id).context("Failed to initialize tracing")?;
    debug!(verbosity = cli.verbose, "Tracing initialized");

    if cli.list_filters {
        list_filters();
        return Ok(());
    }

    if let Some(action) = cli.theme {
        handle_theme(action)?;
        if cli.input.is_none() {
            return Ok(());
        }
    }

    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let base_url = config.base_url.clone();
    let span = spans::session(&session_id, &config.base_url);

    let session = PreviewSession::builder(config)
        .notifier(Arc::new(ConsoleNotifier))
        .build()
        .context("Failed to create preview session")?;

    let start_time = Instant::now();
    let written = match run(&cli, &session).instrument(span).await {
        Ok(path) => path,
        Err(e) => {
            if e
                .downcast_ref::<PreviewError>()
                .is_some_and(PreviewError::is_pipeline_failure)
            {
                error!("💡 Check that the server at {} is running and reachable", base_url);
            }
            return Err(e);
        },
    };
    events::performance_metric("session", start_time.elapsed().as_millis() as u64);

    println!("{}", written.display());
    info!(
        "Exported composite in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn run(cli: &Cli, session: &PreviewSession) -> Result<PathBuf> {
    let input = cli
        .input
        .as_ref()
        .context("An input image is required")?;

    if let (Some(original), Some(transformed)) =
        (&cli.placeholder_original, &cli.placeholder_transformed)
    {
        let report = session
            .bootstrap(PageBootstrap::from_locations(original, transformed))
            .await;
        debug!(
            original_ok = report.original.is_ok(),
            transformed_ok = report.transformed.is_ok(),
            "Placeholders loaded"
        );
    }

    let upload = Upload::from_path(input)
        .await
        .with_context(|| format!("Failed to read input: {}", input.display()))?;
    session
        .load_original(ImageSource::Bytes(upload.shared_bytes()))
        .await
        .with_context(|| format!("Failed to decode input: {}", input.display()))?;
    let surface = session.surface(ImageRole::Original);
    events::progress(
        &format!(
            "Loaded {} ({}x{} preview)",
            upload.file_name(),
            surface.width(),
            surface.height()
        ),
        "📷",
    );

    let filter = session.set_filter(&cli.filter);
    if filter == FilterId::None && cli.filter != FilterId::None.as_str() {
        warn!("Unknown filter '{}', using none", cli.filter);
    }

    let spinner = create_spinner()?;
    spinner.set_message(format!(
        "{} from {}",
        PipelineStage::RemovalRequest.description(),
        upload.file_name()
    ));
    let submitted = session.submit(Some(&upload)).await;
    spinner.finish_and_clear();

    match submitted.context("Background removal failed")? {
        SubmitOutcome::NoFile => anyhow::bail!("Input file is empty: {}", input.display()),
        SubmitOutcome::Loaded(outcome) => debug!(?outcome, "Removal result loaded"),
    }

    if let Some(category) = &cli.category {
        apply_gallery_background(session, category, cli.pick).await;
    }

    let control = session
        .export_control()
        .context("No removal result available to export")?;
    control
        .export_to(&cli.output)
        .await
        .with_context(|| format!("Failed to export into {}", cli.output.display()))
}

/// Composite the `pick`th background of `category`; failures only cost the background
async fn apply_gallery_background(session: &PreviewSession, category: &str, pick: usize) {
    let outcome = match session.select_category(category).await {
        Ok(outcome) => outcome,
        Err(e) => {
            events::error_with_context(&e, "background gallery");
            warn!("Exporting without a replacement background");
            return;
        },
    };

    let GalleryOutcome::Shown(view) = outcome else {
        warn!("No background category selected");
        return;
    };

    match view {
        GalleryView::Thumbnails(thumbnails) => {
            info!("Found {} background(s) for '{}'", thumbnails.len(), category);
            match session.activate_thumbnail(pick).await {
                Ok(LoadOutcome::Applied) => {
                    if let Some(url) = session.active_background() {
                        events::progress(&format!("Background applied: {}", url), "🌄");
                    }
                },
                Ok(outcome) => debug!(?outcome, "Background not applied"),
                Err(e) => {
                    events::error_with_context(&e, "background composite");
                    warn!("Exporting without a replacement background");
                },
            }
        },
        GalleryView::Placeholder(message) => warn!("{}", message),
        GalleryView::Hidden | GalleryView::Loading => {},
    }
}

fn create_spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn list_filters() {
    println!("🎨 Available filters");
    for filter in FilterId::ALL {
        println!("  • {:<10} {}", filter.as_str(), filter.chain());
    }
    println!();
    println!("🏞️  Background categories");
    for category in BackgroundCategory::KNOWN {
        println!("  • {:<12} {}", category.query(), category.label());
    }
}

fn handle_theme(action: CliThemeAction) -> Result<()> {
    let store = PreferenceStore::new().context("Failed to locate preferences")?;
    let theme = match action {
        CliThemeAction::Show => store.load_theme(),
        CliThemeAction::Toggle => store.toggle().context("Failed to save theme")?,
        CliThemeAction::Light | CliThemeAction::Dark => {
            let theme = if action == CliThemeAction::Dark {
                Theme::Dark
            } else {
                Theme::Light
            };
            store.save_theme(theme).context("Failed to save theme")?;
            theme
        },
    };
    println!("Theme: {}", theme);
    Ok(())
}
