#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]

//! # IMG.LY Background Compositing Library
//!
//! A preview and compositing pipeline for background removal front ends. A photo
//! is sent to a background removal server, the cut-out result is previewed with
//! stylistic filters, a replacement background picked from a category gallery is
//! composited beneath it, and the final composite is exported as PNG.
//!
//! ## Features
//!
//! - **Two Preview Surfaces**: fixed-width raster surfaces whose height follows the
//!   image's aspect ratio
//! - **Stylistic Filters**: `clarendon`, `gingham`, `moon`, `lark`, `reyes`, `juno`, `1977`
//!   built from brightness/contrast/saturate/hue-rotate/sepia/grayscale primitives
//! - **Background Gallery**: category queries with thumbnail selection
//! - **Compositing**: background drawn first, filtered foreground on top
//! - **Supersession**: late responses for replaced requests are discarded per role
//! - **Export Gating**: PNG export only exists once a real removal result is shown
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgly_bgcompose::{ImageSource, PreviewConfig, PreviewSession, Upload};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PreviewConfig::builder()
//!     .base_url("http://127.0.0.1:5000")
//!     .build()?;
//! let session = PreviewSession::connect(config)?;
//!
//! let upload = Upload::from_path("portrait.jpg").await?;
//! session.load_original(ImageSource::Bytes(upload.shared_bytes())).await?;
//!
//! session.set_filter("juno");
//! session.submit(Some(&upload)).await?;
//!
//! session.select_category("beach").await?;
//! session.activate_thumbnail(0).await?;
//!
//! if let Some(export) = session.export_control() {
//!     export.export_to("out").await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, progress spinner and tracing subscriber
//! - `webp-support` (default): WebP decoding
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! imgly-bgcompose = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod filters;
pub mod gallery;
pub mod image_state;
pub mod preferences;
pub mod removal;
pub mod services;
pub mod session;
pub mod surface;
pub mod tokens;
pub mod tracing_config;

// Public API exports
pub use compositor::ActiveBackground;
pub use config::PreviewConfig;
pub use error::{PreviewError, Result};
pub use export::{ExportControl, ExportedFile};
pub use filters::{resolve, FilterChain, FilterId, FilterOp};
pub use gallery::{BackgroundCategory, GalleryState, GalleryView, ThumbnailView};
pub use image_state::{
    EphemeralResource, ImageOrigin, ImageRole, ImageSource, LoadOutcome, LogicalImage,
};
pub use preferences::{PreferenceStore, Theme};
pub use removal::{SubmitOutcome, Upload};
pub use services::{
    BackgroundService, ConsoleNotifier, HttpBackend, ImageFetcher, MemoryNotifier, Notification,
    Notifier, NoOpNotifier, RemovedImage,
};
pub use session::{BootstrapReport, GalleryOutcome, PageBootstrap, PreviewSession};
pub use surface::{scaled_height, Surface};
pub use tracing_config::{events, spans, TracingConfig, TracingFormat};

#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
