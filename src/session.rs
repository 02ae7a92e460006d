//! Preview session: the shared state every pipeline component reads and writes
//!
//! A `PreviewSession` owns both logical images, both surfaces, the active
//! filter, the gallery and the per-role request tokens. It is a cheap `Clone`
//! handle, so a frontend can start several operations at once and await them
//! in any order. The state lock is only taken between suspension points and
//! is never held across an `.await`.
//!
//! Every asynchronous operation follows the same shape:
//!
//! 1. issue a token for its role,
//! 2. fetch/decode without touching shared state,
//! 3. re-lock, drop the result if the token is stale, otherwise commit and draw.
//!
//! Failures leave the previous state exactly as it was.

use crate::compositor::{self, ActiveBackground};
use crate::config::PreviewConfig;
use crate::error::{PreviewError, Result};
use crate::export::{self, ExportControl};
use crate::filters::FilterId;
use crate::gallery::{BackgroundCategory, Gallery, GalleryState, GalleryView};
use crate::image_state::{
    ImageOrigin, ImageRole, ImageSource, LoadOutcome, LogicalImage, SourceImageState,
};
use crate::removal::{self, SubmitOutcome, Upload};
use crate::services::{
    BackgroundService, HttpBackend, ImageFetcher, ImageIOService, Notification, Notifier,
    NoOpNotifier, PipelineStage,
};
use crate::surface::{self, Surface, SurfacePair};
use crate::tokens::{RequestRole, RequestTokens};
use crate::tracing_config::{events, spans};
use image::RgbaImage;
use instant::Instant;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn, Instrument};

/// Placeholder locations supplied by the page at startup
#[derive(Debug, Clone)]
pub struct PageBootstrap {
    pub original: ImageSource,
    pub transformed: ImageSource,
}

impl PageBootstrap {
    /// Build from the two data attributes (`data-original`, `data-transformed`)
    #[must_use]
    pub fn from_locations(original: &str, transformed: &str) -> Self {
        Self {
            original: ImageSource::from_location(original),
            transformed: ImageSource::from_location(transformed),
        }
    }
}

/// Outcome of loading both placeholders
#[derive(Debug)]
pub struct BootstrapReport {
    pub original: Result<LoadOutcome>,
    pub transformed: Result<LoadOutcome>,
}

/// Outcome of choosing a background category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryOutcome {
    /// Blank choice; the gallery was left as it was
    Unchanged,
    /// A newer category was chosen while this query was in flight
    Superseded,
    /// The query result is now shown
    Shown(GalleryView),
}

#[derive(Debug, Default)]
struct SessionState {
    images: SourceImageState,
    surfaces: SurfacePair,
    filter: FilterId,
    tokens: RequestTokens,
    gallery: Gallery,
    active_background: Option<ActiveBackground>,
}

struct SessionInner {
    config: PreviewConfig,
    service: Arc<dyn BackgroundService>,
    fetcher: Arc<dyn ImageFetcher>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SessionState>,
}

/// Handle to one preview session
#[derive(Clone)]
pub struct PreviewSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSession")
            .field("config", &self.inner.config)
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

/// Builder for [`PreviewSession`]
pub struct PreviewSessionBuilder {
    config: PreviewConfig,
    service: Option<Arc<dyn BackgroundService>>,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    notifier: Arc<dyn Notifier>,
}

impl PreviewSessionBuilder {
    #[must_use]
    pub fn service(mut self, service: Arc<dyn BackgroundService>) -> Self {
        self.service = Some(service);
        self
    }

    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build the session; missing collaborators default to an [`HttpBackend`]
    ///
    /// # Errors
    /// - Invalid configuration
    /// - HTTP client could not be created
    pub fn build(self) -> Result<PreviewSession> {
        self.config.validate()?;

        let (service, fetcher) = match (self.service, self.fetcher) {
            (Some(service), Some(fetcher)) => (service, fetcher),
            (service, fetcher) => {
                let http = Arc::new(HttpBackend::new(&self.config)?);
                (
                    service.unwrap_or_else(|| http.clone() as Arc<dyn BackgroundService>),
                    fetcher.unwrap_or_else(|| http as Arc<dyn ImageFetcher>),
                )
            },
        };

        let state = SessionState {
            surfaces: SurfacePair::new(self.config.surface_width),
            ..SessionState::default()
        };

        Ok(PreviewSession {
            inner: Arc::new(SessionInner {
                config: self.config,
                service,
                fetcher,
                notifier: self.notifier,
                state: Mutex::new(state),
            }),
        })
    }
}

impl PreviewSession {
    #[must_use]
    pub fn builder(config: PreviewConfig) -> PreviewSessionBuilder {
        PreviewSessionBuilder {
            config,
            service: None,
            fetcher: None,
            notifier: Arc::new(NoOpNotifier),
        }
    }

    /// Session talking to the HTTP server at `config.base_url`
    ///
    /// # Errors
    /// Same as [`PreviewSessionBuilder::build`].
    pub fn connect(config: PreviewConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    #[must_use]
    pub fn config(&self) -> &PreviewConfig {
        &self.inner.config
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // Source image state
    // ---------------------------------------------------------------------

    /// Load the placeholders named by the page, both at once
    pub async fn bootstrap(&self, page: PageBootstrap) -> BootstrapReport {
        let (original, transformed) = futures::join!(
            self.load_original(page.original),
            self.load_transformed(page.transformed, ImageOrigin::Placeholder)
        );
        if let Err(e) = &original {
            warn!(error = %e, "Original placeholder failed to load");
        }
        if let Err(e) = &transformed {
            warn!(error = %e, "Transformed placeholder failed to load");
        }
        BootstrapReport {
            original,
            transformed,
        }
    }

    /// Decode a newly selected file and show it, unfiltered, on the original surface
    ///
    /// # Errors
    /// `DecodeFailed` if the source cannot be read or decoded; nothing changes.
    pub async fn load_original(&self, source: ImageSource) -> Result<LoadOutcome> {
        self.load(ImageRole::Original, source, ImageOrigin::Placeholder)
            .await
    }

    /// Decode a transformed image and show it with the active filter
    ///
    /// An `origin` of [`ImageOrigin::RemovalResult`] clears the placeholder flag
    /// once the image is committed, which unlocks export.
    ///
    /// # Errors
    /// `DecodeFailed` if the source cannot be read or decoded; nothing changes.
    pub async fn load_transformed(
        &self,
        source: ImageSource,
        origin: ImageOrigin,
    ) -> Result<LoadOutcome> {
        self.load(ImageRole::Transformed, source, origin).await
    }

    #[instrument(level = "debug", skip(self, source), fields(source = %source.describe()))]
    async fn load(
        &self,
        role: ImageRole,
        source: ImageSource,
        origin: ImageOrigin,
    ) -> Result<LoadOutcome> {
        let (token, surface_width, filter) = {
            let mut state = self.lock();
            let token = state.tokens.issue(role.request_role());
            (token, state.surfaces.get(role).width(), state.filter)
        };
        let started = Instant::now();

        let decoded = match self.source_bytes(&source).await {
            Ok(bytes) => LogicalImage::decode_async(bytes).await,
            Err(e) => Err(e),
        };
        let checked = decoded.and_then(|image| {
            surface::checked_height(image.width(), image.height(), surface_width)?;
            Ok(image)
        });
        let image = checked.map_err(|e| {
            warn!(%role, error = %e, "Image load failed, keeping previous state");
            match e {
                PreviewError::DecodeFailed(_) => e,
                other => PreviewError::decode(format!("{}: {}", source.describe(), other)),
            }
        })?;

        let (width, height) = image.dimensions();
        let drawn_filter = surface::filter_for(role, filter);
        let rendered = Surface::render_detached(role, surface_width, image.clone(), drawn_filter)
            .instrument(spans::surface_render(role, drawn_filter.as_str(), (width, height)))
            .await?;

        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.tokens.is_current(token) {
            events::superseded(&token.role().to_string(), token.sequence());
            return Ok(LoadOutcome::Superseded);
        }

        state.images.replace(role, image, origin);
        if surface::filter_for(role, state.filter) == drawn_filter {
            state.surfaces.replace(rendered);
        } else {
            // The filter changed while rendering.
            let filter = state.filter;
            state
                .surfaces
                .render_role(role, state.images.get(role), filter);
        }
        if role == ImageRole::Transformed {
            // Compositing redraws from scratch; a new foreground drops the old background.
            state.active_background = None;
        }

        info!(
            %role,
            width,
            height,
            duration_ms = started.elapsed().as_millis() as u64,
            "🖼️  Image loaded"
        );
        Ok(LoadOutcome::Applied)
    }

    async fn source_bytes(&self, source: &ImageSource) -> Result<Arc<[u8]>> {
        match source {
            ImageSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
            ImageSource::Resource(resource) => Ok(resource.bytes()),
            ImageSource::Path(path) => Ok(ImageIOService::read_image_bytes(path).await?.into()),
            ImageSource::Url(url) => {
                let timeout = self.inner.config.request_timeout();
                let bytes = tokio::time::timeout(timeout, self.inner.fetcher.fetch(url))
                    .await
                    .map_err(|_| {
                        PreviewError::Network(format!(
                            "{}: no response within {}s",
                            url,
                            timeout.as_secs()
                        ))
                    })??;
                Ok(bytes.into())
            },
        }
    }

    /// Logical image currently held for `role`
    #[must_use]
    pub fn image(&self, role: ImageRole) -> Option<LogicalImage> {
        self.lock().images.get(role).cloned()
    }

    /// `true` until a removal result has been committed
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.lock().images.is_placeholder()
    }

    // ---------------------------------------------------------------------
    // Surfaces and filters
    // ---------------------------------------------------------------------

    /// Snapshot of the surface for `role`
    #[must_use]
    pub fn surface(&self, role: ImageRole) -> Surface {
        self.lock().surfaces.get(role).clone()
    }

    #[must_use]
    pub fn filter(&self) -> FilterId {
        self.lock().filter
    }

    /// Select a filter by menu value; unknown values select `none`
    pub fn set_filter(&self, id: &str) -> FilterId {
        let filter = FilterId::parse_lenient(id);
        self.set_filter_id(filter);
        filter
    }

    /// Select a filter and redraw the transformed surface with it
    ///
    /// The original surface is never touched. A composited background is not
    /// carried over to the redraw.
    pub fn set_filter_id(&self, filter: FilterId) {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.filter = filter;
        let redrawn = state.surfaces.render_role(
            ImageRole::Transformed,
            state.images.get(ImageRole::Transformed),
            filter,
        );
        if redrawn {
            state.active_background = None;
        }
        debug!(%filter, redrawn, "Filter selected");
    }

    // ---------------------------------------------------------------------
    // Background compositor
    // ---------------------------------------------------------------------

    /// Fetch the image at `url` and composite it beneath the transformed image
    ///
    /// # Errors
    /// `BackgroundFetchFailed` when the image is unreachable or undecodable; the
    /// transformed surface is left exactly as it was.
    #[instrument(level = "debug", skip(self))]
    pub async fn apply_background(&self, url: &str) -> Result<LoadOutcome> {
        let token = self.lock().tokens.issue(RequestRole::Background);
        let timeout = self.inner.config.request_timeout();

        let background = compositor::load_background(self.inner.fetcher.as_ref(), url, timeout)
            .instrument(spans::background_fetch(url))
            .await
            .map_err(|e| {
                warn!(url, error = %e, "Background not applied");
                self.notify(Notification::StageFailed {
                    stage: PipelineStage::BackgroundFetch,
                    message: e.to_string(),
                });
                e
            })?;

        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.tokens.is_current(token) {
            events::superseded(&token.role().to_string(), token.sequence());
            return Ok(LoadOutcome::Superseded);
        }
        let Some(foreground) = state.images.get(ImageRole::Transformed) else {
            debug!(url, "No transformed image yet, background skipped");
            return Ok(LoadOutcome::Skipped);
        };

        let filter = state.filter;
        let surface = state.surfaces.get_mut(ImageRole::Transformed);
        if !compositor::composite(surface, &background, foreground, filter) {
            return Ok(LoadOutcome::Skipped);
        }
        state.active_background = Some(ActiveBackground::new(url));
        info!(url, "🌄 Background applied");
        Ok(LoadOutcome::Applied)
    }

    /// URL of the background currently composited, if any
    #[must_use]
    pub fn active_background(&self) -> Option<String> {
        self.lock()
            .active_background
            .as_ref()
            .map(|background| background.url().to_string())
    }

    // ---------------------------------------------------------------------
    // Gallery controller
    // ---------------------------------------------------------------------

    /// Query candidates for a category menu value
    ///
    /// A blank value is ignored. Otherwise the current thumbnails are cleared
    /// before the request goes out, and only the most recent query may fill the
    /// gallery.
    ///
    /// # Errors
    /// `GalleryQueryFailed` if this (still current) query failed; the gallery
    /// shows its error placeholder and the surfaces are untouched.
    #[instrument(level = "debug", skip(self))]
    pub async fn select_category(&self, choice: &str) -> Result<GalleryOutcome> {
        let Some(category) = BackgroundCategory::from_choice(choice) else {
            return Ok(GalleryOutcome::Unchanged);
        };

        let token = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let token = state.tokens.issue(RequestRole::Gallery);
            state.gallery.begin_query(category.clone(), token);
            token
        };

        let timeout = self.inner.config.request_timeout();
        let result = tokio::time::timeout(timeout, self.inner.service.list_backgrounds(category.query()))
            .instrument(spans::gallery_query(category.query()))
            .await
            .unwrap_or_else(|_| {
                Err(PreviewError::gallery(format!(
                    "no response within {}s",
                    timeout.as_secs()
                )))
            })
            .map_err(|e| match e {
                PreviewError::GalleryQueryFailed(_) => e,
                other => PreviewError::gallery(other.to_string()),
            });

        let view = {
            let mut guard = self.lock();
            let state = &mut *guard;
            if !state.tokens.is_current(token) || !state.gallery.finish_query(token, &result) {
                debug!(%category, "Discarding superseded gallery response");
                return Ok(GalleryOutcome::Superseded);
            }
            state.gallery.view(self.inner.config.thumbnail_width)
        };

        match result {
            Ok(urls) => {
                info!(%category, count = urls.len(), "Gallery loaded");
                Ok(GalleryOutcome::Shown(view))
            },
            Err(e) => {
                warn!(%category, error = %e, "Gallery query failed");
                self.notify(Notification::StageFailed {
                    stage: PipelineStage::GalleryQuery,
                    message: e.to_string(),
                });
                Err(e)
            },
        }
    }

    /// Activate the thumbnail at `index`: select it and composite its background
    ///
    /// Selection follows the activation even if the background later fails to
    /// load; the failure is returned and the surface is left alone.
    ///
    /// # Errors
    /// - `NoSuchCandidate` for an index outside the current gallery
    /// - `BackgroundFetchFailed` from the compositor
    pub async fn activate_thumbnail(&self, index: usize) -> Result<LoadOutcome> {
        let url = self.lock().gallery.activate(index)?;
        debug!(index, url = %url, "Thumbnail activated");
        self.apply_background(&url).await
    }

    #[must_use]
    pub fn gallery_state(&self) -> GalleryState {
        self.lock().gallery.state().clone()
    }

    #[must_use]
    pub fn gallery_view(&self) -> GalleryView {
        self.lock().gallery.view(self.inner.config.thumbnail_width)
    }

    #[must_use]
    pub fn selected_thumbnail(&self) -> Option<usize> {
        self.lock().gallery.selected()
    }

    // ---------------------------------------------------------------------
    // Removal request pipeline
    // ---------------------------------------------------------------------

    /// Send the selected file for background removal and show the result
    ///
    /// Without a file this does nothing. A rejected request raises a
    /// [`Notification::RemovalFailed`] and leaves every preview untouched.
    ///
    /// # Errors
    /// - `RemovalFailed` for non-2xx responses, transport failures, timeouts
    /// - `DecodeFailed` if the returned payload is not an image
    #[instrument(level = "debug", skip_all)]
    pub async fn submit(&self, upload: Option<&Upload>) -> Result<SubmitOutcome> {
        let Some(upload) = removal::selected_upload(upload) else {
            debug!("Submit without a file ignored");
            return Ok(SubmitOutcome::NoFile);
        };

        let started = Instant::now();
        let resource = match removal::request_removal(
            self.inner.service.as_ref(),
            upload,
            self.inner.config.request_timeout(),
        )
        .await
        {
            Ok(resource) => resource,
            Err(e) => {
                warn!(file = upload.file_name(), error = %e, "Background removal failed");
                let reason = match &e {
                    PreviewError::RemovalFailed(reason) => reason.clone(),
                    other => other.to_string(),
                };
                self.notify(Notification::RemovalFailed(reason));
                return Err(e);
            },
        };
        debug!(
            resource = %resource.url(),
            bytes = resource.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Removal result received"
        );

        match self
            .load_transformed(ImageSource::Resource(resource), ImageOrigin::RemovalResult)
            .await
        {
            Ok(outcome) => {
                if outcome == LoadOutcome::Applied {
                    self.notify(Notification::ResultReady);
                }
                Ok(SubmitOutcome::Loaded(outcome))
            },
            Err(e) => {
                self.notify(Notification::StageFailed {
                    stage: PipelineStage::Decode,
                    message: e.to_string(),
                });
                Err(e)
            },
        }
    }

    // ---------------------------------------------------------------------
    // Export unit
    // ---------------------------------------------------------------------

    /// The export control, present only once a real removal result is shown
    #[must_use]
    pub fn export_control(&self) -> Option<ExportControl> {
        if self.is_placeholder() {
            return None;
        }
        Some(ExportControl {
            session: self.clone(),
        })
    }

    #[must_use]
    pub fn is_export_enabled(&self) -> bool {
        !self.is_placeholder()
    }

    pub(crate) fn export_snapshot(&self) -> Result<(RgbaImage, String)> {
        let state = self.lock();
        if state.images.is_placeholder() {
            return Err(export::not_exportable());
        }
        let surface = state.surfaces.get(ImageRole::Transformed);
        if !surface.is_drawn() {
            return Err(PreviewError::export("transformed surface is empty"));
        }
        Ok((surface.to_rgba(), self.inner.config.export_file_name.clone()))
    }
}
