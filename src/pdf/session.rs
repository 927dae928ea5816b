//! Viewer session - owns one displayed document and its per-page state

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, trace, warn};

use super::backend::DocumentBackend;
use super::cache::RasterCache;
use super::generation::{Generation, LiveGeneration};
use super::overlay::{HighlightOverlay, HighlightStyle, PaintReport};
use super::request::{RenderRequest, RenderResponse};
use super::surface::SurfaceSet;
use super::types::{DocumentSource, PageSize, SourceLocation};
use super::{DEFAULT_CACHE_SIZE, DEFAULT_RENDER_SCALE, DEFAULT_WORKERS};
use crate::highlight::HighlightRegion;
use crate::pdf::worker::render_worker;

/// Tunables for a session
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    /// Device pixels per PDF point
    pub render_scale: f32,
    pub workers: usize,
    pub cache_size: usize,
    pub style: HighlightStyle,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            workers: DEFAULT_WORKERS,
            cache_size: DEFAULT_CACHE_SIZE,
            style: HighlightStyle::default(),
        }
    }
}

/// Where the current document is in its load
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing open
    Idle,
    /// Decoding and measuring pages
    Resolving,
    /// Geometry committed; `done` of `total` pages have settled
    Rendering { done: usize, total: usize },
    /// Every page rendered or failed
    Ready,
    /// The source could not be decoded; nothing is shown
    Failed(String),
}

impl LoadStatus {
    /// No more responses are expected for the current generation
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready | Self::Failed(_))
    }
}

/// Observable outcome of applying one worker response
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    GeometryCommitted { pages: usize },
    DecodeFailed(String),
    PageRendered(usize),
    PageFailed(usize),
}

/// One viewing session.
///
/// Owns the generation token, committed geometry, surfaces and highlight
/// list of the displayed document. Workers only ever send messages back;
/// every mutation of that state happens in [`ViewerSession::poll_responses`]
/// or [`ViewerSession::set_highlights`] on the thread that owns the session.
pub struct ViewerSession {
    config: SessionConfig,
    live: LiveGeneration,
    generation: Generation,
    source: Option<Arc<DocumentSource>>,
    geometry: Vec<PageSize>,
    surfaces: SurfaceSet,
    settled: Vec<bool>,
    highlights: Vec<HighlightRegion>,
    overlay: HighlightOverlay,
    status: LoadStatus,
    stale_discarded: usize,
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    cache: Arc<Mutex<RasterCache>>,
}

impl ViewerSession {
    /// Create a session and spawn its worker threads
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>, config: SessionConfig) -> Self {
        let cache = Arc::new(Mutex::new(RasterCache::new(config.cache_size)));
        let live = LiveGeneration::new();

        // flume gives an MPMC request queue so every worker pulls from the
        // same channel.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let workers = config.workers.max(1);
        for _ in 0..workers {
            let backend = Arc::clone(&backend);
            let live = live.clone();
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let cache = Arc::clone(&cache);

            std::thread::spawn(move || {
                render_worker(backend, live, rx, tx, cache);
            });
        }
        debug!("Spawned {workers} render worker(s)");

        Self {
            config: SessionConfig { workers, ..config },
            live,
            generation: Generation::default(),
            source: None,
            geometry: Vec::new(),
            surfaces: SurfaceSet::default(),
            settled: Vec::new(),
            highlights: Vec::new(),
            overlay: HighlightOverlay::new(config.style),
            status: LoadStatus::Idle,
            stale_discarded: 0,
            request_tx,
            response_rx,
            cache,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn source(&self) -> Option<&DocumentSource> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Committed page sizes; empty until the whole document is measured
    #[must_use]
    pub fn geometry(&self) -> &[PageSize] {
        &self.geometry
    }

    #[must_use]
    pub fn surfaces(&self) -> &SurfaceSet {
        &self.surfaces
    }

    #[must_use]
    pub fn highlights(&self) -> &[HighlightRegion] {
        &self.highlights
    }

    /// Responses dropped because their generation was superseded
    #[must_use]
    pub fn stale_discarded(&self) -> usize {
        self.stale_discarded
    }

    /// Display a new document, abandoning whatever was loading before
    pub fn open(&mut self, source: DocumentSource) {
        let source = Arc::new(source);
        self.begin_generation();
        info!("Opening {source} as {}", self.generation);

        self.source = Some(Arc::clone(&source));
        self.status = LoadStatus::Resolving;
        let _ = self.request_tx.send(RenderRequest::ResolveGeometry {
            generation: self.generation,
            source,
            scale: self.config.render_scale,
        });
    }

    /// Decode the current source again, bypassing cached rasters
    pub fn reload(&mut self) {
        let Some(source) = self.source.take() else {
            return;
        };
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate_source(&source);
        let source = match &source.location {
            SourceLocation::Path(path) => DocumentSource::from_path(path.clone()),
            SourceLocation::Bytes(_) => Arc::unwrap_or_clone(source),
        };
        self.open(source);
    }

    /// Tear down the displayed document
    pub fn close(&mut self) {
        self.begin_generation();
        self.source = None;
        self.status = LoadStatus::Idle;
    }

    /// Start a new generation and drop every piece of per-page state
    fn begin_generation(&mut self) {
        self.generation = self.generation.next();
        self.live.publish(self.generation);
        self.geometry.clear();
        self.surfaces = SurfaceSet::default();
        self.settled.clear();
        self.highlights.clear();
    }

    /// Replace the highlight list and repaint every surface
    pub fn set_highlights(&mut self, highlights: Vec<HighlightRegion>) -> PaintReport {
        self.highlights = highlights;
        self.overlay.repaint(&mut self.surfaces, &self.highlights)
    }

    /// Apply every response that has arrived, without blocking
    pub fn poll_responses(&mut self) -> Vec<SessionEvent> {
        let mut events = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            events.extend(self.apply_response(response));
        }
        events
    }

    /// Block until the current load settles or `timeout` passes.
    ///
    /// Returns whether the load settled.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.status.is_settled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    self.apply_response(response);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Load of {} did not settle within {timeout:?}", self.generation);
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!("All render workers have exited");
                    return false;
                }
            }
        }
        true
    }

    pub(crate) fn apply_response(&mut self, response: RenderResponse) -> Option<SessionEvent> {
        if response.generation() != self.generation {
            trace!(
                "Discarding {} response while showing {}",
                response.generation(),
                self.generation
            );
            self.stale_discarded += 1;
            return None;
        }

        match response {
            RenderResponse::Geometry { sizes, .. } => Some(self.commit_geometry(sizes)),

            RenderResponse::DecodeFailed { error, .. } => {
                warn!("{} shows an empty viewer: {error}", self.generation);
                self.geometry.clear();
                self.surfaces = SurfaceSet::default();
                self.settled.clear();
                let detail = error.to_string();
                self.status = LoadStatus::Failed(detail.clone());
                Some(SessionEvent::DecodeFailed(detail))
            }

            RenderResponse::Page { page, raster, .. } => {
                let Some(surface) = self.surfaces.get_mut(page) else {
                    warn!("Raster for page {page} has no surface");
                    return None;
                };
                if let Err(e) = surface.paint_raster(&raster) {
                    error!("Page {page} not painted: {e}");
                    self.mark_settled(page);
                    return Some(SessionEvent::PageFailed(page));
                }
                self.overlay
                    .repaint_page(&mut self.surfaces, page, &self.highlights);
                self.mark_settled(page);
                Some(SessionEvent::PageRendered(page))
            }

            RenderResponse::PageFailed { page, error, .. } => {
                error!("Page {page} failed to render: {error}");
                self.mark_settled(page);
                Some(SessionEvent::PageFailed(page))
            }
        }
    }

    /// Commit the whole geometry array, size every surface, then queue
    /// rendering. Surfaces exist before any raster request is sent.
    fn commit_geometry(&mut self, sizes: Vec<PageSize>) -> SessionEvent {
        let pages = sizes.len();
        self.surfaces = SurfaceSet::from_geometry(&sizes);
        self.settled = vec![false; pages];
        self.geometry = sizes;
        self.overlay.repaint(&mut self.surfaces, &self.highlights);

        self.status = if pages == 0 {
            LoadStatus::Ready
        } else {
            LoadStatus::Rendering {
                done: 0,
                total: pages,
            }
        };

        if let Some(source) = &self.source {
            for (page, size) in self.geometry.iter().enumerate() {
                let _ = self.request_tx.send(RenderRequest::Page {
                    generation: self.generation,
                    source: Arc::clone(source),
                    page,
                    size: *size,
                    scale: self.config.render_scale,
                });
            }
        }
        debug!("{} committed geometry for {pages} pages", self.generation);
        SessionEvent::GeometryCommitted { pages }
    }

    fn mark_settled(&mut self, page: usize) {
        if let Some(flag) = self.settled.get_mut(page) {
            *flag = true;
        }
        let done = self.settled.iter().filter(|s| **s).count();
        let total = self.settled.len();
        self.status = if done == total {
            LoadStatus::Ready
        } else {
            LoadStatus::Rendering { done, total }
        };
    }

    /// Stop all workers
    pub fn shutdown(&self) {
        for _ in 0..self.config.workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.live.publish(self.generation.next());
        self.shutdown();
    }
}
