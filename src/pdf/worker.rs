//! PDF render worker - runs in separate thread(s)

use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};
use log::{debug, trace, warn};

use super::backend::{DocumentBackend, DocumentHandle};
use super::cache::{CacheKey, RasterCache};
use super::generation::{CancelToken, Generation, LiveGeneration};
use super::geometry::{Resolution, resolve_geometry};
use super::request::{RenderRequest, RenderResponse, ViewerFault};
use super::types::{DocumentSource, PageSize};

/// The document a worker currently holds open
struct OpenDocument {
    generation: Generation,
    handle: Box<dyn DocumentHandle>,
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    backend: Arc<dyn DocumentBackend>,
    live: LiveGeneration,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    cache: Arc<Mutex<RasterCache>>,
) {
    let mut open: Option<OpenDocument> = None;

    for request in requests {
        match request {
            RenderRequest::ResolveGeometry {
                generation,
                source,
                scale,
            } => {
                let token = live.token(generation);
                if let Some(response) =
                    handle_geometry_request(backend.as_ref(), &mut open, &token, &source, scale)
                {
                    let _ = responses.send(response);
                }
            }

            RenderRequest::Page {
                generation,
                source,
                page,
                size,
                scale,
            } => {
                let token = live.token(generation);
                let job = PageJob {
                    source: &source,
                    page,
                    size,
                    scale,
                };
                if let Some(response) =
                    handle_page_request(backend.as_ref(), &mut open, &token, &job, &cache)
                {
                    let _ = responses.send(response);
                }
            }

            RenderRequest::Shutdown => break,
        }
    }
}

/// Reuse the worker's open handle when it belongs to the same load
fn ensure_open<'a>(
    backend: &dyn DocumentBackend,
    open: &'a mut Option<OpenDocument>,
    generation: Generation,
    source: &DocumentSource,
) -> Result<&'a dyn DocumentHandle, ViewerFault> {
    if open.as_ref().is_none_or(|doc| doc.generation != generation) {
        // drop the stale handle before decoding the next one
        *open = None;
        let handle = backend.open(source)?;
        *open = Some(OpenDocument { generation, handle });
    }
    match open {
        Some(doc) => Ok(doc.handle.as_ref()),
        None => Err(ViewerFault::decode("document handle unavailable")),
    }
}

fn handle_geometry_request(
    backend: &dyn DocumentBackend,
    open: &mut Option<OpenDocument>,
    token: &CancelToken,
    source: &DocumentSource,
    scale: f32,
) -> Option<RenderResponse> {
    let generation = token.generation();
    if token.is_cancelled() {
        trace!("{generation} superseded before decode of {source}");
        return None;
    }

    let result = ensure_open(backend, open, generation, source)
        .and_then(|handle| resolve_geometry(handle, scale, token));

    match result {
        Ok(Resolution::Resolved(sizes)) => {
            debug!("{generation} measured {} pages of {source}", sizes.len());
            Some(RenderResponse::Geometry { generation, sizes })
        }
        Ok(Resolution::Cancelled) => None,
        Err(error) => {
            warn!("{generation} failed to decode {source}: {error}");
            Some(RenderResponse::DecodeFailed { generation, error })
        }
    }
}

struct PageJob<'a> {
    source: &'a DocumentSource,
    page: usize,
    size: PageSize,
    scale: f32,
}

fn handle_page_request(
    backend: &dyn DocumentBackend,
    open: &mut Option<OpenDocument>,
    token: &CancelToken,
    job: &PageJob<'_>,
    cache: &Arc<Mutex<RasterCache>>,
) -> Option<RenderResponse> {
    let generation = token.generation();
    let page = job.page;
    if token.is_cancelled() {
        trace!("{generation} page {page} dropped from queue");
        return None;
    }

    let key = CacheKey::new(job.source, page, job.scale);
    let cached = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key);
    if let Some(raster) = cached.filter(|r| r.size() == job.size) {
        return Some(RenderResponse::Page {
            generation,
            page,
            raster,
        });
    }

    let rendered = ensure_open(backend, open, generation, job.source)
        .and_then(|handle| handle.render(page, job.scale));

    if token.is_cancelled() {
        trace!("{generation} page {page} finished after cancellation");
        return None;
    }

    match rendered {
        Ok(raster) => {
            let raster = cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, raster.fit_to(job.size));
            Some(RenderResponse::Page {
                generation,
                page,
                raster,
            })
        }
        Err(error) => Some(RenderResponse::PageFailed {
            generation,
            page,
            error,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::FakeBackend;

    fn setup(
        fake: FakeBackend,
    ) -> (
        Arc<dyn DocumentBackend>,
        LiveGeneration,
        Arc<Mutex<RasterCache>>,
    ) {
        let live = LiveGeneration::new();
        live.publish(Generation(1));
        let backend: Arc<dyn DocumentBackend> = Arc::new(fake);
        (backend, live, Arc::new(Mutex::new(RasterCache::new(8))))
    }

    #[test]
    fn page_is_fitted_to_the_requested_size() {
        let (backend, live, cache) = setup(FakeBackend::with_pages(&[(100.0, 50.0)]));
        let source = DocumentSource::from_path("a.pdf");
        let mut open = None;
        let job = PageJob {
            source: &source,
            page: 0,
            size: PageSize::new(120, 60),
            scale: 1.0,
        };

        let response = handle_page_request(
            backend.as_ref(),
            &mut open,
            &live.token(Generation(1)),
            &job,
            &cache,
        );

        let Some(RenderResponse::Page { raster, .. }) = response else {
            panic!("expected a rendered page");
        };
        assert_eq!(raster.size(), PageSize::new(120, 60));
    }

    #[test]
    fn second_request_is_served_from_cache() {
        let fake = FakeBackend::with_pages(&[(10.0, 10.0)]);
        let (backend, live, cache) = setup(fake.clone());
        let source = DocumentSource::from_path("a.pdf");
        let mut open = None;
        let job = PageJob {
            source: &source,
            page: 0,
            size: PageSize::new(10, 10),
            scale: 1.0,
        };
        let token = live.token(Generation(1));

        handle_page_request(backend.as_ref(), &mut open, &token, &job, &cache);
        handle_page_request(backend.as_ref(), &mut open, &token, &job, &cache);

        assert_eq!(fake.renders(), 1);
    }

    #[test]
    fn stale_request_renders_nothing() {
        let fake = FakeBackend::with_pages(&[(10.0, 10.0)]);
        let (backend, live, cache) = setup(fake.clone());
        let source = DocumentSource::from_path("a.pdf");
        let mut open = None;
        let token = live.token(Generation(1));
        live.publish(Generation(2));

        let job = PageJob {
            source: &source,
            page: 0,
            size: PageSize::new(10, 10),
            scale: 1.0,
        };
        assert!(handle_page_request(backend.as_ref(), &mut open, &token, &job, &cache).is_none());
        assert_eq!(fake.renders(), 0);
    }

    #[test]
    fn decode_failure_is_reported_for_the_current_generation() {
        let (backend, live, _cache) = setup(FakeBackend::default().failing_open());
        let mut open = None;

        let response = handle_geometry_request(
            backend.as_ref(),
            &mut open,
            &live.token(Generation(1)),
            &DocumentSource::from_path("broken.pdf"),
            1.2,
        );

        assert!(matches!(
            response,
            Some(RenderResponse::DecodeFailed {
                generation: Generation(1),
                ..
            })
        ));
    }
}
