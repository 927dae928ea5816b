//! PDF rendering infrastructure

mod backend;
mod cache;
mod generation;
mod geometry;
mod overlay;
mod request;
mod session;
mod surface;
mod types;
mod worker;

pub use backend::{DocumentBackend, DocumentHandle};
#[cfg(feature = "pdf")]
pub use backend::MupdfBackend;
pub use cache::{CacheKey, RasterCache};
pub use generation::{CancelToken, Generation, LiveGeneration};
pub use geometry::{Resolution, resolve_geometry};
pub use overlay::{HighlightOverlay, HighlightStyle, PaintReport};
pub use request::{RenderRequest, RenderResponse, ViewerFault};
pub use session::{LoadStatus, SessionConfig, SessionEvent, ViewerSession};
pub use surface::{Surface, SurfaceSet};
pub use types::*;

/// Device pixels per PDF point
pub const DEFAULT_RENDER_SCALE: f32 = 1.2;
pub const DEFAULT_WORKERS: usize = 2;
pub const DEFAULT_CACHE_SIZE: usize = 32;
