//! Render request and response types

use std::sync::Arc;

use super::generation::Generation;
use super::types::{DocumentSource, PageRaster, PageSize};

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Decode the document and measure every page
    ResolveGeometry {
        generation: Generation,
        source: Arc<DocumentSource>,
        scale: f32,
    },

    /// Rasterize one page to exactly `size`
    Page {
        generation: Generation,
        source: Arc<DocumentSource>,
        page: usize,
        size: PageSize,
        scale: f32,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the decoding and rendering pipeline
#[derive(Debug, thiserror::Error)]
pub enum ViewerFault {
    #[error("cannot decode document: {detail}")]
    Decode { detail: String },

    #[error("page {page}: {detail}")]
    Render { page: usize, detail: String },

    #[error("raster is {actual:?} but the surface is {expected:?}")]
    SizeMismatch { expected: PageSize, actual: PageSize },

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),
}

impl ViewerFault {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode { detail: msg.into() }
    }

    pub fn render(page: usize, msg: impl Into<String>) -> Self {
        Self::Render {
            page,
            detail: msg.into(),
        }
    }
}

#[cfg(feature = "pdf")]
impl From<mupdf::error::Error> for ViewerFault {
    fn from(e: mupdf::error::Error) -> Self {
        Self::decode(e.to_string())
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Every page measured; committed as a whole or not at all
    Geometry {
        generation: Generation,
        sizes: Vec<PageSize>,
    },

    /// The source could not be decoded
    DecodeFailed {
        generation: Generation,
        error: ViewerFault,
    },

    /// Rendered page pixels, already fitted to the requested size
    Page {
        generation: Generation,
        page: usize,
        raster: Arc<PageRaster>,
    },

    /// A single page failed to render
    PageFailed {
        generation: Generation,
        page: usize,
        error: ViewerFault,
    },
}

impl RenderResponse {
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            Self::Geometry { generation, .. }
            | Self::DecodeFailed { generation, .. }
            | Self::Page { generation, .. }
            | Self::PageFailed { generation, .. } => *generation,
        }
    }
}
