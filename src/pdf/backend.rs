//! Document decoding backends
//!
//! A [`DocumentBackend`] is shared by all workers and opens a fresh
//! [`DocumentHandle`] inside each worker thread. Handles themselves do not
//! need to be `Send`: MuPDF documents are bound to the thread that opened
//! them.

use super::request::ViewerFault;
use super::types::{DocumentSource, PageRaster};

/// An opened multi-page document
pub trait DocumentHandle {
    /// Number of pages
    fn page_count(&self) -> Result<usize, ViewerFault>;

    /// Page width and height in points
    fn page_bounds(&self, page: usize) -> Result<(f32, f32), ViewerFault>;

    /// Rasterize a page at `scale` device pixels per point
    fn render(&self, page: usize, scale: f32) -> Result<PageRaster, ViewerFault>;
}

/// Opens document handles from a source
pub trait DocumentBackend: Send + Sync {
    fn open(&self, source: &DocumentSource) -> Result<Box<dyn DocumentHandle>, ViewerFault>;
}

#[cfg(feature = "pdf")]
pub use self::mupdf_backend::MupdfBackend;

#[cfg(feature = "pdf")]
mod mupdf_backend {
    use mupdf::{Colorspace, Document, Matrix, Pixmap};

    use super::{DocumentBackend, DocumentHandle};
    use crate::pdf::request::ViewerFault;
    use crate::pdf::types::{DocumentSource, PageRaster, SourceLocation};

    const PDF_MIME: &str = "application/pdf";

    /// Decodes documents with MuPDF
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MupdfBackend;

    struct MupdfHandle {
        doc: Document,
    }

    impl DocumentBackend for MupdfBackend {
        fn open(&self, source: &DocumentSource) -> Result<Box<dyn DocumentHandle>, ViewerFault> {
            let doc = match &source.location {
                SourceLocation::Path(path) => Document::open(path.to_string_lossy().as_ref())?,
                SourceLocation::Bytes(bytes) => Document::from_bytes(bytes, PDF_MIME)?,
            };
            Ok(Box::new(MupdfHandle { doc }))
        }
    }

    impl DocumentHandle for MupdfHandle {
        fn page_count(&self) -> Result<usize, ViewerFault> {
            let count = self.doc.page_count()?;
            usize::try_from(count)
                .map_err(|_| ViewerFault::decode(format!("negative page count {count}")))
        }

        fn page_bounds(&self, page: usize) -> Result<(f32, f32), ViewerFault> {
            let page = self.doc.load_page(page as i32)?;
            let bounds = page.bounds()?;
            Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
        }

        fn render(&self, page_num: usize, scale: f32) -> Result<PageRaster, ViewerFault> {
            let page = self
                .doc
                .load_page(page_num as i32)
                .map_err(|e| ViewerFault::render(page_num, e.to_string()))?;
            let transform = Matrix::new_scale(scale, scale);
            let pixmap = page
                .to_pixmap(&transform, &Colorspace::device_rgb(), false, false)
                .map_err(|e| ViewerFault::render(page_num, e.to_string()))?;

            pixmap_to_raster(page_num, &pixmap)
        }
    }

    fn pixmap_to_raster(page: usize, pixmap: &Pixmap) -> Result<PageRaster, ViewerFault> {
        let n = pixmap.n() as usize;
        if n < 3 {
            return Err(ViewerFault::render(
                page,
                format!("unsupported pixmap format: {n} channels"),
            ));
        }

        let width = pixmap.width() as usize;
        let height = pixmap.height() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        let row_bytes = width * n;
        if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
            return Err(ViewerFault::render(page, "pixmap buffer size mismatch"));
        }

        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            let row = &samples[y * stride..y * stride + row_bytes];
            if n == 3 {
                pixels.extend_from_slice(row);
            } else {
                for px in row.chunks_exact(n) {
                    pixels.extend_from_slice(&px[..3]);
                }
            }
        }

        Ok(PageRaster {
            pixels,
            width: pixmap.width(),
            height: pixmap.height(),
        })
    }
}
