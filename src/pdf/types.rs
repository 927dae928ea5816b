//! Core types for PDF rendering

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// Pixel dimensions of one page at the session render scale
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Derive the device-pixel size of a page from its size in points.
    ///
    /// Fractional pixels round up, and degenerate pages still get a
    /// one-pixel surface so that every committed size is positive.
    #[must_use]
    pub fn from_points(width_pt: f32, height_pt: f32, scale: f32) -> Self {
        let to_px = |v: f32| {
            let px = (v * scale).ceil();
            if px.is_finite() && px >= 1.0 {
                px as u32
            } else {
                1
            }
        };
        Self::new(to_px(width_pt), to_px(height_pt))
    }

    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Raw rendered page image.
///
/// RGB pixel data, 3 bytes per pixel, rows packed without padding. This is
/// the format workers hand back to the session before it lands on a
/// surface.
#[derive(Clone, PartialEq, Eq)]
pub struct PageRaster {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PageRaster {
    /// A raster filled with a single colour
    #[must_use]
    pub fn filled(size: PageSize, rgb: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(size.pixel_count() * 3);
        for _ in 0..size.pixel_count() {
            pixels.extend_from_slice(&rgb);
        }
        Self {
            pixels,
            width: size.width,
            height: size.height,
        }
    }

    #[must_use]
    pub const fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }

    /// Crop or pad (with white) so the raster is exactly `target`.
    ///
    /// Backends round page dimensions their own way; the surface was sized
    /// from the committed geometry, so the raster has to be brought to that
    /// size before it is painted.
    #[must_use]
    pub fn fit_to(self, target: PageSize) -> Self {
        if self.size() == target {
            return self;
        }

        let mut out = Self::filled(target, [0xFF, 0xFF, 0xFF]);
        let copy_w = self.width.min(target.width) as usize;
        let copy_h = self.height.min(target.height) as usize;
        let src_stride = self.width as usize * 3;
        let dst_stride = target.width as usize * 3;

        for y in 0..copy_h {
            let src = y * src_stride;
            let dst = y * dst_stride;
            out.pixels[dst..dst + copy_w * 3].copy_from_slice(&self.pixels[src..src + copy_w * 3]);
        }
        out
    }
}

impl std::fmt::Debug for PageRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Where the document bytes come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLocation {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// A document source plus a stable identity used for raster caching
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSource {
    pub location: SourceLocation,
    key: String,
}

impl DocumentSource {
    /// Source backed by a file.
    ///
    /// The key carries the file's length and modification time when they
    /// can be read, so an edited file does not hit rasters of its old
    /// content.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let key = path_key(&path);
        Self {
            location: SourceLocation::Path(path),
            key,
        }
    }

    #[must_use]
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let key = format!("md5:{:x}", md5::compute(&bytes));
        Self {
            location: SourceLocation::Bytes(bytes),
            key,
        }
    }

    /// Stable identity of the document content
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn path_key(path: &Path) -> String {
    let Ok(meta) = fs::metadata(path) else {
        return format!("path:{}", path.display());
    };
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());
    format!("path:{}:{}:{modified}", path.display(), meta.len())
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            SourceLocation::Path(path) => write!(f, "{}", path.display()),
            SourceLocation::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_rounds_up_like_the_viewport() {
        // 612x792pt letter page at 1.2
        assert_eq!(
            PageSize::from_points(612.0, 792.0, 1.2),
            PageSize::new(735, 951)
        );
    }

    #[test]
    fn degenerate_pages_get_one_pixel() {
        assert_eq!(PageSize::from_points(0.0, -5.0, 1.2), PageSize::new(1, 1));
        assert_eq!(
            PageSize::from_points(f32::NAN, 10.0, 1.0),
            PageSize::new(1, 10)
        );
    }

    #[test]
    fn fit_to_pads_with_white_and_crops() {
        let raster = PageRaster::filled(PageSize::new(2, 3), [0, 0, 0]);
        let fitted = raster.fit_to(PageSize::new(3, 2));

        assert_eq!(fitted.size(), PageSize::new(3, 2));
        // first two columns come from the source
        assert_eq!(&fitted.pixels[0..6], &[0, 0, 0, 0, 0, 0]);
        // third column is padding
        assert_eq!(&fitted.pixels[6..9], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn byte_sources_share_a_key_when_content_matches() {
        let a = DocumentSource::from_bytes(b"%PDF-1.7 a".to_vec());
        let b = DocumentSource::from_bytes(b"%PDF-1.7 a".to_vec());
        let c = DocumentSource::from_bytes(b"%PDF-1.7 c".to_vec());

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert!(a.key().starts_with("md5:"));
    }

    #[test]
    fn path_key_follows_file_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.pdf");
        fs::write(&path, b"%PDF-1.7 first").expect("write");

        let first = DocumentSource::from_path(&path);
        assert_eq!(first.key(), DocumentSource::from_path(&path).key());

        fs::write(&path, b"%PDF-1.7 second, longer").expect("rewrite");
        let second = DocumentSource::from_path(&path);

        assert_ne!(first.key(), second.key());
        assert_eq!(second.key(), DocumentSource::from_path(&path).key());
    }

    #[test]
    fn missing_file_falls_back_to_the_path() {
        let source = DocumentSource::from_path("no/such/file.pdf");
        assert_eq!(source.key(), "path:no/such/file.pdf");
    }
}
