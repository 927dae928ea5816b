//! Per-page drawing surfaces

use image::{Rgb, RgbImage};

use super::request::ViewerFault;
use super::types::{PageRaster, PageSize};

const BLANK: Rgb<u8> = Rgb([0xFF, 0xFF, 0xFF]);

/// Drawable target for one page.
///
/// Holds two layers: the rasterized page content and the composed image
/// (content plus highlights). The size is fixed at construction from the
/// committed geometry and never changes, so a raster can only land on a
/// surface that is already the right size.
#[derive(Clone, Debug)]
pub struct Surface {
    size: PageSize,
    raster: RgbImage,
    composed: RgbImage,
    rasterized: bool,
}

impl Surface {
    #[must_use]
    pub fn new(size: PageSize) -> Self {
        let blank = RgbImage::from_pixel(size.width, size.height, BLANK);
        Self {
            size,
            composed: blank.clone(),
            raster: blank,
            rasterized: false,
        }
    }

    #[must_use]
    pub fn size(&self) -> PageSize {
        self.size
    }

    #[must_use]
    pub fn is_rasterized(&self) -> bool {
        self.rasterized
    }

    /// Content plus highlights, as it should appear on screen
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.composed
    }

    /// Content without highlights
    #[must_use]
    pub fn raster(&self) -> &RgbImage {
        &self.raster
    }

    /// Replace the page content.
    ///
    /// Clears the highlight layer; the caller repaints highlights after.
    pub fn paint_raster(&mut self, raster: &PageRaster) -> Result<(), ViewerFault> {
        if raster.size() != self.size {
            return Err(ViewerFault::SizeMismatch {
                expected: self.size,
                actual: raster.size(),
            });
        }
        let image = RgbImage::from_raw(raster.width, raster.height, raster.pixels.clone())
            .ok_or(ViewerFault::SizeMismatch {
                expected: self.size,
                actual: raster.size(),
            })?;
        self.raster = image;
        self.composed.clone_from(&self.raster);
        self.rasterized = true;
        Ok(())
    }

    pub(crate) fn clear_highlights(&mut self) {
        self.composed.clone_from(&self.raster);
    }

    pub(crate) fn composed_mut(&mut self) -> &mut RgbImage {
        &mut self.composed
    }
}

/// One surface per page of the displayed document, indexed by page
#[derive(Clone, Debug, Default)]
pub struct SurfaceSet {
    surfaces: Vec<Surface>,
}

impl SurfaceSet {
    #[must_use]
    pub fn from_geometry(sizes: &[PageSize]) -> Self {
        Self {
            surfaces: sizes.iter().copied().map(Surface::new).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, page: usize) -> Option<&Surface> {
        self.surfaces.get(page)
    }

    #[must_use]
    pub fn get_mut(&mut self, page: usize) -> Option<&mut Surface> {
        self.surfaces.get_mut(page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Surface> {
        self.surfaces.iter_mut()
    }

    #[must_use]
    pub fn rasterized_count(&self) -> usize {
        self.surfaces.iter().filter(|s| s.is_rasterized()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_blank_and_sized_exactly() {
        let surface = Surface::new(PageSize::new(800, 1000));
        assert_eq!(surface.image().dimensions(), (800, 1000));
        assert!(!surface.is_rasterized());
        assert_eq!(surface.image().get_pixel(10, 10), &BLANK);
    }

    #[test]
    fn raster_of_the_wrong_size_is_rejected() {
        let mut surface = Surface::new(PageSize::new(10, 10));
        let raster = PageRaster::filled(PageSize::new(10, 11), [0, 0, 0]);

        let err = surface.paint_raster(&raster).expect_err("size differs");
        assert!(matches!(err, ViewerFault::SizeMismatch { .. }));
        assert!(!surface.is_rasterized());
    }

    #[test]
    fn painting_replaces_both_layers() {
        let mut surface = Surface::new(PageSize::new(4, 4));
        surface
            .paint_raster(&PageRaster::filled(PageSize::new(4, 4), [1, 2, 3]))
            .expect("same size");

        assert!(surface.is_rasterized());
        assert_eq!(surface.raster().get_pixel(0, 0), &Rgb([1, 2, 3]));
        assert_eq!(surface.image().get_pixel(3, 3), &Rgb([1, 2, 3]));
    }

    #[test]
    fn set_is_built_in_page_order() {
        let set = SurfaceSet::from_geometry(&[PageSize::new(800, 1000), PageSize::new(800, 1100)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).map(Surface::size), Some(PageSize::new(800, 1100)));
        assert!(set.get(2).is_none());
        assert_eq!(set.rasterized_count(), 0);
    }
}
