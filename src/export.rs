//! PNG export of composed page surfaces

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::pdf::{SurfaceSet, ViewerFault};

/// File name for zero-based `page`: `page-001.png` for the first page
#[must_use]
pub fn page_file_name(page: usize) -> String {
    format!("page-{:03}.png", page + 1)
}

/// Write every surface, highlights included, into `dir`.
///
/// Pages whose raster has not arrived are written as they are (white plus
/// highlights).
pub fn export_surfaces(surfaces: &SurfaceSet, dir: &Path) -> Result<Vec<PathBuf>, ViewerFault> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(surfaces.len());
    for (page, surface) in surfaces.iter().enumerate() {
        let path = dir.join(page_file_name(page));
        surface.image().save(&path)?;
        written.push(path);
    }
    info!("Exported {} page(s) to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{PageRaster, PageSize};

    #[test]
    fn pages_are_numbered_from_one() {
        assert_eq!(page_file_name(0), "page-001.png");
        assert_eq!(page_file_name(41), "page-042.png");
    }

    #[test]
    fn writes_one_png_per_surface() {
        let dir = tempfile::tempdir().expect("tempdir");
        let size = PageSize::new(6, 4);
        let mut surfaces = SurfaceSet::from_geometry(&[size, size]);
        surfaces
            .get_mut(1)
            .expect("page")
            .paint_raster(&PageRaster::filled(size, [9, 8, 7]))
            .expect("matching size");

        let out = dir.path().join("pages");
        let written = export_surfaces(&surfaces, &out).expect("export");

        assert_eq!(written.len(), 2);
        let decoded = image::open(&written[1]).expect("valid png").to_rgb8();
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.get_pixel(0, 0).0, [9, 8, 7]);
    }

    #[test]
    fn empty_set_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let written = export_surfaces(&SurfaceSet::default(), dir.path()).expect("export");
        assert!(written.is_empty());
    }
}
