//! Highlight overlay painting
//!
//! Repainting is a pure function of the surface set and the region list:
//! every call starts each page from its raster layer and draws the matching
//! regions in list order. Calling it twice with the same inputs produces
//! the same pixels.

use std::ops::Range;

use image::{Rgb, RgbImage};
use log::trace;

use super::surface::{Surface, SurfaceSet};
use crate::highlight::{DocRect, HighlightRegion};

/// Visual encoding shared by every highlight regardless of kind
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighlightStyle {
    pub accent: [u8; 3],
    /// Opacity of the fill, 0.0..=1.0
    pub fill_alpha: f32,
    /// Border thickness in pixels, centred on the rectangle edge
    pub border_width: u32,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            accent: [0xFF, 0xA5, 0x00],
            fill_alpha: 0.2,
            border_width: 2,
        }
    }
}

/// Counts from one repaint pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintReport {
    /// Regions drawn onto a surface
    pub drawn: usize,
    /// Regions whose page has no surface yet
    pub deferred: usize,
}

#[derive(Clone, Debug, Default)]
pub struct HighlightOverlay {
    style: HighlightStyle,
}

impl HighlightOverlay {
    #[must_use]
    pub fn new(style: HighlightStyle) -> Self {
        Self { style }
    }

    #[must_use]
    pub fn style(&self) -> &HighlightStyle {
        &self.style
    }

    /// Repaint the highlight layer of every surface
    pub fn repaint(&self, surfaces: &mut SurfaceSet, regions: &[HighlightRegion]) -> PaintReport {
        let drawn = surfaces
            .iter_mut()
            .enumerate()
            .map(|(page, surface)| self.paint_surface(page, surface, regions))
            .sum();
        let deferred = regions
            .iter()
            .filter(|r| surfaces.get(r.page).is_none())
            .count();

        if deferred > 0 {
            trace!("{deferred} highlight(s) wait for page geometry");
        }
        PaintReport { drawn, deferred }
    }

    /// Repaint a single page, e.g. after its raster landed
    pub fn repaint_page(
        &self,
        surfaces: &mut SurfaceSet,
        page: usize,
        regions: &[HighlightRegion],
    ) -> usize {
        surfaces
            .get_mut(page)
            .map_or(0, |surface| self.paint_surface(page, surface, regions))
    }

    fn paint_surface(&self, page: usize, surface: &mut Surface, regions: &[HighlightRegion]) -> usize {
        surface.clear_highlights();
        let canvas = surface.composed_mut();
        regions
            .iter()
            .filter(|r| r.page == page)
            .filter(|r| self.draw(canvas, r.rect))
            .count()
    }

    fn draw(&self, canvas: &mut RgbImage, rect: DocRect) -> bool {
        if ![rect.x0, rect.y0, rect.x1, rect.y1]
            .iter()
            .all(|v| v.is_finite())
        {
            trace!("skipping highlight with non-finite corners {rect:?}");
            return false;
        }

        let rect = rect.normalized();
        let (width, height) = canvas.dimensions();
        let accent = Rgb(self.style.accent);
        let alpha = self.style.fill_alpha.clamp(0.0, 1.0);

        for y in pixel_span(rect.y0, rect.y1, height) {
            for x in pixel_span(rect.x0, rect.x1, width) {
                let px = canvas.get_pixel_mut(x, y);
                *px = blend(*px, accent, alpha);
            }
        }

        let half = self.style.border_width as f32 / 2.0;
        if half <= 0.0 {
            return true;
        }
        let outer_x = pixel_span(rect.x0 - half, rect.x1 + half, width);
        let outer_y = pixel_span(rect.y0 - half, rect.y1 + half, height);
        let inner_x = pixel_span(rect.x0 + half, rect.x1 - half, width);
        let inner_y = pixel_span(rect.y0 + half, rect.y1 - half, height);

        for y in outer_y {
            for x in outer_x.clone() {
                if !(inner_x.contains(&x) && inner_y.contains(&y)) {
                    canvas.put_pixel(x, y, accent);
                }
            }
        }
        true
    }
}

/// Pixels whose centre lies in `[from, to)`, clipped to `0..limit`
fn pixel_span(from: f32, to: f32, limit: u32) -> Range<u32> {
    let clip = |v: f32| (v - 0.5).ceil().clamp(0.0, limit as f32) as u32;
    let (start, end) = (clip(from), clip(to));
    start..end.max(start)
}

fn blend(base: Rgb<u8>, over: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |b: u8, o: u8| (f32::from(b) * (1.0 - alpha) + f32::from(o) * alpha).round() as u8;
    Rgb([
        mix(base[0], over[0]),
        mix(base[1], over[1]),
        mix(base[2], over[2]),
    ])
}
