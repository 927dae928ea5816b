//! Document pane: composed page surfaces drawn with half-block glyphs
//!
//! Every terminal cell shows two vertically stacked pixels, the upper one
//! as the foreground of `▀` and the lower one as the background. Pages are
//! scaled to the pane width and stacked with a one-row label between them.

use image::RgbImage;
use image::imageops::{self, FilterType};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

use crate::pdf::{LoadStatus, PageSize, Surface, SurfaceSet};
use crate::theme::Base16Palette;

const UPPER_HALF_BLOCK: &str = "▀";
/// Rows taken by the page label above each page
pub const PAGE_LABEL_ROWS: u16 = 1;

/// Terminal rows one page occupies at `cols` columns, label excluded
#[must_use]
pub fn page_rows(size: PageSize, cols: u16) -> u16 {
    if cols == 0 || size.width == 0 {
        return 0;
    }
    let pixel_rows = (f64::from(size.height) * f64::from(cols) / f64::from(size.width)).round();
    let rows = (pixel_rows / 2.0).ceil().max(1.0);
    rows.min(f64::from(u16::MAX)) as u16
}

/// Scroll position of the document pane, in terminal rows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DocumentView {
    pub scroll: u32,
}

impl DocumentView {
    /// Total rows of the stacked pages at `cols` columns
    #[must_use]
    pub fn content_height(surfaces: &SurfaceSet, cols: u16) -> u32 {
        surfaces
            .iter()
            .map(|s| u32::from(PAGE_LABEL_ROWS + page_rows(s.size(), cols)))
            .sum()
    }

    pub fn scroll_by(&mut self, delta: i32, surfaces: &SurfaceSet, viewport: Rect) {
        let next = i64::from(self.scroll) + i64::from(delta);
        self.scroll = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
        self.clamp(surfaces, viewport);
    }

    pub fn clamp(&mut self, surfaces: &SurfaceSet, viewport: Rect) {
        let max = Self::content_height(surfaces, viewport.width)
            .saturating_sub(u32::from(viewport.height));
        self.scroll = self.scroll.min(max);
    }
}

/// Widget drawing the session's surfaces
pub struct DocumentPane<'a> {
    surfaces: &'a SurfaceSet,
    status: &'a LoadStatus,
    view: DocumentView,
    palette: &'a Base16Palette,
}

impl<'a> DocumentPane<'a> {
    #[must_use]
    pub fn new(
        surfaces: &'a SurfaceSet,
        status: &'a LoadStatus,
        view: DocumentView,
        palette: &'a Base16Palette,
    ) -> Self {
        Self {
            surfaces,
            status,
            view,
            palette,
        }
    }

    fn status_message(&self) -> Option<(String, bool)> {
        if !self.surfaces.is_empty() {
            return None;
        }
        Some(match self.status {
            LoadStatus::Idle => ("No document open".to_string(), false),
            LoadStatus::Resolving | LoadStatus::Rendering { .. } => {
                ("[ LOADING ]".to_string(), false)
            }
            LoadStatus::Ready => ("Document has no pages".to_string(), false),
            LoadStatus::Failed(detail) => (format!("Could not open document: {detail}"), true),
        })
    }

    fn render_status(&self, text: String, is_error: bool, area: Rect, buf: &mut Buffer) {
        let style = if is_error {
            Style::new()
                .fg(self.palette.base_07)
                .bg(self.palette.base_08)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::new()
                .fg(self.palette.base_06)
                .bg(self.palette.base_01)
                .add_modifier(Modifier::BOLD)
        };
        let [row] = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .areas(area);
        Paragraph::new(Line::from(Span::styled(text, style)).centered())
            .wrap(Wrap { trim: true })
            .render(row, buf);
    }

    fn render_label(&self, page: usize, surface: &Surface, row: Rect, buf: &mut Buffer) {
        let marker = if surface.is_rasterized() {
            ""
        } else {
            " (rendering)"
        };
        Line::from(Span::styled(
            format!(" page {}{marker} ", page + 1),
            Style::new().fg(self.palette.base_03),
        ))
        .centered()
        .render(row, buf);
    }
}

/// Scale a composed image to `cols` x `2 * rows` pixels
fn downsample(image: &RgbImage, cols: u16, rows: u16) -> RgbImage {
    imageops::resize(
        image,
        u32::from(cols),
        u32::from(rows) * 2,
        FilterType::Triangle,
    )
}

impl Widget for DocumentPane<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        if let Some((text, is_error)) = self.status_message() {
            self.render_status(text, is_error, area, buf);
            return;
        }

        let viewport_top = self.view.scroll;
        let viewport_bottom = viewport_top + u32::from(area.height);
        let mut cursor = 0u32;

        for (page, surface) in self.surfaces.iter().enumerate() {
            let rows = page_rows(surface.size(), area.width);
            let label_row = cursor;
            let image_top = cursor + u32::from(PAGE_LABEL_ROWS);
            let page_bottom = image_top + u32::from(rows);
            cursor = page_bottom;

            if page_bottom <= viewport_top {
                continue;
            }
            if label_row >= viewport_bottom {
                break;
            }

            if label_row >= viewport_top {
                let y = area.y + (label_row - viewport_top) as u16;
                self.render_label(page, surface, Rect::new(area.x, y, area.width, 1), buf);
            }

            let scaled = downsample(surface.image(), area.width, rows);
            let first = viewport_top.max(image_top);
            let last = viewport_bottom.min(page_bottom);
            for content_row in first..last {
                let cell_row = content_row - image_top;
                let y = area.y + (content_row - viewport_top) as u16;
                for col in 0..area.width {
                    let upper = scaled.get_pixel(u32::from(col), cell_row * 2).0;
                    let lower = scaled.get_pixel(u32::from(col), cell_row * 2 + 1).0;
                    buf[(area.x + col, y)]
                        .set_symbol(UPPER_HALF_BLOCK)
                        .set_fg(Color::Rgb(upper[0], upper[1], upper[2]))
                        .set_bg(Color::Rgb(lower[0], lower[1], lower[2]));
                }
            }
        }
    }
}
