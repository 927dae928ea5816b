//! Highlight regions drawn over rendered pages

use serde::{Deserialize, Serialize};

/// Rectangle in page-pixel coordinates.
///
/// Corners are not required to be ordered or to lie inside the page; the
/// overlay normalises and clips them when drawing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl DocRect {
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Same rectangle with `x0 <= x1` and `y0 <= y1`
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }
}

/// Where a highlight came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// Projected from a persisted section; lives as long as the document
    Static,
    /// Follows the hovered citation
    Transient,
}

/// One rectangle to draw on one page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightRegion {
    /// Zero-based page index
    pub page: usize,
    pub rect: DocRect,
    pub kind: HighlightKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl HighlightRegion {
    #[must_use]
    pub fn new(page: usize, rect: DocRect, kind: HighlightKind) -> Self {
        Self {
            page,
            rect,
            kind,
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = (!label.is_empty()).then_some(label);
        self
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == HighlightKind::Transient
    }
}
