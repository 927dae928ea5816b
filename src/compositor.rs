//! Dual-pane composition: document on the left, record details on the right
//!
//! The compositor owns the inputs of the highlight pipeline (projected
//! section regions and the hover slot) and merges them into the single list
//! the viewer session paints.

use log::debug;
use ratatui::layout::{Constraint, Layout, Rect};

use crate::citation::CitationHoverBridge;
use crate::highlight::HighlightRegion;
use crate::records::{Citation, DocumentRecord, Property, Section};
use crate::section::SectionHighlightProjector;

pub const DEFAULT_SIDE_PANEL_WIDTH: u16 = 42;

/// Screen areas of the two panes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DualPaneLayout {
    pub document: Rect,
    pub side_panel: Rect,
}

#[derive(Debug)]
pub struct DualPaneCompositor {
    sections: Vec<Section>,
    static_regions: Vec<HighlightRegion>,
    citations: Vec<Citation>,
    property: Option<Property>,
    hover: CitationHoverBridge,
    hovered: Option<usize>,
    selected_record: Option<usize>,
    revision: u64,
    side_panel_width: u16,
}

impl Default for DualPaneCompositor {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE_PANEL_WIDTH)
    }
}

impl DualPaneCompositor {
    #[must_use]
    pub fn new(side_panel_width: u16) -> Self {
        Self {
            sections: Vec::new(),
            static_regions: Vec::new(),
            citations: Vec::new(),
            property: None,
            hover: CitationHoverBridge::new(),
            hovered: None,
            selected_record: None,
            revision: 0,
            side_panel_width,
        }
    }

    /// Show a new document's sections and property; drops any hover
    pub fn load_record(&mut self, record: &DocumentRecord) {
        self.sections = record.sections.clone();
        self.static_regions = SectionHighlightProjector::project(&self.sections);
        self.property = record.property.clone();
        self.selected_record = None;
        self.leave_hover();
        debug!(
            "Record {}: {} of {} sections located",
            record.id,
            self.static_regions.len(),
            self.sections.len()
        );
        self.touch();
    }

    /// Replace the citation list; citations without a page are dropped
    pub fn set_citations(&mut self, mut citations: Vec<Citation>) {
        let total = citations.len();
        citations.retain(|c| c.page >= 0);
        if citations.len() < total {
            debug!(
                "Dropped {} citation(s) without a page",
                total - citations.len()
            );
        }
        self.citations = citations;
        self.leave_hover();
        self.touch();
    }

    /// Forget everything tied to the displayed document
    pub fn clear(&mut self) {
        self.sections.clear();
        self.static_regions.clear();
        self.citations.clear();
        self.property = None;
        self.selected_record = None;
        self.leave_hover();
        self.touch();
    }

    /// Hover the citation at `index`; out-of-range indices are ignored
    pub fn hover_citation(&mut self, index: usize) -> bool {
        let Some(citation) = self.citations.get(index) else {
            return false;
        };
        self.hover.hover_enter(citation);
        self.hovered = Some(index);
        self.touch();
        true
    }

    pub fn leave_hover(&mut self) {
        if self.hovered.take().is_some() || self.hover.current().is_some() {
            self.hover.hover_leave();
            self.touch();
        }
    }

    #[must_use]
    pub fn hovered_index(&self) -> Option<usize> {
        self.hovered
    }

    /// Mark a side-panel record as selected.
    ///
    /// Selection does not move the document view.
    pub fn select_record(&mut self, index: Option<usize>) {
        self.selected_record = index.filter(|i| *i < self.sections.len());
    }

    #[must_use]
    pub fn selected_record(&self) -> Option<usize> {
        self.selected_record
    }

    /// Static regions followed by the hovered citation, if any
    #[must_use]
    pub fn merged(&self) -> Vec<HighlightRegion> {
        let mut merged = Vec::with_capacity(self.static_regions.len() + 1);
        merged.extend(self.static_regions.iter().cloned());
        merged.extend(self.hover.current().cloned());
        merged
    }

    /// Bumped whenever `merged()` may have changed
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn static_regions(&self) -> &[HighlightRegion] {
        &self.static_regions
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    #[must_use]
    pub fn property(&self) -> Option<&Property> {
        self.property.as_ref()
    }

    /// Split `area` into the document pane and the side panel.
    ///
    /// The side panel keeps its preferred width but never takes more than
    /// half the screen.
    #[must_use]
    pub fn layout(&self, area: Rect) -> DualPaneLayout {
        let width = self.side_panel_width.min(area.width / 2);
        let [document, side_panel] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(width)]).areas(area);
        DualPaneLayout {
            document,
            side_panel,
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
