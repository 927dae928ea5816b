//! Hover-driven transient highlight

use log::trace;

use crate::highlight::{DocRect, HighlightKind, HighlightRegion};
use crate::records::Citation;

/// Single slot holding the highlight of the hovered citation.
///
/// Entering a citation replaces whatever was there; leaving clears it, so
/// there is never more than one transient region.
#[derive(Clone, Debug, Default)]
pub struct CitationHoverBridge {
    current: Option<HighlightRegion>,
}

impl CitationHoverBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hover `citation`; a citation without a valid page clears the slot
    pub fn hover_enter(&mut self, citation: &Citation) -> bool {
        trace!(
            "hover citation {} ({}.{})",
            citation.id, citation.model_name, citation.field_name
        );
        self.current = Self::region_for(citation);
        self.current.is_some()
    }

    pub fn hover_leave(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<&HighlightRegion> {
        self.current.as_ref()
    }

    fn region_for(citation: &Citation) -> Option<HighlightRegion> {
        let page = usize::try_from(citation.page).ok()?;
        let region = HighlightRegion::new(
            page,
            DocRect::new(
                citation.x0 as f32,
                citation.y0 as f32,
                citation.x1 as f32,
                citation.y1 as f32,
            ),
            HighlightKind::Transient,
        )
        .with_label(citation.field_name.clone());
        Some(region)
    }
}
