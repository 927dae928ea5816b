//! Projection of persisted sections into static highlights

use log::trace;

use crate::highlight::{DocRect, HighlightKind, HighlightRegion};
use crate::records::Section;

/// Maps sections that carry a page and a full bounding box to static
/// highlights, in source order. Anything else is dropped, never defaulted.
#[derive(Clone, Copy, Debug, Default)]
pub struct SectionHighlightProjector;

impl SectionHighlightProjector {
    #[must_use]
    pub fn project(sections: &[Section]) -> Vec<HighlightRegion> {
        sections.iter().filter_map(Self::project_one).collect()
    }

    fn project_one(section: &Section) -> Option<HighlightRegion> {
        let page = section.page.and_then(|p| usize::try_from(p).ok());
        let bbox = (
            section.bbox_x0,
            section.bbox_y0,
            section.bbox_x1,
            section.bbox_y1,
        );
        let (Some(page), (Some(x0), Some(y0), Some(x1), Some(y1))) = (page, bbox) else {
            trace!("section {} has no usable location", section.id);
            return None;
        };

        Some(
            HighlightRegion::new(
                page,
                DocRect::new(x0 as f32, y0 as f32, x1 as f32, y1 as f32),
                HighlightKind::Static,
            )
            .with_label(section.title.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::section;

    fn full_box() -> [Option<f64>; 4] {
        [Some(50.0), Some(60.0), Some(200.0), Some(150.0)]
    }

    #[test]
    fn located_section_becomes_a_static_region() {
        let regions = SectionHighlightProjector::project(&[section(1, Some(0), full_box())]);

        assert_eq!(
            regions,
            vec![
                HighlightRegion::new(
                    0,
                    DocRect::new(50.0, 60.0, 200.0, 150.0),
                    HighlightKind::Static
                )
                .with_label("S1")
            ]
        );
    }

    #[test]
    fn sections_without_page_or_bbox_are_dropped() {
        let sections = [
            section(1, None, full_box()),
            section(2, Some(1), [None, Some(1.0), Some(2.0), Some(3.0)]),
            section(3, Some(1), [Some(1.0), Some(1.0), Some(2.0), None]),
            section(4, Some(-1), full_box()),
            section(5, Some(2), full_box()),
        ];

        let regions = SectionHighlightProjector::project(&sections);

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].page, 2);
        assert_eq!(regions[0].label.as_deref(), Some("S5"));
    }

    #[test]
    fn projection_is_pure_and_ordered() {
        let sections = [
            section(1, Some(3), full_box()),
            section(2, Some(0), full_box()),
            section(3, Some(3), full_box()),
        ];

        let first = SectionHighlightProjector::project(&sections);
        let second = SectionHighlightProjector::project(&sections);

        assert_eq!(first, second);
        let pages: Vec<_> = first.iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![3, 0, 3]);
        assert!(first.iter().all(|r| !r.is_transient()));
    }
}
