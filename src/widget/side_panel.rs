//! Side panel listing the record next to the document
//!
//! Top to bottom: property summary, citations (the hovered one marked) and
//! extracted sections with their page reference.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::compositor::DualPaneCompositor;
use crate::theme::Base16Palette;

const HOVER_MARKER: &str = "▶ ";
const IDLE_MARKER: &str = "  ";

/// Areas inside the panel border
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PanelAreas {
    property: Rect,
    citations: Rect,
    sections: Rect,
}

fn panel_block(palette: &Base16Palette) -> Block<'static> {
    Block::default()
        .borders(Borders::LEFT)
        .border_style(Style::new().fg(palette.base_02))
        .title(Span::styled(
            " Record ",
            Style::new().fg(palette.base_0d).add_modifier(Modifier::BOLD),
        ))
}

fn panel_areas(area: Rect, compositor: &DualPaneCompositor, palette: &Base16Palette) -> PanelAreas {
    let inner = panel_block(palette).inner(area);
    let property_rows = if compositor.property().is_some() { 3 } else { 0 };
    let citation_rows = {
        let listed = compositor.citations().len().max(1);
        let wanted = u16::try_from(listed).unwrap_or(u16::MAX).saturating_add(1);
        wanted.min((inner.height / 2).max(2))
    };
    let [property, citations, _, sections] = Layout::vertical([
        Constraint::Length(property_rows),
        Constraint::Length(citation_rows),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(inner);
    PanelAreas {
        property,
        citations,
        sections,
    }
}

/// First citation shown, keeping the hovered row visible
fn citation_offset(citations_area: Rect, hovered: Option<usize>) -> usize {
    let visible = usize::from(citations_area.height.saturating_sub(1)).max(1);
    match hovered {
        Some(index) if index >= visible => index + 1 - visible,
        _ => 0,
    }
}

/// Index of the citation drawn at terminal cell (`column`, `row`)
#[must_use]
pub fn citation_at(
    area: Rect,
    compositor: &DualPaneCompositor,
    palette: &Base16Palette,
    column: u16,
    row: u16,
) -> Option<usize> {
    let areas = panel_areas(area, compositor, palette);
    if !areas.citations.contains(Position::new(column, row)) || row == areas.citations.y {
        return None;
    }
    let offset = citation_offset(areas.citations, compositor.hovered_index());
    let index = offset + usize::from(row - areas.citations.y - 1);
    (index < compositor.citations().len()).then_some(index)
}

pub struct SidePanel<'a> {
    compositor: &'a DualPaneCompositor,
    palette: &'a Base16Palette,
}

impl<'a> SidePanel<'a> {
    #[must_use]
    pub fn new(compositor: &'a DualPaneCompositor, palette: &'a Base16Palette) -> Self {
        Self {
            compositor,
            palette,
        }
    }

    fn heading(&self, text: String) -> Line<'static> {
        Line::from(Span::styled(
            text,
            Style::new()
                .fg(self.palette.base_0a)
                .add_modifier(Modifier::BOLD),
        ))
    }

    fn property_text(&self) -> Text<'static> {
        let Some(property) = self.compositor.property() else {
            return Text::default();
        };
        let name = property
            .name
            .clone()
            .unwrap_or_else(|| format!("Property #{}", property.id));
        Text::from(vec![
            Line::from(Span::styled(
                name,
                Style::new()
                    .fg(self.palette.base_06)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                property.summary_line(),
                Style::new().fg(self.palette.base_04),
            )),
        ])
    }

    fn citation_lines(&self, area: Rect) -> Vec<Line<'static>> {
        let citations = self.compositor.citations();
        let hovered = self.compositor.hovered_index();
        let mut lines = vec![self.heading(format!("Citations ({})", citations.len()))];
        if citations.is_empty() {
            lines.push(Line::from(Span::styled(
                "  none",
                Style::new().fg(self.palette.base_03),
            )));
            return lines;
        }

        let offset = citation_offset(area, hovered);
        let visible = usize::from(area.height.saturating_sub(1));
        for (index, citation) in citations.iter().enumerate().skip(offset).take(visible) {
            let is_hovered = hovered == Some(index);
            let (marker, style) = if is_hovered {
                (
                    HOVER_MARKER,
                    Style::new()
                        .fg(self.palette.base_00)
                        .bg(self.palette.base_09)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                (IDLE_MARKER, Style::new().fg(self.palette.base_05))
            };
            lines.push(Line::from(vec![
                Span::styled(marker, style),
                Span::styled(format!("{} ", citation.field_name), style),
                Span::styled(
                    citation.display_label(),
                    if is_hovered {
                        style
                    } else {
                        Style::new().fg(self.palette.base_03)
                    },
                ),
            ]));
        }
        lines
    }

    fn section_text(&self) -> Text<'static> {
        let sections = self.compositor.sections();
        let mut lines = vec![self.heading("Extracted Sections".to_string())];
        if sections.is_empty() {
            lines.push(Line::from(Span::styled(
                "No sections",
                Style::new().fg(self.palette.base_03),
            )));
        }

        let selected = self.compositor.selected_record();
        for (index, section) in sections.iter().enumerate() {
            let mut title_style = Style::new()
                .fg(self.palette.base_0d)
                .add_modifier(Modifier::BOLD);
            if selected == Some(index) {
                title_style = title_style.bg(self.palette.base_02);
            }
            lines.push(Line::from(Span::styled(
                section.display_title().to_string(),
                title_style,
            )));
            lines.push(Line::from(Span::styled(
                section.page_reference(),
                Style::new()
                    .fg(self.palette.base_03)
                    .add_modifier(Modifier::ITALIC),
            )));
            if !section.text.is_empty() {
                lines.push(Line::from(Span::styled(
                    section.text.clone(),
                    Style::new().fg(self.palette.base_05),
                )));
            }
            lines.push(Line::default());
        }
        Text::from(lines)
    }
}

impl Widget for SidePanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let areas = panel_areas(area, self.compositor, self.palette);
        panel_block(self.palette).render(area, buf);

        Paragraph::new(self.property_text())
            .wrap(Wrap { trim: true })
            .render(areas.property, buf);
        Paragraph::new(self.citation_lines(areas.citations)).render(areas.citations, buf);
        Paragraph::new(self.section_text())
            .wrap(Wrap { trim: false })
            .render(areas.sections, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::citation;
    use crate::theme::OCEANIC_NEXT;

    fn compositor_with(count: i64) -> DualPaneCompositor {
        let mut compositor = DualPaneCompositor::default();
        compositor.set_citations((0..count).map(|i| citation(i, 0, [0.0; 4])).collect());
        compositor
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (buf.area.x..buf.area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect()
    }

    #[test]
    fn rows_map_back_to_citations() {
        let compositor = compositor_with(3);
        let area = Rect::new(50, 0, 30, 20);
        let mut buf = Buffer::empty(area);
        SidePanel::new(&compositor, &OCEANIC_NEXT).render(area, &mut buf);

        let first = (0..area.height)
            .find(|y| row_text(&buf, *y).contains("field0"))
            .expect("first citation drawn");
        let hit = |column, row| citation_at(area, &compositor, &OCEANIC_NEXT, column, row);

        assert_eq!(hit(52, first - 1), None);
        assert_eq!(hit(52, first), Some(0));
        assert_eq!(hit(52, first + 2), Some(2));
        assert_eq!(hit(52, first + 3), None);
        assert_eq!(hit(10, first), None);
    }

    #[test]
    fn hovered_citation_stays_visible() {
        let mut compositor = compositor_with(30);
        compositor.hover_citation(25);
        let area = Rect::new(0, 0, 40, 12);

        let mut buf = Buffer::empty(area);
        SidePanel::new(&compositor, &OCEANIC_NEXT).render(area, &mut buf);

        let rendered: Vec<String> = (0..area.height).map(|y| row_text(&buf, y)).collect();
        assert!(rendered.iter().any(|l| l.contains("▶ field25")));
        let hovered_row = rendered
            .iter()
            .position(|l| l.contains("▶ field25"))
            .expect("hovered row drawn") as u16;
        assert_eq!(
            citation_at(area, &compositor, &OCEANIC_NEXT, 2, hovered_row),
            Some(25)
        );
    }

    #[test]
    fn sections_show_their_page_reference() {
        let mut compositor = DualPaneCompositor::default();
        compositor.load_record(&crate::records::DocumentRecord {
            id: 7,
            file: "a.pdf".into(),
            doc_type: None,
            pages: None,
            sections: vec![crate::test_utils::test_helpers::section(
                1,
                Some(2),
                [None; 4],
            )],
            property: None,
        });
        let area = Rect::new(0, 0, 40, 12);

        let mut buf = Buffer::empty(area);
        SidePanel::new(&compositor, &OCEANIC_NEXT).render(area, &mut buf);

        let rendered: Vec<String> = (0..area.height).map(|y| row_text(&buf, y)).collect();
        assert!(rendered.iter().any(|l| l.contains("Extracted Sections")));
        assert!(rendered.iter().any(|l| l.contains("Refer: Page-3")));
    }
}
