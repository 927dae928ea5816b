//! Interactive viewer: document pane, record panel and the event loop

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info, warn};
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::compositor::DualPaneCompositor;
use crate::event_source::{Event, EventSource, KeyCode, KeyEvent, KeyModifiers, MouseEventKind};
use crate::export::export_surfaces;
use crate::pdf::{DocumentSource, Generation, LoadStatus, SessionEvent, ViewerSession};
use crate::records::{Citation, DocumentRecord};
use crate::theme::{Base16Palette, current_theme};
use crate::widget::{DocumentPane, DocumentView, HudMessage, SidePanel, citation_at};

const HELP_TEXT: &str = "j/k cite  Esc clear  J/K scroll  Tab section  e export  r reload  q quit";
const WHEEL_STEP: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

/// Everything an event can change that shows up on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Visible {
    revision: u64,
    scroll: u32,
    selected: Option<usize>,
    hud: Option<Instant>,
    generation: Generation,
}

pub struct App {
    session: ViewerSession,
    compositor: DualPaneCompositor,
    view: DocumentView,
    palette: &'static Base16Palette,
    export_dir: PathBuf,
    synced_revision: Option<u64>,
    hud: Option<HudMessage>,
    document_area: Rect,
    side_panel_area: Rect,
    hovered_by_mouse: bool,
    dirty: bool,
}

impl App {
    pub fn new(
        session: ViewerSession,
        compositor: DualPaneCompositor,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session,
            compositor,
            view: DocumentView::default(),
            palette: current_theme(),
            export_dir: export_dir.into(),
            synced_revision: None,
            hud: None,
            document_area: Rect::default(),
            side_panel_area: Rect::default(),
            hovered_by_mouse: false,
            dirty: true,
        }
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    pub fn compositor(&self) -> &DualPaneCompositor {
        &self.compositor
    }

    pub fn view(&self) -> DocumentView {
        self.view
    }

    pub fn hud(&self) -> Option<&HudMessage> {
        self.hud.as_ref()
    }

    /// Show `source` with its record and citations, replacing everything
    pub fn open_document(
        &mut self,
        source: DocumentSource,
        record: Option<&DocumentRecord>,
        citations: Vec<Citation>,
    ) {
        self.session.open(source);
        self.compositor.clear();
        if let Some(record) = record {
            self.compositor.load_record(record);
        }
        self.compositor.set_citations(citations);
        self.view = DocumentView::default();
        self.hovered_by_mouse = false;
        self.synced_revision = None;
        self.sync_highlights();
    }

    /// Block until the current document settles; used by tests and export
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        let settled = self.session.wait_until_settled(timeout);
        self.dirty = true;
        settled
    }

    /// Push the compositor's regions to the session if they changed
    pub fn sync_highlights(&mut self) {
        let revision = self.compositor.revision();
        if self.synced_revision == Some(revision) {
            return;
        }
        let report = self.session.set_highlights(self.compositor.merged());
        debug!(
            "Highlights rev {revision}: {} drawn, {} deferred",
            report.drawn, report.deferred
        );
        self.synced_revision = Some(revision);
        self.dirty = true;
    }

    /// Apply finished worker responses and expire notices
    pub fn tick(&mut self) {
        for event in self.session.poll_responses() {
            match event {
                SessionEvent::GeometryCommitted { pages } => {
                    debug!("Showing {pages} page(s)");
                    self.view.clamp(self.session.surfaces(), self.document_area);
                }
                SessionEvent::DecodeFailed(detail) => {
                    self.hud = Some(HudMessage::error(format!("Could not open: {detail}")));
                }
                SessionEvent::PageFailed(page) => {
                    self.hud = Some(HudMessage::error(format!(
                        "Page {} failed to render",
                        page + 1
                    )));
                }
                SessionEvent::PageRendered(_) => {}
            }
            self.dirty = true;
        }
        if self.hud.as_ref().is_some_and(HudMessage::is_expired) {
            self.hud = None;
            self.dirty = true;
        }
    }

    /// Whether a redraw is due; clears the flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        let before = self.visible();
        let action = self.dispatch(event);
        if matches!(event, Event::Resize(..)) || self.visible() != before {
            self.dirty = true;
        }
        action
    }

    fn visible(&self) -> Visible {
        Visible {
            revision: self.compositor.revision(),
            scroll: self.view.scroll,
            selected: self.compositor.selected_record(),
            hud: self.hud.as_ref().map(|hud| hud.expires_at),
            generation: self.session.generation(),
        }
    }

    fn dispatch(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) => self.handle_key(*key),
            Event::Mouse(mouse) => {
                match mouse.kind {
                    MouseEventKind::Moved => self.handle_pointer(mouse.column, mouse.row),
                    MouseEventKind::ScrollDown => self.scroll(WHEEL_STEP),
                    MouseEventKind::ScrollUp => self.scroll(-WHEEL_STEP),
                    _ => {}
                }
                None
            }
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(AppAction::Quit);
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_citation_cursor(true),
            KeyCode::Char('k') | KeyCode::Up => self.move_citation_cursor(false),
            KeyCode::Esc => {
                self.compositor.leave_hover();
                self.hovered_by_mouse = false;
            }
            KeyCode::Char('J') | KeyCode::PageDown => self.scroll(self.half_page()),
            KeyCode::Char('K') | KeyCode::PageUp => self.scroll(-self.half_page()),
            KeyCode::Tab => self.cycle_section(),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        None
    }

    fn move_citation_cursor(&mut self, forward: bool) {
        let count = self.compositor.citations().len();
        if count == 0 {
            return;
        }
        let next = match (self.compositor.hovered_index(), forward) {
            (Some(i), true) => (i + 1).min(count - 1),
            (Some(i), false) => i.saturating_sub(1),
            (None, true) => 0,
            (None, false) => count - 1,
        };
        self.hovered_by_mouse = false;
        self.hover(next);
    }

    /// Hover the citation at `index` and repaint right away
    pub fn hover_citation(&mut self, index: usize) -> bool {
        self.hover(index);
        self.sync_highlights();
        self.compositor.hovered_index() == Some(index)
    }

    fn hover(&mut self, index: usize) {
        if self.compositor.hovered_index() == Some(index) {
            return;
        }
        self.compositor.hover_citation(index);
    }

    fn handle_pointer(&mut self, column: u16, row: u16) {
        let hit = citation_at(
            self.side_panel_area,
            &self.compositor,
            self.palette,
            column,
            row,
        );
        match hit {
            Some(index) => {
                self.hovered_by_mouse = true;
                self.hover(index);
            }
            None if self.hovered_by_mouse => {
                self.hovered_by_mouse = false;
                self.compositor.leave_hover();
            }
            None => {}
        }
    }

    fn cycle_section(&mut self) {
        let count = self.compositor.sections().len();
        if count == 0 {
            return;
        }
        let next = self
            .compositor
            .selected_record()
            .map_or(0, |i| (i + 1) % count);
        self.compositor.select_record(Some(next));
    }

    fn half_page(&self) -> i32 {
        i32::from((self.document_area.height / 2).max(1))
    }

    fn scroll(&mut self, delta: i32) {
        self.view
            .scroll_by(delta, self.session.surfaces(), self.document_area);
    }

    fn reload(&mut self) {
        if self.session.source().is_none() {
            return;
        }
        info!("Reloading current document");
        self.session.reload();
        self.synced_revision = None;
        self.sync_highlights();
        self.hud = Some(HudMessage::info("Reloading"));
    }

    fn export(&mut self) {
        if self.session.surfaces().is_empty() {
            self.hud = Some(HudMessage::error("Nothing to export"));
            return;
        }
        self.hud = Some(match export_surfaces(self.session.surfaces(), &self.export_dir) {
            Ok(written) => HudMessage::info(format!(
                "Exported {} page(s) to {}",
                written.len(),
                self.export_dir.display()
            )),
            Err(e) => {
                warn!("Export failed: {e}");
                HudMessage::error(format!("Export failed: {e}"))
            }
        });
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    fn status_text(&self) -> String {
        let name = self
            .session
            .source()
            .map_or_else(|| "no document".to_string(), ToString::to_string);
        let state = match self.session.status() {
            LoadStatus::Idle => "idle".to_string(),
            LoadStatus::Resolving => "loading".to_string(),
            LoadStatus::Rendering { done, total } => format!("rendering {done}/{total}"),
            LoadStatus::Ready => format!("{} page(s)", self.session.geometry().len()),
            LoadStatus::Failed(_) => "failed".to_string(),
        };
        format!(" {name} | {state} ")
    }

    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        let [main, status] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());
        let layout = self.compositor.layout(main);
        self.document_area = layout.document;
        self.side_panel_area = layout.side_panel;
        self.view.clamp(self.session.surfaces(), self.document_area);

        frame.render_widget(
            DocumentPane::new(
                self.session.surfaces(),
                self.session.status(),
                self.view,
                self.palette,
            ),
            layout.document,
        );
        frame.render_widget(SidePanel::new(&self.compositor, self.palette), layout.side_panel);
        self.draw_status_bar(frame, status);
    }

    fn draw_status_bar(&self, frame: &mut Frame<'_>, area: Rect) {
        let left = Span::styled(
            self.status_text(),
            Style::new().fg(self.palette.base_00).bg(self.palette.base_0d),
        );
        let right = match &self.hud {
            Some(hud) => hud.styled_line(self.palette),
            None => Line::from(Span::styled(
                HELP_TEXT,
                Style::new().fg(self.palette.base_03),
            )),
        };
        let left_width = u16::try_from(left.width()).unwrap_or(u16::MAX);
        let [left_area, right_area] =
            Layout::horizontal([Constraint::Length(left_width), Constraint::Min(0)])
                .areas(area);
        frame.render_widget(Paragraph::new(Line::from(left)), left_area);
        frame.render_widget(Paragraph::new(right.right_aligned()), right_area);
    }
}

/// Drive `app` until the user quits
pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    loop {
        app.tick();
        app.sync_highlights();
        if app.take_dirty() {
            terminal.draw(|f| app.draw(f))?;
        }

        if event_source.poll(tick_rate)? {
            let event = event_source.read()?;
            if app.handle_event(&event) == Some(AppAction::Quit) {
                info!("Quit requested");
                return Ok(());
            }
        }
    }
}
