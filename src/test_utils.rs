pub mod test_helpers {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Condvar, Mutex, PoisonError};

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::event_source::{Event, KeyCode, KeyEvent, KeyModifiers, SimulatedEventSource};
    use crate::records::{Citation, Section};
    use crate::pdf::{
        DocumentBackend, DocumentHandle, DocumentSource, PageRaster, PageSize, ViewerFault,
    };

    /// Builder for creating test scenarios with simulated user input
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        /// Press Esc
        pub fn press_esc(mut self) -> Self {
            self.events.push(Event::Key(KeyEvent {
                code: KeyCode::Esc,
                modifiers: KeyModifiers::empty(),
                kind: crossterm::event::KeyEventKind::Press,
                state: crossterm::event::KeyEventState::empty(),
            }));
            self
        }

        /// Move the citation cursor down n times (press 'j' n times)
        pub fn citation_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Move the citation cursor up n times (press 'k' n times)
        pub fn citation_up(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('k'));
            }
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::char_key('q'));
            self
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Citation record on `page` covering `rect` (x0, y0, x1, y1)
    pub fn citation(id: i64, page: i64, rect: [f64; 4]) -> Citation {
        Citation {
            id,
            model_name: "Property".into(),
            record_id: 1,
            field_name: format!("field{id}"),
            page,
            x0: rect[0],
            y0: rect[1],
            x1: rect[2],
            y1: rect[3],
            snippet: None,
        }
    }

    /// Section record titled `S{id}`
    pub fn section(id: i64, page: Option<i64>, bbox: [Option<f64>; 4]) -> Section {
        Section {
            id,
            page,
            title: format!("S{id}"),
            text: String::new(),
            bbox_x0: bbox[0],
            bbox_y0: bbox[1],
            bbox_x1: bbox[2],
            bbox_y1: bbox[3],
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).expect("test backend never fails")
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }

    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        cond: Condvar,
    }

    impl Gate {
        fn wait(&self) {
            let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
            while !*open {
                open = self.cond.wait(open).unwrap_or_else(PoisonError::into_inner);
            }
        }

        fn release(&self) {
            *self.open.lock().unwrap_or_else(PoisonError::into_inner) = true;
            self.cond.notify_all();
        }
    }

    #[derive(Default)]
    struct FakeState {
        default_pages: Vec<(f32, f32)>,
        documents: HashMap<String, Vec<(f32, f32)>>,
        failing_open: bool,
        failing_bounds: Option<usize>,
        failing_render: Option<usize>,
        gates: HashMap<String, Arc<Gate>>,
        bounds_queries: AtomicUsize,
        renders: AtomicUsize,
    }

    /// In-memory document backend.
    ///
    /// Pages are solid rectangles whose colour is derived from the source,
    /// so tests can tell which document produced a pixel. Renders of a gated
    /// source block until [`FakeBackend::release`] is called.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        state: Arc<FakeState>,
    }

    impl FakeBackend {
        pub fn with_pages(pages: &[(f32, f32)]) -> Self {
            Self {
                state: Arc::new(FakeState {
                    default_pages: pages.to_vec(),
                    ..FakeState::default()
                }),
            }
        }

        fn edit(mut self, f: impl FnOnce(&mut FakeState)) -> Self {
            let state = Arc::get_mut(&mut self.state).expect("configure before sharing");
            f(state);
            self
        }

        /// Give one source its own page list
        pub fn with_document(self, source: &DocumentSource, pages: &[(f32, f32)]) -> Self {
            let key = source.key().to_string();
            let pages = pages.to_vec();
            self.edit(|s| {
                s.documents.insert(key, pages);
            })
        }

        /// Every open fails as if the bytes were not a PDF
        pub fn failing_open(self) -> Self {
            self.edit(|s| s.failing_open = true)
        }

        pub fn failing_bounds(self, page: usize) -> Self {
            self.edit(|s| s.failing_bounds = Some(page))
        }

        pub fn failing_render(self, page: usize) -> Self {
            self.edit(|s| s.failing_render = Some(page))
        }

        /// Hold every render of `source` until released
        pub fn gated(self, source: &DocumentSource) -> Self {
            let key = source.key().to_string();
            self.edit(|s| {
                s.gates.insert(key, Arc::new(Gate::default()));
            })
        }

        pub fn release(&self, source: &DocumentSource) {
            if let Some(gate) = self.state.gates.get(source.key()) {
                gate.release();
            }
        }

        pub fn bounds_queries(&self) -> usize {
            self.state.bounds_queries.load(Ordering::SeqCst)
        }

        pub fn renders(&self) -> usize {
            self.state.renders.load(Ordering::SeqCst)
        }

        /// Fill colour of every page rendered from `source`
        pub fn color_for(source: &DocumentSource) -> [u8; 3] {
            let digest = md5::compute(source.key().as_bytes());
            // keep away from white so highlights stay distinguishable
            [digest[0] / 2, digest[1] / 2, digest[2] / 2]
        }
    }

    struct FakeHandle {
        state: Arc<FakeState>,
        pages: Vec<(f32, f32)>,
        color: [u8; 3],
        gate: Option<Arc<Gate>>,
    }

    impl DocumentBackend for FakeBackend {
        fn open(&self, source: &DocumentSource) -> Result<Box<dyn DocumentHandle>, ViewerFault> {
            if self.state.failing_open {
                return Err(ViewerFault::decode("not a PDF"));
            }
            let pages = self
                .state
                .documents
                .get(source.key())
                .unwrap_or(&self.state.default_pages)
                .clone();
            Ok(Box::new(FakeHandle {
                state: Arc::clone(&self.state),
                pages,
                color: Self::color_for(source),
                gate: self.state.gates.get(source.key()).cloned(),
            }))
        }
    }

    impl DocumentHandle for FakeHandle {
        fn page_count(&self) -> Result<usize, ViewerFault> {
            Ok(self.pages.len())
        }

        fn page_bounds(&self, page: usize) -> Result<(f32, f32), ViewerFault> {
            self.state.bounds_queries.fetch_add(1, Ordering::SeqCst);
            if self.state.failing_bounds == Some(page) {
                return Err(ViewerFault::decode("broken page tree"));
            }
            self.pages
                .get(page)
                .copied()
                .ok_or_else(|| ViewerFault::decode(format!("no page {page}")))
        }

        fn render(&self, page: usize, scale: f32) -> Result<PageRaster, ViewerFault> {
            if let Some(gate) = &self.gate {
                gate.wait();
            }
            self.state.renders.fetch_add(1, Ordering::SeqCst);
            if self.state.failing_render == Some(page) {
                return Err(ViewerFault::render(page, "corrupt content stream"));
            }
            let (w, h) = self.page_bounds(page)?;
            Ok(PageRaster::filled(
                PageSize::from_points(w, h, scale),
                self.color,
            ))
        }
    }
}
