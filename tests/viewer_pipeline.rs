use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use citeview::compositor::DualPaneCompositor;
use citeview::export::export_surfaces;
use citeview::pdf::{DocumentSource, LoadStatus, PageSize, SessionConfig, ViewerSession};
use citeview::records::DocumentRecord;
use citeview::test_utils::test_helpers::{FakeBackend, citation, section};

const SETTLE: Duration = Duration::from_secs(5);
const ACCENT: [u8; 3] = [0xFF, 0xA5, 0x00];

fn session_for(backend: &FakeBackend) -> ViewerSession {
    ViewerSession::new(
        Arc::new(backend.clone()),
        SessionConfig {
            render_scale: 1.0,
            workers: 2,
            ..SessionConfig::default()
        },
    )
}

fn record_with(sections: Vec<citeview::records::Section>) -> DocumentRecord {
    DocumentRecord {
        id: 1,
        file: "a.pdf".into(),
        doc_type: Some("OM".into()),
        pages: Some(2),
        sections,
        property: None,
    }
}

fn poll_until(session: &mut ViewerSession, done: impl Fn(&ViewerSession) -> bool) -> bool {
    let deadline = Instant::now() + SETTLE;
    while Instant::now() < deadline {
        session.poll_responses();
        if done(session) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn pixel(session: &ViewerSession, page: usize, x: u32, y: u32) -> [u8; 3] {
    session
        .surfaces()
        .get(page)
        .expect("surface")
        .image()
        .get_pixel(x, y)
        .0
}

fn untouched(session: &ViewerSession, page: usize) -> bool {
    let surface = session.surfaces().get(page).expect("surface");
    surface.image() == surface.raster()
}

#[test]
fn geometry_has_one_positive_size_per_page() {
    let backend = FakeBackend::with_pages(&[(800.0, 1000.0), (800.0, 1100.0), (612.5, 792.0)]);
    let mut session = session_for(&backend);

    session.open(DocumentSource::from_path("a.pdf"));
    assert!(session.wait_until_settled(SETTLE));

    assert_eq!(
        session.geometry(),
        &[
            PageSize::new(800, 1000),
            PageSize::new(800, 1100),
            PageSize::new(613, 792),
        ]
    );
    assert_eq!(session.surfaces().len(), 3);
    assert_eq!(session.surfaces().rasterized_count(), 3);
    assert_eq!(session.status(), &LoadStatus::Ready);
}

#[test]
fn section_box_lands_on_its_page_only() {
    let backend = FakeBackend::with_pages(&[(800.0, 1000.0), (800.0, 1100.0)]);
    let source = DocumentSource::from_path("a.pdf");
    let page_color = FakeBackend::color_for(&source);
    let mut session = session_for(&backend);
    let mut compositor = DualPaneCompositor::default();
    compositor.load_record(&record_with(vec![section(
        1,
        Some(0),
        [Some(50.0), Some(60.0), Some(200.0), Some(150.0)],
    )]));

    session.open(source);
    session.set_highlights(compositor.merged());
    assert!(session.wait_until_settled(SETTLE));

    assert_eq!(pixel(&session, 0, 50, 100), ACCENT);
    assert_eq!(pixel(&session, 0, 199, 100), ACCENT);
    assert_ne!(pixel(&session, 0, 120, 100), page_color);
    assert_eq!(pixel(&session, 0, 10, 10), page_color);
    assert!(untouched(&session, 1));
}

#[test]
fn hovering_another_citation_moves_the_highlight() {
    let backend = FakeBackend::with_pages(&[(300.0, 300.0), (300.0, 300.0)]);
    let mut session = session_for(&backend);
    let mut compositor = DualPaneCompositor::default();
    compositor.set_citations(vec![
        citation(1, 0, [10.0, 10.0, 50.0, 50.0]),
        citation(2, 1, [100.0, 100.0, 150.0, 150.0]),
    ]);

    session.open(DocumentSource::from_path("a.pdf"));
    assert!(session.wait_until_settled(SETTLE));

    compositor.hover_citation(0);
    session.set_highlights(compositor.merged());
    assert!(!untouched(&session, 0));
    assert!(untouched(&session, 1));

    compositor.hover_citation(1);
    let report = session.set_highlights(compositor.merged());

    assert_eq!(report.drawn, 1);
    assert!(untouched(&session, 0));
    assert!(!untouched(&session, 1));
    assert_eq!(
        session.highlights().iter().filter(|r| r.is_transient()).count(),
        1
    );

    compositor.leave_hover();
    session.set_highlights(compositor.merged());
    assert!(untouched(&session, 0));
    assert!(untouched(&session, 1));
}

#[test]
fn section_with_missing_bbox_draws_nothing() {
    let backend = FakeBackend::with_pages(&[(300.0, 300.0)]);
    let mut session = session_for(&backend);
    let mut compositor = DualPaneCompositor::default();
    compositor.load_record(&record_with(vec![section(
        1,
        Some(0),
        [None, Some(10.0), Some(100.0), Some(100.0)],
    )]));

    session.open(DocumentSource::from_path("a.pdf"));
    let report = session.set_highlights(compositor.merged());
    assert_eq!(report.deferred, 0);
    assert!(session.wait_until_settled(SETTLE));

    assert!(compositor.static_regions().is_empty());
    assert!(untouched(&session, 0));
}

#[test]
fn switching_documents_keeps_stale_pixels_out() {
    let a = DocumentSource::from_path("a.pdf");
    let b = DocumentSource::from_path("b.pdf");
    let backend = FakeBackend::with_pages(&[(40.0, 40.0), (40.0, 40.0), (40.0, 40.0)])
        .with_document(&b, &[(30.0, 20.0)])
        .gated(&a);
    let mut session = session_for(&backend);

    session.open(a.clone());
    assert!(poll_until(&mut session, |s| s.geometry().len() == 3));

    session.open(b.clone());
    backend.release(&a);
    assert!(session.wait_until_settled(SETTLE));
    // let any late completion from `a` reach the session
    thread::sleep(Duration::from_millis(50));
    session.poll_responses();

    assert_eq!(session.source(), Some(&b));
    assert_eq!(session.geometry(), &[PageSize::new(30, 20)]);
    let surface = session.surfaces().get(0).expect("surface");
    let expected = FakeBackend::color_for(&b);
    assert!(surface.image().pixels().all(|p| p.0 == expected));
    assert_eq!(session.status(), &LoadStatus::Ready);
}

#[test]
fn closing_mid_render_leaves_nothing_behind() {
    let a = DocumentSource::from_path("a.pdf");
    let backend = FakeBackend::with_pages(&[(40.0, 40.0), (40.0, 40.0)]).gated(&a);
    let mut session = session_for(&backend);

    session.open(a.clone());
    assert!(poll_until(&mut session, |s| s.geometry().len() == 2));

    session.close();
    backend.release(&a);
    thread::sleep(Duration::from_millis(50));

    assert!(session.poll_responses().is_empty());
    assert_eq!(session.status(), &LoadStatus::Idle);
    assert!(session.source().is_none());
    assert!(session.geometry().is_empty());
    assert!(session.surfaces().is_empty());
}

#[test]
fn undecodable_document_leaves_an_empty_viewer() {
    let backend = FakeBackend::default().failing_open();
    let mut session = session_for(&backend);

    session.open(DocumentSource::from_path("broken.pdf"));
    assert!(session.wait_until_settled(SETTLE));

    assert!(matches!(session.status(), LoadStatus::Failed(_)));
    assert!(session.geometry().is_empty());
    assert!(session.surfaces().is_empty());
}

#[test]
fn geometry_is_all_or_nothing() {
    let backend =
        FakeBackend::with_pages(&[(10.0, 10.0), (10.0, 10.0), (10.0, 10.0)]).failing_bounds(1);
    let mut session = session_for(&backend);

    session.open(DocumentSource::from_path("a.pdf"));
    assert!(session.wait_until_settled(SETTLE));

    assert!(matches!(session.status(), LoadStatus::Failed(_)));
    assert!(session.geometry().is_empty());
    assert_eq!(backend.renders(), 0);
}

#[test]
fn one_broken_page_does_not_stop_the_others() {
    let backend = FakeBackend::with_pages(&[(10.0, 10.0), (10.0, 10.0)]).failing_render(1);
    let mut session = session_for(&backend);

    session.open(DocumentSource::from_path("a.pdf"));
    assert!(session.wait_until_settled(SETTLE));

    assert_eq!(session.status(), &LoadStatus::Ready);
    assert!(session.surfaces().get(0).expect("page 0").is_rasterized());
    assert!(!session.surfaces().get(1).expect("page 1").is_rasterized());
}

#[test]
fn reopening_uses_cached_rasters_and_reload_does_not() {
    let backend = FakeBackend::with_pages(&[(20.0, 20.0), (20.0, 20.0)]);
    let mut session = session_for(&backend);
    let source = DocumentSource::from_path("a.pdf");

    session.open(source.clone());
    assert!(session.wait_until_settled(SETTLE));
    assert_eq!(backend.renders(), 2);

    session.open(source);
    assert!(session.wait_until_settled(SETTLE));
    assert_eq!(backend.renders(), 2);
    assert_eq!(session.surfaces().rasterized_count(), 2);

    session.reload();
    assert!(session.wait_until_settled(SETTLE));
    assert_eq!(backend.renders(), 4);
}

#[test]
fn export_writes_highlighted_pages() {
    let backend = FakeBackend::with_pages(&[(120.0, 80.0), (120.0, 80.0)]);
    let mut session = session_for(&backend);
    let mut compositor = DualPaneCompositor::default();
    compositor.set_citations(vec![citation(1, 1, [20.0, 20.0, 60.0, 60.0])]);
    compositor.hover_citation(0);

    session.open(DocumentSource::from_path("a.pdf"));
    session.set_highlights(compositor.merged());
    assert!(session.wait_until_settled(SETTLE));

    let dir = tempfile::tempdir().expect("tempdir");
    let written = export_surfaces(session.surfaces(), dir.path()).expect("export");

    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("page-001.png"));
    let page2 = image::open(&written[1]).expect("png").to_rgb8();
    assert_eq!(page2.dimensions(), (120, 80));
    assert_eq!(page2.get_pixel(20, 40).0, ACCENT);
}
