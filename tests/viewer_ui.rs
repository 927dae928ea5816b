use std::sync::Arc;
use std::time::Duration;

use citeview::compositor::DualPaneCompositor;
use citeview::pdf::{DocumentSource, SessionConfig, ViewerSession};
use citeview::records::{DocumentRecord, Property};
use citeview::test_utils::test_helpers::{
    FakeBackend, TestScenarioBuilder, capture_terminal_state, citation, create_test_terminal,
    section,
};
use citeview::{App, run_app};

fn viewer(backend: FakeBackend, export_dir: &std::path::Path) -> App {
    let session = ViewerSession::new(
        Arc::new(backend),
        SessionConfig {
            render_scale: 1.0,
            workers: 1,
            ..SessionConfig::default()
        },
    );
    App::new(session, DualPaneCompositor::new(40), export_dir)
}

fn record() -> DocumentRecord {
    DocumentRecord {
        id: 3,
        file: "om.pdf".into(),
        doc_type: Some("OM".into()),
        pages: Some(2),
        sections: vec![
            section(1, Some(0), [Some(5.0), Some(5.0), Some(40.0), Some(30.0)]),
            section(2, None, [None; 4]),
        ],
        property: Some(Property {
            id: 9,
            name: Some("Harbor Point".into()),
            address: Some("1 Main St".into()),
            city: Some("Springfield".into()),
            state: Some("IL".into()),
            zipcode: Some("62701".into()),
            sqft: Some(12000),
            ..Property::default()
        }),
    }
}

#[test]
fn record_panel_and_pages_are_drawn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut app = viewer(
        FakeBackend::with_pages(&[(100.0, 120.0), (100.0, 120.0)]),
        dir.path(),
    );
    app.open_document(
        DocumentSource::from_path("om.pdf"),
        Some(&record()),
        vec![
            citation(1, 0, [10.0, 10.0, 30.0, 20.0]),
            citation(2, 1, [40.0, 40.0, 60.0, 60.0]),
        ],
    );
    assert!(app.wait_until_settled(Duration::from_secs(5)));
    let mut terminal = create_test_terminal(100, 30);
    let mut events = TestScenarioBuilder::new().citation_down(1).build();

    run_app(&mut terminal, &mut app, &mut events).expect("app loop");

    let screen = capture_terminal_state(&terminal);
    assert!(screen.contains("Harbor Point"), "{screen}");
    assert!(screen.contains("Citations (2)"), "{screen}");
    assert!(screen.contains("▶ field1"), "{screen}");
    assert!(screen.contains("Extracted Sections"), "{screen}");
    assert!(screen.contains("Refer: Page-1"), "{screen}");
    assert!(screen.contains("page 1"), "{screen}");
    assert!(screen.contains("▀"), "{screen}");
    assert!(screen.contains("2 page(s)"), "{screen}");
}

#[test]
fn export_key_writes_pngs_of_the_current_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("export");
    let mut app = viewer(FakeBackend::with_pages(&[(30.0, 30.0)]), &out);
    app.open_document(
        DocumentSource::from_path("om.pdf"),
        None,
        vec![citation(1, 0, [2.0, 2.0, 10.0, 10.0])],
    );
    assert!(app.wait_until_settled(Duration::from_secs(5)));
    let mut terminal = create_test_terminal(80, 20);
    let mut events = TestScenarioBuilder::new()
        .citation_down(1)
        .press_char('e')
        .build();

    run_app(&mut terminal, &mut app, &mut events).expect("app loop");

    assert!(out.join("page-001.png").exists());
    assert!(
        app.hud()
            .is_some_and(|hud| hud.message.starts_with("Exported 1 page(s)"))
    );
}

#[test]
fn scrolling_moves_through_stacked_pages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut app = viewer(
        FakeBackend::with_pages(&[(60.0, 200.0), (60.0, 200.0), (60.0, 200.0)]),
        dir.path(),
    );
    app.open_document(DocumentSource::from_path("tall.pdf"), None, vec![]);
    assert!(app.wait_until_settled(Duration::from_secs(5)));
    let mut terminal = create_test_terminal(100, 20);
    let mut events = TestScenarioBuilder::new()
        .press_char('J')
        .press_char('J')
        .build();

    run_app(&mut terminal, &mut app, &mut events).expect("app loop");
    assert!(app.view().scroll > 0);

    let mut events = TestScenarioBuilder::new()
        .press_char('K')
        .press_char('K')
        .press_char('K')
        .build();
    run_app(&mut terminal, &mut app, &mut events).expect("app loop");
    assert_eq!(app.view().scroll, 0);
}
