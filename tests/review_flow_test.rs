//! End-to-end review flows driven through the scripted event source.

use std::time::Duration;

use pagemark::anchor::{PixelPoint, SurfaceDimensions};
use pagemark::assignment::{Assignment, AssignmentQueue};
use pagemark::event_source::{Event, EventSource, KeyCode, ScriptedEventSource};
use pagemark::navigation::{RenderOutcome, RenderRequest};
use pagemark::session::ReviewSession;
use pagemark::store::MemoryStore;

const SURFACE_SIDE: f64 = 500.0;

fn new_session(pages: u32) -> (ReviewSession, flume::Receiver<RenderRequest>) {
    let (tx, rx) = flume::unbounded();
    let assignments = AssignmentQueue::new(vec![
        Assignment::from_filename("Ada_Essay One.pdf", pages),
        Assignment::from_filename("Bob_Essay Two.pdf", pages),
    ]);
    let mut session = ReviewSession::new(tx, Box::new(MemoryStore::new()), assignments);
    session.activate_current_assignment();
    (session, rx)
}

/// Answer every outstanding render request with a square surface scaled by
/// the requested zoom, the way the stub renderer does.
fn settle_all(session: &mut ReviewSession, rx: &flume::Receiver<RenderRequest>) {
    while let Ok(request) = rx.try_recv() {
        let side = SURFACE_SIDE * f64::from(request.scale);
        session.render_settled(RenderOutcome {
            ticket: request.ticket,
            page: request.page,
            generation: request.generation,
            result: Ok(SurfaceDimensions::new(side, side)),
        });
    }
}

fn run_script(session: &mut ReviewSession, events: Vec<Event>) {
    let mut source = ScriptedEventSource::new(events);
    while source.poll(Duration::ZERO).unwrap() {
        let event = source.read().unwrap();
        session.handle_event(&event);
    }
}

fn first_annotation_id(session: &ReviewSession) -> String {
    session.editor().annotations().all()[0].id.clone()
}

#[test]
fn overview_to_focused_annotation_flow() {
    let (mut session, rx) = new_session(5);
    settle_all(&mut session, &rx);

    // Walk the highlight to page 3 and enter it.
    run_script(
        &mut session,
        vec![
            ScriptedEventSource::key(KeyCode::Right),
            ScriptedEventSource::key(KeyCode::Right),
            ScriptedEventSource::key(KeyCode::Enter),
        ],
    );
    assert_eq!(session.view().focused_page(), Some(3));

    // Click the surface and type a note.
    session
        .annotate_at(PixelPoint::new(125.0, 125.0))
        .unwrap();
    let mut events = ScriptedEventSource::typed("Looks good");
    events.push(ScriptedEventSource::key(KeyCode::Enter));
    run_script(&mut session, events);

    let annotations = session.editor().annotations().all();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].page_number, 3);
    assert_eq!(annotations[0].text, "Looks good");
    assert!((annotations[0].anchor.relative_x - 0.25).abs() < 1e-9);
    assert!((annotations[0].anchor.relative_y - 0.25).abs() < 1e-9);
}

#[test]
fn zoom_rerender_keeps_annotation_pinned() {
    let (mut session, rx) = new_session(2);
    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Enter)]);

    session.annotate_at(PixelPoint::new(100.0, 100.0)).unwrap();
    let mut events = ScriptedEventSource::typed("pinned");
    events.push(ScriptedEventSource::key(KeyCode::Enter));
    run_script(&mut session, events);

    run_script(&mut session, vec![ScriptedEventSource::char_key('+')]);
    assert_eq!(session.page_info().unwrap(), "Page 1 of 2 (120%)");
    settle_all(&mut session, &rx);

    let placements = session.placements_for_page(1);
    assert_eq!(placements.len(), 1);
    assert!((placements[0].pixel.x - 120.0).abs() < 1e-6);
    assert!((placements[0].pixel.y - 120.0).abs() < 1e-6);
}

#[test]
fn zoom_guard_drops_second_zoom_until_settled() {
    let (mut session, rx) = new_session(2);
    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Enter)]);

    run_script(&mut session, vec![ScriptedEventSource::char_key('+')]);
    assert!((session.scale() - 1.2).abs() < 1e-6);

    // Second zoom while the re-render is outstanding: dropped, not queued.
    run_script(&mut session, vec![ScriptedEventSource::char_key('+')]);
    assert!((session.scale() - 1.2).abs() < 1e-6);

    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::char_key('+')]);
    assert!((session.scale() - 1.4).abs() < 1e-6);
}

#[test]
fn escape_cancels_input_before_leaving_focused_mode() {
    let (mut session, rx) = new_session(3);
    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Enter)]);

    session.annotate_at(PixelPoint::new(10.0, 10.0)).unwrap();
    run_script(&mut session, ScriptedEventSource::typed("discarded"));

    // First escape closes the input and stays focused.
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Esc)]);
    assert!(session.input().is_none());
    assert_eq!(session.view().focused_page(), Some(1));
    assert!(session.editor().annotations().is_empty());

    // Second escape leaves focused mode.
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Esc)]);
    assert!(session.view().is_overview());
}

#[test]
fn drag_commits_against_current_surface() {
    let (mut session, rx) = new_session(2);
    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Enter)]);

    session.annotate_at(PixelPoint::new(125.0, 125.0)).unwrap();
    let mut events = ScriptedEventSource::typed("movable");
    events.push(ScriptedEventSource::key(KeyCode::Enter));
    run_script(&mut session, events);

    let id = first_annotation_id(&session);
    session.annotation_pressed(&id);
    session.pointer_dragged(PixelPoint::new(250.0, 250.0));
    session.pointer_released();

    let annotation = session.editor().annotations().get(&id).unwrap();
    assert!((annotation.anchor.relative_x - 0.5).abs() < 1e-9);
    assert!((annotation.anchor.relative_y - 0.5).abs() < 1e-9);
}

#[test]
fn edit_via_secondary_interaction() {
    let (mut session, rx) = new_session(2);
    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Enter)]);

    session.annotate_at(PixelPoint::new(50.0, 50.0)).unwrap();
    let mut events = ScriptedEventSource::typed("draft");
    events.push(ScriptedEventSource::key(KeyCode::Enter));
    run_script(&mut session, events);

    let id = first_annotation_id(&session);
    session.annotation_edit_requested(&id);
    assert_eq!(session.input().unwrap().buffer(), "draft");

    let mut events: Vec<Event> = std::iter::repeat_n(
        ScriptedEventSource::key(KeyCode::Backspace),
        "draft".len(),
    )
    .collect();
    events.extend(ScriptedEventSource::typed("final"));
    events.push(ScriptedEventSource::key(KeyCode::Enter));
    run_script(&mut session, events);

    assert_eq!(
        session.editor().annotations().get(&id).unwrap().text,
        "final"
    );
}

#[test]
fn assignment_switch_round_trips_through_store() {
    let (mut session, rx) = new_session(2);
    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Enter)]);

    session.annotate_at(PixelPoint::new(10.0, 10.0)).unwrap();
    let mut events = ScriptedEventSource::typed("for Ada");
    events.push(ScriptedEventSource::key(KeyCode::Enter));
    run_script(&mut session, events);

    run_script(&mut session, vec![ScriptedEventSource::char_key(']')]);
    assert_eq!(session.assignments().current().unwrap().student_name, "Bob");
    assert!(session.editor().annotations().is_empty());
    settle_all(&mut session, &rx);

    run_script(&mut session, vec![ScriptedEventSource::char_key('[')]);
    let annotations = session.editor().annotations().all();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].text, "for Ada");
}

#[test]
fn export_import_round_trip_through_file() {
    let (mut session, rx) = new_session(3);
    settle_all(&mut session, &rx);
    run_script(&mut session, vec![ScriptedEventSource::key(KeyCode::Enter)]);

    for (x, text) in [(50.0, "one"), (150.0, "two")] {
        session.annotate_at(PixelPoint::new(x, 75.0)).unwrap();
        let mut events = ScriptedEventSource::typed(text);
        events.push(ScriptedEventSource::key(KeyCode::Enter));
        run_script(&mut session, events);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.json");
    std::fs::write(&path, session.export_annotations().unwrap()).unwrap();

    let (mut restored, rx2) = new_session(3);
    settle_all(&mut restored, &rx2);
    let json = std::fs::read_to_string(&path).unwrap();
    assert_eq!(restored.import_annotations(&json).unwrap(), 2);
    assert_eq!(
        restored.editor().annotations().all(),
        session.editor().annotations().all()
    );
}
