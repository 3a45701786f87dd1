//! Review session orchestration
//!
//! Wires the view-state machine, surface registry, navigation controller,
//! annotation editor, and assignment queue into one event-driven session.
//! Terminal key events come in through [`handle_event`](ReviewSession::handle_event);
//! pointer interactions arrive pre-hit-tested from the front end. The session
//! hands instructions back through a drained effect queue.

use std::collections::VecDeque;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, info, warn};

use crate::anchor::PixelPoint;
use crate::assignment::{Assignment, AssignmentQueue, AssignmentStatus};
use crate::editor::{AnnotationEditor, AnnotationPlacement, EditorError, InputSession};
use crate::navigation::{NavigationController, RenderOutcome, RenderRequest, Zoom};
use crate::store::AnnotationStore;
use crate::surface::PageSurfaceRegistry;
use crate::view_state::{ViewEvent, ViewMode, ViewStateMachine};

/// Instructions for the front end, drained once per loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Bring a page into view (the focused page, or the overview highlight).
    ScrollToPage(u32),
    /// A page's surface could not be drawn; show a placeholder in its slot.
    PageError { page: u32, message: String },
    /// A (possibly empty) document was mounted; per-document front-end state
    /// is stale.
    DocumentLoaded,
    Quit,
}

pub struct ReviewSession {
    view: ViewStateMachine,
    registry: PageSurfaceRegistry,
    nav: NavigationController,
    editor: AnnotationEditor,
    assignments: AssignmentQueue,
    effects: VecDeque<Effect>,
}

impl ReviewSession {
    pub fn new(
        render_tx: flume::Sender<RenderRequest>,
        store: Box<dyn AnnotationStore>,
        assignments: AssignmentQueue,
    ) -> Self {
        Self {
            view: ViewStateMachine::new(),
            registry: PageSurfaceRegistry::new(),
            nav: NavigationController::new(render_tx),
            editor: AnnotationEditor::new(store),
            assignments,
            effects: VecDeque::new(),
        }
    }

    // Accessors for front ends and tests

    pub fn view(&self) -> &ViewStateMachine {
        &self.view
    }

    pub fn mode(&self) -> ViewMode {
        self.view.mode()
    }

    pub fn editor(&self) -> &AnnotationEditor {
        &self.editor
    }

    pub fn registry(&self) -> &PageSurfaceRegistry {
        &self.registry
    }

    pub fn assignments(&self) -> &AssignmentQueue {
        &self.assignments
    }

    pub fn scale(&self) -> f32 {
        self.nav.scale()
    }

    pub fn page_info(&self) -> Option<String> {
        self.nav.page_info(&self.view)
    }

    pub fn input(&self) -> Option<&InputSession> {
        self.editor.input()
    }

    pub fn placements_for_page(&self, page: u32) -> Vec<AnnotationPlacement> {
        self.editor.placements_for_page(page, &self.registry)
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        self.effects.drain(..).collect()
    }

    // Assignment lifecycle

    /// Mount the assignment under the queue cursor: reset zoom and view
    /// state, invalidate outstanding renders from the previous document,
    /// reload annotations, and request a render of every page for the
    /// overview grid.
    pub fn activate_current_assignment(&mut self) {
        // Anything still in flight belongs to the torn-down context now.
        self.nav.bump_generation();
        self.nav.reset_zoom();
        self.registry.clear();
        self.effects.clear();

        self.effects.push_back(Effect::DocumentLoaded);

        let Some(assignment) = self.assignments.current().cloned() else {
            self.view.set_total_pages(0);
            return;
        };
        info!(
            "opening assignment {} ({} pages)",
            assignment.id, assignment.page_count
        );
        self.view.set_total_pages(assignment.page_count);
        self.editor.load_for_assignment(&assignment.id);
        for page in 1..=assignment.page_count {
            self.nav.request_render(page);
        }
        self.pump_view_events();
    }

    pub fn switch_assignment(&mut self, delta: i64) -> bool {
        if !self.assignments.navigate(delta) {
            return false;
        }
        self.activate_current_assignment();
        true
    }

    pub fn set_assignment_status(
        &mut self,
        status: AssignmentStatus,
        grade: Option<String>,
    ) -> Option<&Assignment> {
        self.assignments.set_status(status, grade)
    }

    // Renderer plumbing

    /// Feed back a settlement from the renderer worker. Stale settlements
    /// (older generation) are dropped without touching the registry.
    pub fn render_settled(&mut self, outcome: RenderOutcome) {
        if !self.nav.render_settled(&outcome) {
            return;
        }
        match outcome.result {
            Ok(dims) => {
                self.registry.record(outcome.page, dims);
            }
            Err(err) => {
                warn!("render of page {} failed: {err:#}", outcome.page);
                self.effects.push_back(Effect::PageError {
                    page: outcome.page,
                    message: format!("{err:#}"),
                });
            }
        }
    }

    // Keyboard surface

    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Key(key) => self.handle_key(*key),
            // Pointer events need layout knowledge and are translated by the
            // front end into the pointer methods below.
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.editor.input_active() {
            self.handle_input_key(key);
            return;
        }

        match key.code {
            KeyCode::Esc => {
                self.view.exit_to_overview();
            }
            KeyCode::Enter => {
                self.view.focus_highlighted();
            }
            KeyCode::Left => {
                if self.view.is_overview() {
                    self.view.navigate_highlight(-1);
                } else {
                    self.nav.change_page(&mut self.view, -1);
                }
            }
            KeyCode::Right => {
                if self.view.is_overview() {
                    self.view.navigate_highlight(1);
                } else {
                    self.nav.change_page(&mut self.view, 1);
                }
            }
            KeyCode::Up => {
                self.view.navigate_highlight(-1);
            }
            KeyCode::Down => {
                self.view.navigate_highlight(1);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.nav.change_zoom(&self.view, Zoom::STEP);
            }
            KeyCode::Char('-') | KeyCode::Char('_') => {
                self.nav.change_zoom(&self.view, -Zoom::STEP);
            }
            KeyCode::Char('[') => {
                self.switch_assignment(-1);
            }
            KeyCode::Char(']') => {
                self.switch_assignment(1);
            }
            KeyCode::Char('r') => {
                if let Some(assignment) = self.set_assignment_status(AssignmentStatus::Reviewed, None) {
                    info!("marked assignment {} as reviewed", assignment.id);
                }
            }
            KeyCode::Char('q') => {
                self.effects.push_back(Effect::Quit);
            }
            _ => {}
        }
        self.pump_view_events();
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.editor.cancel_input(),
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.editor.push_input_char('\n');
            }
            KeyCode::Enter => {
                if let Some(id) = self.editor.commit_input() {
                    debug!("committed annotation {id}");
                }
            }
            KeyCode::Backspace => self.editor.pop_input_char(),
            KeyCode::Char(c) => self.editor.push_input_char(c),
            _ => {}
        }
    }

    // Pointer surface (hit-tested by the front end)

    /// A page tile was clicked. In overview this focuses the page; while
    /// focused it switches the focused page without a mode transition.
    pub fn page_clicked(&mut self, page: u32) {
        if self.view.is_overview() {
            self.view.enter_focused(page);
        } else {
            self.view.update_focused_page(page);
        }
        self.pump_view_events();
    }

    /// A click on the focused page surface that hit no annotation: open a
    /// creation input anchored there. Rejected when no page is active or the
    /// page has no rendered surface yet; suppressed while a drag is live so
    /// the release of a drag never spawns an input.
    pub fn annotate_at(&mut self, pixel: PixelPoint) -> Result<(), EditorError> {
        if self.editor.dragging().is_some() {
            return Ok(());
        }
        let page = self.view.active_page().ok_or(EditorError::NoActivePage)?;
        self.editor.begin_create(page, pixel, &self.registry)
    }

    /// Pointer pressed on an annotation body: start dragging it.
    pub fn annotation_pressed(&mut self, id: &str) {
        if let Err(err) = self.editor.begin_drag(id, &self.registry) {
            debug!("drag not started: {err}");
        }
    }

    /// Secondary interaction on an annotation: open its edit input.
    pub fn annotation_edit_requested(&mut self, id: &str) {
        if let Err(err) = self.editor.begin_edit(id) {
            debug!("edit not started: {err}");
        }
    }

    /// The annotation's delete control was activated.
    pub fn annotation_delete_clicked(&mut self, id: &str) {
        match self.editor.delete(id) {
            Ok(removed) => info!("deleted annotation {}", removed.id),
            Err(err) => debug!("delete ignored: {err}"),
        }
    }

    pub fn pointer_dragged(&mut self, pixel: PixelPoint) {
        self.editor.drag_to(pixel);
    }

    pub fn pointer_released(&mut self) {
        if let Some(id) = self.editor.release_drag(&self.registry) {
            debug!("drag committed for annotation {id}");
        }
    }

    // Annotation interchange

    pub fn export_annotations(&self) -> anyhow::Result<String> {
        self.editor.export_json()
    }

    pub fn import_annotations(&mut self, json: &str) -> anyhow::Result<usize> {
        self.editor.import_json(json)
    }

    fn pump_view_events(&mut self) {
        for event in self.view.drain_events() {
            match event {
                ViewEvent::PageFocused(page) | ViewEvent::HighlightMoved(page) => {
                    self.effects.push_back(Effect::ScrollToPage(page));
                }
                ViewEvent::ModeChanged(mode) => {
                    debug!("view mode changed: {mode:?}");
                }
            }
        }
    }
}
