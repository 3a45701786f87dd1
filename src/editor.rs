//! Annotation editing sessions
//!
//! Creation, in-place editing, dragging, and deletion of annotations. One
//! text input and one drag may be active at a time; starting a new session
//! implicitly blurs the previous one with the usual commit-or-cancel rules.
//! Anchors are recaptured against the page's current surface dimensions at
//! commit time, so an edit or drag that straddles a zoom still lands where
//! the reviewer put it.

use log::{debug, warn};
use thiserror::Error;

use crate::anchor::{Anchor, PixelPoint};
use crate::annotations::{Annotation, AnnotationCollection};
use crate::store::AnnotationStore;
use crate::surface::PageSurfaceRegistry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    /// No active page could be determined for a new annotation. The caller
    /// resolves the page before opening an input; there is no sentinel
    /// fallback.
    #[error("no active page to attach the annotation to")]
    NoActivePage,
    #[error("page {0} has no rendered surface")]
    MissingSurface(u32),
    #[error("unknown annotation id {0}")]
    UnknownAnnotation(String),
    #[error("another annotation is already being dragged")]
    DragInProgress,
}

/// The single in-flight text input, for a new or an existing annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSession {
    Create {
        page: u32,
        anchor: Anchor,
        buffer: String,
    },
    Edit {
        id: String,
        original: String,
        buffer: String,
    },
}

impl InputSession {
    pub fn buffer(&self) -> &str {
        match self {
            InputSession::Create { buffer, .. } | InputSession::Edit { buffer, .. } => buffer,
        }
    }

    fn buffer_mut(&mut self) -> &mut String {
        match self {
            InputSession::Create { buffer, .. } | InputSession::Edit { buffer, .. } => buffer,
        }
    }
}

/// An annotation mid-drag. Exists only between press and release; release
/// tears it down completely, so no tracking leaks into a later drag.
#[derive(Debug, Clone, PartialEq)]
struct DragSession {
    id: String,
    page: u32,
    position: PixelPoint,
}

/// A resolved on-screen placement for one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationPlacement {
    pub id: String,
    pub pixel: PixelPoint,
    pub text: String,
    pub dragging: bool,
}

/// Owns the annotation collection and the editing state machines around it.
///
/// Store calls are fire-and-forget: local state mutates first and stays
/// authoritative even when persistence fails.
pub struct AnnotationEditor {
    annotations: AnnotationCollection,
    input: Option<InputSession>,
    drag: Option<DragSession>,
    store: Box<dyn AnnotationStore>,
    assignment_id: Option<String>,
}

impl AnnotationEditor {
    pub fn new(store: Box<dyn AnnotationStore>) -> Self {
        Self {
            annotations: AnnotationCollection::new(),
            input: None,
            drag: None,
            store,
            assignment_id: None,
        }
    }

    pub fn annotations(&self) -> &AnnotationCollection {
        &self.annotations
    }

    pub fn input(&self) -> Option<&InputSession> {
        self.input.as_ref()
    }

    pub fn input_active(&self) -> bool {
        self.input.is_some()
    }

    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(|d| d.id.as_str())
    }

    /// Bind the editor to an assignment and replace the collection with the
    /// store's contents. A failing store degrades to an empty local set.
    pub fn load_for_assignment(&mut self, assignment_id: &str) {
        self.input = None;
        self.drag = None;
        self.assignment_id = Some(assignment_id.to_string());
        match self.store.list(assignment_id) {
            Ok(annotations) => {
                debug!(
                    "loaded {} annotations for assignment {assignment_id}",
                    annotations.len()
                );
                self.annotations.replace_all(annotations);
            }
            Err(err) => {
                warn!("failed to list annotations for {assignment_id}: {err:#}");
                self.annotations.clear();
            }
        }
    }

    /// Open an input for a new annotation at a clicked pixel position. The
    /// anchor is captured immediately against the page's current surface.
    pub fn begin_create(
        &mut self,
        page: u32,
        pixel: PixelPoint,
        registry: &PageSurfaceRegistry,
    ) -> Result<(), EditorError> {
        let dims = registry
            .dimensions(page)
            .ok_or(EditorError::MissingSurface(page))?;
        self.blur();
        self.input = Some(InputSession::Create {
            page,
            anchor: Anchor::from_pixel(pixel, dims),
            buffer: String::new(),
        });
        Ok(())
    }

    /// Open an input pre-filled with an existing annotation's text.
    pub fn begin_edit(&mut self, id: &str) -> Result<(), EditorError> {
        let text = self
            .annotations
            .get(id)
            .ok_or_else(|| EditorError::UnknownAnnotation(id.to_string()))?
            .text
            .clone();
        self.blur();
        self.input = Some(InputSession::Edit {
            id: id.to_string(),
            original: text.clone(),
            buffer: text,
        });
        Ok(())
    }

    pub fn push_input_char(&mut self, c: char) {
        if let Some(input) = self.input.as_mut() {
            input.buffer_mut().push(c);
        }
    }

    pub fn pop_input_char(&mut self) {
        if let Some(input) = self.input.as_mut() {
            input.buffer_mut().pop();
        }
    }

    pub fn set_input_text(&mut self, text: &str) {
        if let Some(input) = self.input.as_mut() {
            let buffer = input.buffer_mut();
            buffer.clear();
            buffer.push_str(text);
        }
    }

    /// Commit the open input. A create with empty text, or an edit with
    /// empty or unchanged text, is treated as a cancel. Returns the id of
    /// the annotation that was created or updated.
    pub fn commit_input(&mut self) -> Option<String> {
        let input = self.input.take()?;
        match input {
            InputSession::Create {
                page,
                anchor,
                buffer,
            } => {
                let text = buffer.trim();
                if text.is_empty() {
                    return None;
                }
                let annotation = Annotation::new(page, anchor, text);
                let id = annotation.id.clone();
                self.persist_create(&annotation);
                self.annotations.insert(annotation);
                Some(id)
            }
            InputSession::Edit {
                id,
                original,
                buffer,
            } => {
                let text = buffer.trim();
                if text.is_empty() || text == original {
                    return None;
                }
                let Some(annotation) = self.annotations.get_mut(&id) else {
                    // Deleted out from under the input; nothing to update.
                    return None;
                };
                annotation.text = text.to_string();
                annotation.touch();
                let anchor = annotation.anchor;
                self.persist_update(&id, text, anchor);
                Some(id)
            }
        }
    }

    /// Discard the open input without mutating anything.
    pub fn cancel_input(&mut self) {
        self.input = None;
    }

    /// Focus loss: commit when the buffer holds something committable,
    /// otherwise cancel.
    pub fn blur(&mut self) -> Option<String> {
        self.commit_input()
    }

    /// Start dragging an annotation from its current resolved position.
    pub fn begin_drag(
        &mut self,
        id: &str,
        registry: &PageSurfaceRegistry,
    ) -> Result<(), EditorError> {
        if self.drag.is_some() {
            return Err(EditorError::DragInProgress);
        }
        let annotation = self
            .annotations
            .get(id)
            .ok_or_else(|| EditorError::UnknownAnnotation(id.to_string()))?;
        let page = annotation.page_number;
        let dims = registry
            .dimensions(page)
            .ok_or(EditorError::MissingSurface(page))?;
        let position = annotation.anchor.resolve(dims);
        self.blur();
        self.drag = Some(DragSession {
            id: id.to_string(),
            page,
            position,
        });
        Ok(())
    }

    /// Update the dragged annotation's displayed position. The anchor is not
    /// touched until release.
    pub fn drag_to(&mut self, pixel: PixelPoint) -> bool {
        match self.drag.as_mut() {
            Some(drag) => {
                drag.position = pixel;
                true
            }
            None => false,
        }
    }

    /// Release the drag, recapturing the anchor against the page's *current*
    /// surface dimensions - a drag that ends after an intervening zoom still
    /// anchors correctly. Returns the id of the moved annotation.
    pub fn release_drag(&mut self, registry: &PageSurfaceRegistry) -> Option<String> {
        let drag = self.drag.take()?;
        let Some(dims) = registry.dimensions(drag.page) else {
            warn!(
                "drag released on page {} with no surface, discarding move",
                drag.page
            );
            return None;
        };
        let anchor = Anchor::from_pixel(drag.position, dims);
        let annotation = self.annotations.get_mut(&drag.id)?;
        annotation.anchor = anchor;
        annotation.touch();
        let text = annotation.text.clone();
        self.persist_update(&drag.id, &text, anchor);
        Some(drag.id)
    }

    /// Remove an annotation outright. Irreversible; any session attached to
    /// it is torn down.
    pub fn delete(&mut self, id: &str) -> Result<Annotation, EditorError> {
        let removed = self
            .annotations
            .remove(id)
            .ok_or_else(|| EditorError::UnknownAnnotation(id.to_string()))?;
        if self.drag.as_ref().is_some_and(|d| d.id == id) {
            self.drag = None;
        }
        if let Some(InputSession::Edit { id: editing, .. }) = self.input.as_ref() {
            if editing.as_str() == id {
                self.input = None;
            }
        }
        self.persist_delete(id);
        Ok(removed)
    }

    /// Resolve every annotation on a page against its current surface
    /// dimensions. Invoked whenever the page is (re)rendered; this is what
    /// keeps annotations placed correctly after a zoom re-render. A page
    /// with no recorded surface yields nothing.
    pub fn placements_for_page(
        &self,
        page: u32,
        registry: &PageSurfaceRegistry,
    ) -> Vec<AnnotationPlacement> {
        let Some(dims) = registry.dimensions(page) else {
            debug!("placements_for_page({page}): no surface recorded");
            return Vec::new();
        };
        self.annotations
            .for_page(page)
            .into_iter()
            .map(|annotation| {
                let dragging = self
                    .drag
                    .as_ref()
                    .is_some_and(|d| d.id == annotation.id);
                let pixel = match &self.drag {
                    Some(drag) if dragging => drag.position,
                    _ => annotation.anchor.resolve(dims),
                };
                AnnotationPlacement {
                    id: annotation.id.clone(),
                    pixel,
                    text: annotation.text.clone(),
                    dragging,
                }
            })
            .collect()
    }

    pub fn export_json(&self) -> anyhow::Result<String> {
        self.annotations.export_json()
    }

    /// Replace the local collection from exported JSON. Local-only: the
    /// store is not written to.
    pub fn import_json(&mut self, json: &str) -> anyhow::Result<usize> {
        self.input = None;
        self.drag = None;
        self.annotations.import_json(json)
    }

    fn persist_create(&mut self, annotation: &Annotation) {
        let Some(assignment_id) = self.assignment_id.clone() else {
            return;
        };
        if let Err(err) = self.store.create(&assignment_id, annotation) {
            warn!("failed to persist annotation {}: {err:#}", annotation.id);
        }
    }

    fn persist_update(&mut self, id: &str, text: &str, anchor: Anchor) {
        let Some(assignment_id) = self.assignment_id.clone() else {
            return;
        };
        if let Err(err) = self.store.update(&assignment_id, id, text, anchor) {
            warn!("failed to persist update of annotation {id}: {err:#}");
        }
    }

    fn persist_delete(&mut self, id: &str) {
        let Some(assignment_id) = self.assignment_id.clone() else {
            return;
        };
        if let Err(err) = self.store.delete(&assignment_id, id) {
            warn!("failed to persist deletion of annotation {id}: {err:#}");
        }
    }
}
