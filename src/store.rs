//! Annotation store collaborator
//!
//! The backend persistence seam. All calls are best-effort: the session
//! updates its local state optimistically and only logs failures, so a dead
//! backend degrades the tool to local-only operation instead of blocking the
//! reviewer.

use anyhow::{Result, bail};
use std::collections::HashMap;

use crate::anchor::Anchor;
use crate::annotations::Annotation;

/// Backend persistence for annotations, scoped per assignment.
pub trait AnnotationStore {
    fn list(&self, assignment_id: &str) -> Result<Vec<Annotation>>;

    /// Persist a new annotation, returning the id the backend stored it
    /// under. Callers keep their local id regardless.
    fn create(&mut self, assignment_id: &str, annotation: &Annotation) -> Result<String>;

    fn update(&mut self, assignment_id: &str, id: &str, text: &str, anchor: Anchor) -> Result<()>;

    fn delete(&mut self, assignment_id: &str, id: &str) -> Result<()>;
}

/// Non-persisting in-memory store, the current stand-in for the real
/// backend. Contents live exactly as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    by_assignment: HashMap<String, HashMap<String, Annotation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, assignment_id: &str) -> usize {
        self.by_assignment
            .get(assignment_id)
            .map_or(0, HashMap::len)
    }
}

impl AnnotationStore for MemoryStore {
    fn list(&self, assignment_id: &str) -> Result<Vec<Annotation>> {
        let mut annotations: Vec<Annotation> = self
            .by_assignment
            .get(assignment_id)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        annotations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(annotations)
    }

    fn create(&mut self, assignment_id: &str, annotation: &Annotation) -> Result<String> {
        self.by_assignment
            .entry(assignment_id.to_string())
            .or_default()
            .insert(annotation.id.clone(), annotation.clone());
        Ok(annotation.id.clone())
    }

    fn update(&mut self, assignment_id: &str, id: &str, text: &str, anchor: Anchor) -> Result<()> {
        let Some(stored) = self
            .by_assignment
            .get_mut(assignment_id)
            .and_then(|entries| entries.get_mut(id))
        else {
            bail!("annotation {id} not found for assignment {assignment_id}");
        };
        stored.text = text.to_string();
        stored.anchor = anchor;
        stored.touch();
        Ok(())
    }

    fn delete(&mut self, assignment_id: &str, id: &str) -> Result<()> {
        let removed = self
            .by_assignment
            .get_mut(assignment_id)
            .and_then(|entries| entries.remove(id));
        if removed.is_none() {
            bail!("annotation {id} not found for assignment {assignment_id}");
        }
        Ok(())
    }
}

/// Store double that fails every call, for exercising the
/// degrade-to-local-only path in tests.
#[derive(Debug, Default)]
pub struct FailingStore;

impl AnnotationStore for FailingStore {
    fn list(&self, _assignment_id: &str) -> Result<Vec<Annotation>> {
        bail!("store unreachable")
    }

    fn create(&mut self, _assignment_id: &str, _annotation: &Annotation) -> Result<String> {
        bail!("store unreachable")
    }

    fn update(&mut self, _assignment_id: &str, _id: &str, _text: &str, _anchor: Anchor) -> Result<()> {
        bail!("store unreachable")
    }

    fn delete(&mut self, _assignment_id: &str, _id: &str) -> Result<()> {
        bail!("store unreachable")
    }
}
