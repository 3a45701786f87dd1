//! Annotation data model and in-memory collection
//!
//! Annotations are owned by the editor for the lifetime of one review
//! session; the backend store only ever sees best-effort copies. The JSON
//! interchange here doubles as the store wire format and the manual
//! export/import feature.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::anchor::Anchor;

/// One free-text note pinned to a fractional position on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub page_number: u32,
    pub anchor: Anchor,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Annotation {
    pub fn new(page_number: u32, anchor: Anchor, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            page_number,
            anchor,
            text: text.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Opaque unique id: creation time in milliseconds plus a random suffix.
fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("note-{millis}-{suffix}")
}

/// In-memory annotation collection, keyed by id.
#[derive(Debug, Default)]
pub struct AnnotationCollection {
    annotations: HashMap<String, Annotation>,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, annotation: Annotation) {
        self.annotations.insert(annotation.id.clone(), annotation);
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Annotation> {
        self.annotations.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Annotation> {
        self.annotations.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.annotations.contains_key(id)
    }

    /// Annotations on one page, oldest first so paint order is stable.
    pub fn for_page(&self, page_number: u32) -> Vec<&Annotation> {
        let mut page_annotations: Vec<&Annotation> = self
            .annotations
            .values()
            .filter(|a| a.page_number == page_number)
            .collect();
        page_annotations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        page_annotations
    }

    pub fn all(&self) -> Vec<&Annotation> {
        let mut all: Vec<&Annotation> = self.annotations.values().collect();
        all.sort_by(|a, b| {
            a.page_number
                .cmp(&b.page_number)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        all
    }

    /// Replace the whole collection, e.g. after listing a new assignment's
    /// annotations from the store.
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn export_json(&self) -> Result<String> {
        let all: Vec<&Annotation> = self.all();
        serde_json::to_string_pretty(&all).context("Failed to serialize annotations")
    }

    /// Replace the collection with the parsed contents of `json`. Returns
    /// the number of annotations imported.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let parsed: Vec<Annotation> =
            serde_json::from_str(json).context("Failed to parse annotations JSON")?;
        let count = parsed.len();
        self.replace_all(parsed);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(page: u32, text: &str) -> Annotation {
        Annotation::new(page, Anchor::new(0.25, 0.75), text)
    }

    #[test]
    fn ids_are_unique() {
        let a = note(1, "first");
        let b = note(1, "second");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("note-"));
    }

    #[test]
    fn collection_filters_by_page() {
        let mut collection = AnnotationCollection::new();
        collection.insert(note(1, "page one"));
        collection.insert(note(2, "page two"));
        collection.insert(note(1, "page one again"));

        assert_eq!(collection.len(), 3);
        let first_page = collection.for_page(1);
        assert_eq!(first_page.len(), 2);
        assert!(first_page.iter().all(|a| a.page_number == 1));
        assert!(collection.for_page(3).is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let mut collection = AnnotationCollection::new();
        let annotation = note(1, "ephemeral");
        let id = annotation.id.clone();
        collection.insert(annotation);

        let removed = collection.remove(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(collection.remove(&id).is_none());

        collection.insert(note(1, "a"));
        collection.insert(note(2, "b"));
        collection.clear();
        assert!(collection.is_empty());
    }

    #[test]
    fn json_round_trip() {
        let mut collection = AnnotationCollection::new();
        collection.insert(note(1, "keep me"));
        collection.insert(note(3, "me too"));

        let json = collection.export_json().unwrap();

        let mut restored = AnnotationCollection::new();
        let count = restored.import_json(&json).unwrap();
        assert_eq!(count, 2);
        assert_eq!(restored.all(), collection.all());
    }

    #[test]
    fn import_rejects_malformed_json() {
        let mut collection = AnnotationCollection::new();
        collection.insert(note(1, "survivor"));

        assert!(collection.import_json("not json at all").is_err());
        // A failed import must not clobber the existing collection.
        assert_eq!(collection.len(), 1);
    }
}
