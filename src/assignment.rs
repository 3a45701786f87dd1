//! Assignment queue
//!
//! The review queue: which submissions exist, which one is open, and its
//! review status. Metadata follows the upload convention of the backend,
//! where a submission file is named `Student_Assignment Title.pdf`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    Reviewed,
    Graded,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Reviewed => "reviewed",
            AssignmentStatus::Graded => "graded",
        }
    }
}

/// One reviewable submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub student_name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    pub page_count: u32,
}

impl Assignment {
    /// Derive assignment metadata from an uploaded file name in the
    /// `Student_Assignment Title.pdf` convention. Everything after the first
    /// underscore is the title; a bare name yields a generic one.
    pub fn from_filename(filename: &str, page_count: u32) -> Self {
        let stem = filename
            .strip_suffix(".pdf")
            .or_else(|| filename.strip_suffix(".PDF"))
            .unwrap_or(filename);
        let (student, title) = match stem.split_once('_') {
            Some((student, rest)) => (student, rest.replace('_', " ")),
            None => (stem, String::new()),
        };
        Self {
            id: stem.to_string(),
            student_name: if student.is_empty() {
                "Unknown".to_string()
            } else {
                student.to_string()
            },
            title: if title.is_empty() {
                "Assignment".to_string()
            } else {
                title
            },
            course: None,
            due_date: None,
            status: AssignmentStatus::Pending,
            grade: None,
            page_count,
        }
    }
}

/// Ordered queue of assignments with a cursor on the open one. Navigation is
/// bounded - unlike the overview page highlight, the queue does not wrap.
#[derive(Debug, Default)]
pub struct AssignmentQueue {
    assignments: Vec<Assignment>,
    current: usize,
}

impl AssignmentQueue {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self {
            assignments,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn current(&self) -> Option<&Assignment> {
        self.assignments.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Move the cursor by `delta`, staying inside the queue. Returns whether
    /// it moved.
    pub fn navigate(&mut self, delta: i64) -> bool {
        let target = self.current as i64 + delta;
        if target < 0 || target >= self.assignments.len() as i64 {
            return false;
        }
        self.current = target as usize;
        true
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.assignments.len() {
            return false;
        }
        self.current = index;
        true
    }

    /// Update the open assignment's review status (and grade, when given).
    pub fn set_status(
        &mut self,
        status: AssignmentStatus,
        grade: Option<String>,
    ) -> Option<&Assignment> {
        let assignment = self.assignments.get_mut(self.current)?;
        assignment.status = status;
        if grade.is_some() {
            assignment.grade = grade;
        }
        Some(assignment)
    }

    /// Queue position label, e.g. `2 of 7`.
    pub fn position_label(&self) -> String {
        if self.assignments.is_empty() {
            "0 of 0".to_string()
        } else {
            format!("{} of {}", self.current + 1, self.assignments.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(names: &[&str]) -> AssignmentQueue {
        AssignmentQueue::new(
            names
                .iter()
                .map(|name| Assignment::from_filename(name, 4))
                .collect(),
        )
    }

    #[test]
    fn filename_parsing() {
        let a = Assignment::from_filename("Ada_Lab Report 3.pdf", 12);
        assert_eq!(a.id, "Ada_Lab Report 3");
        assert_eq!(a.student_name, "Ada");
        assert_eq!(a.title, "Lab Report 3");
        assert_eq!(a.status, AssignmentStatus::Pending);
        assert_eq!(a.page_count, 12);

        let bare = Assignment::from_filename("untitled.pdf", 1);
        assert_eq!(bare.student_name, "untitled");
        assert_eq!(bare.title, "Assignment");
    }

    #[test]
    fn navigation_is_bounded() {
        let mut queue = queue_of(&["A_one.pdf", "B_two.pdf", "C_three.pdf"]);

        assert!(!queue.navigate(-1));
        assert!(queue.navigate(1));
        assert!(queue.navigate(1));
        assert_eq!(queue.current().unwrap().student_name, "C");
        assert!(!queue.navigate(1));
        assert_eq!(queue.position_label(), "3 of 3");
    }

    #[test]
    fn status_update_touches_current_only() {
        let mut queue = queue_of(&["A_one.pdf", "B_two.pdf"]);
        queue.navigate(1);

        queue.set_status(AssignmentStatus::Graded, Some("A-".to_string()));
        assert_eq!(queue.current().unwrap().status, AssignmentStatus::Graded);
        assert_eq!(queue.current().unwrap().grade.as_deref(), Some("A-"));

        queue.navigate(-1);
        assert_eq!(queue.current().unwrap().status, AssignmentStatus::Pending);
    }

    #[test]
    fn empty_queue() {
        let mut queue = AssignmentQueue::default();
        assert!(queue.current().is_none());
        assert!(!queue.navigate(1));
        assert!(queue.set_status(AssignmentStatus::Reviewed, None).is_none());
        assert_eq!(queue.position_label(), "0 of 0");
    }
}
