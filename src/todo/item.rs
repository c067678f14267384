//! The `Todo` entity and its correction lifecycle.
//!
//! # Invariants
//! - `suggested_correction.is_some()` implies `is_correction_pending`
//! - `created_at` is set once, at construction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    /// Rewrite proposed by the correction pass, awaiting accept/reject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_correction: Option<String>,
    #[serde(default)]
    pub is_correction_pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Where a todo sits in the add-then-correct flow.
///
/// ```text
/// Created -> Suggested -> Settled   (accept / reject)
///        \-> Settled                (correction matched the title)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionState {
    /// Persisted, correction not returned yet
    Created,
    /// Correction returned a different title, waiting on the user
    Suggested,
    /// Nothing left to decide
    Settled,
}

impl Todo {
    /// Create a freshly added todo.
    ///
    /// # Postcondition
    /// `is_correction_pending == true`, no suggestion, not completed.
    pub fn new(title: impl Into<String>, due_date: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            is_completed: false,
            suggested_correction: None,
            is_correction_pending: true,
            due_date,
            created_at: Utc::now(),
        }
    }

    pub fn correction_state(&self) -> CorrectionState {
        match (&self.suggested_correction, self.is_correction_pending) {
            (Some(_), _) => CorrectionState::Suggested,
            (None, true) => CorrectionState::Created,
            (None, false) => CorrectionState::Settled,
        }
    }

    /// Record the outcome of a correction pass against the current title.
    ///
    /// A result that differs from the title (after trimming) becomes a pending
    /// suggestion; an identical one settles the todo.
    pub fn apply_correction_result(&mut self, corrected: &str) {
        let corrected = corrected.trim();
        if corrected.is_empty() || corrected == self.title.trim() {
            self.suggested_correction = None;
            self.is_correction_pending = false;
        } else {
            self.suggested_correction = Some(corrected.to_string());
            self.is_correction_pending = true;
        }
    }

    /// Adopt the suggestion as the title.
    ///
    /// Returns `false` (and changes nothing) when there is no suggestion.
    pub fn accept_correction(&mut self) -> bool {
        match self.suggested_correction.take() {
            Some(suggestion) => {
                self.title = suggestion;
                self.is_correction_pending = false;
                true
            }
            None => false,
        }
    }

    /// Drop any suggestion and keep the title. Idempotent.
    pub fn reject_correction(&mut self) {
        self.suggested_correction = None;
        self.is_correction_pending = false;
    }

    /// One line of the summarization prompt: `- title (due: YYYY-MM-DD)`.
    pub fn briefing_line(&self) -> String {
        match self.due_date {
            Some(due) => format!("- {} (due: {})", self.title, due.format("%Y-%m-%d")),
            None => format!("- {}", self.title),
        }
    }
}
