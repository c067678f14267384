//! The daily briefing: one generated sentence about outstanding todos.

use serde::{Deserialize, Serialize};

/// Returned without calling the model when nothing is left to do.
pub const NO_TASKS_SENTENCE: &str = "No tasks for today. Try adding a new one!";

/// Shown when the list or the summary could not be produced.
pub const BRIEFING_FAILURE_SENTENCE: &str = "Today's briefing could not be generated.";

/// Shown when the session was still answering a previous request.
pub const BRIEFING_BUSY_SENTENCE: &str =
    "The assistant is busy right now. The briefing will refresh on the next update.";

/// Derived summary of pending todos. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBriefing {
    /// A single, concise, actionable sentence summarizing today's tasks.
    pub summary: String,
}

impl DailyBriefing {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }

    pub fn no_tasks() -> Self {
        Self::new(NO_TASKS_SENTENCE)
    }

    pub fn failure() -> Self {
        Self::new(BRIEFING_FAILURE_SENTENCE)
    }

    pub fn busy() -> Self {
        Self::new(BRIEFING_BUSY_SENTENCE)
    }
}

impl std::fmt::Display for DailyBriefing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary)
    }
}
