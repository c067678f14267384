//! Todo module - defines the task entity and the derived daily briefing.
//!
//! Correction state lives on the entity itself; the transitions that touch it
//! (`accept_correction`, `reject_correction`, `apply_correction_result`) are
//! pure functions so the use cases and the controller share one definition.

mod briefing;
mod item;

pub use briefing::{
    DailyBriefing, BRIEFING_BUSY_SENTENCE, BRIEFING_FAILURE_SENTENCE, NO_TASKS_SENTENCE,
};
pub use item::{CorrectionState, Todo};
