//! # taskbrief
//!
//! A single-user task list with two model-assisted features:
//! - grammar/spelling correction of new titles, offered as a suggestion
//! - a one-sentence daily briefing of what is still open
//!
//! ## Architecture
//!
//! ```text
//!   TodoListController  (observable list + briefing, background corrections)
//!          │
//!          ▼
//!     TodoUseCases ─────────────▶ TextTransformService
//!          │                         │  (two GenerativeSessions)
//!          ▼                         ▼
//!      TodoStore                 LlmClient
//!  (memory/file/sqlite)      (OpenRouter / offline echo)
//! ```
//!
//! ## Modules
//! - `todo`: the task entity and the briefing
//! - `store`: persistence backends
//! - `llm`: chat-completion clients
//! - `transform`: correction and summarization prompts over a busy-guarded session
//! - `usecase`: one operation per user intent
//! - `controller`: in-memory state, events and the add-then-correct flow

pub mod config;
pub mod controller;
pub mod llm;
pub mod store;
pub mod todo;
pub mod transform;
pub mod usecase;

pub use config::Config;
pub use controller::{ListEvent, TodoListController};
pub use todo::{DailyBriefing, Todo};
