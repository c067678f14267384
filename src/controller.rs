//! List controller: the observable in-memory task list and briefing.
//!
//! # Flow
//! ```text
//! add ──▶ persist ──▶ reload (list + briefing) ──▶ spawn correction
//!                                                     │
//!                                                     ▼
//!                                  persist result ──▶ merge by id ──▶ publish
//! ```
//!
//! Every other action runs one use case and then reloads. Failures are logged
//! and degrade to stale or placeholder data; nothing here returns an error.
//! Actions are independent and unordered: a reload can race a background
//! correction, and the last write for a given id wins.

use crate::todo::{DailyBriefing, Todo};
use crate::usecase::TodoUseCases;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Published after every change to the observable state.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    TodosChanged(Vec<Todo>),
    BriefingChanged(DailyBriefing),
}

#[derive(Debug, Default)]
struct ListState {
    todos: Vec<Todo>,
    briefing: Option<DailyBriefing>,
}

#[derive(Clone)]
pub struct TodoListController {
    use_cases: TodoUseCases,
    state: Arc<RwLock<ListState>>,
    events_tx: broadcast::Sender<ListEvent>,
}

impl TodoListController {
    pub fn new(use_cases: TodoUseCases) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            use_cases,
            state: Arc::new(RwLock::new(ListState::default())),
            events_tx,
        }
    }

    /// Subscribe to state changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events_tx.subscribe()
    }

    pub async fn todos(&self) -> Vec<Todo> {
        self.state.read().await.todos.clone()
    }

    /// `None` until the first reload finishes.
    pub async fn briefing(&self) -> Option<DailyBriefing> {
        self.state.read().await.briefing.clone()
    }

    fn publish(&self, event: ListEvent) {
        // No receivers is fine
        let _ = self.events_tx.send(event);
    }

    async fn set_todos(&self, todos: Vec<Todo>) {
        self.state.write().await.todos = todos.clone();
        self.publish(ListEvent::TodosChanged(todos));
    }

    async fn set_briefing(&self, briefing: DailyBriefing) {
        self.state.write().await.briefing = Some(briefing.clone());
        self.publish(ListEvent::BriefingChanged(briefing));
    }

    /// Reload the list from the store, then regenerate the briefing.
    pub async fn reload(&self) {
        match self.use_cases.list().await {
            Ok(todos) => {
                debug!("Reloaded {} todos", todos.len());
                self.set_todos(todos).await;
            }
            Err(e) => {
                warn!("Failed to load todos: {}", e);
                self.set_briefing(DailyBriefing::failure()).await;
                return;
            }
        }
        self.refresh_briefing().await;
    }

    async fn refresh_briefing(&self) {
        let briefing = match self.use_cases.summarize().await {
            Ok(briefing) => briefing,
            Err(e) if e.is_busy() => {
                info!("Briefing skipped, summarizer busy");
                DailyBriefing::busy()
            }
            Err(e) => {
                warn!("Failed to generate briefing: {}", e);
                DailyBriefing::failure()
            }
        };
        self.set_briefing(briefing).await;
    }

    /// Add a todo and start its background correction.
    ///
    /// Returns the correction task, or `None` if the todo could not be saved.
    pub async fn add_todo(
        &self,
        title: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Option<JoinHandle<()>> {
        let todo = match self.use_cases.add(title, due_date).await {
            Ok(todo) => todo,
            Err(e) => {
                warn!("Failed to add todo {:?}: {}", title, e);
                self.reload().await;
                return None;
            }
        };
        info!("Added todo {}", todo.id);
        self.reload().await;

        let controller = self.clone();
        Some(tokio::spawn(async move {
            controller.check_correction(todo).await;
        }))
    }

    async fn check_correction(&self, added: Todo) {
        let corrected = self
            .use_cases
            .transformer()
            .correct_or_original(&added.title)
            .await;

        // Merge onto the stored record so edits made meanwhile survive.
        let mut checked = match self.use_cases.get(added.id).await {
            Ok(Some(todo)) => todo,
            Ok(None) => {
                debug!("Todo {} deleted before its correction finished", added.id);
                return;
            }
            Err(e) => {
                warn!("Failed to load todo {} for correction: {}", added.id, e);
                return;
            }
        };
        if checked.title == added.title {
            checked.apply_correction_result(&corrected);
        } else {
            // The correction belongs to a title that no longer exists.
            debug!("Todo {} renamed during correction, dropping result", added.id);
            checked.reject_correction();
        }

        if let Err(e) = self.use_cases.update(&checked).await {
            warn!("Failed to save correction for {}: {}", checked.id, e);
            return;
        }
        debug!(
            "Correction checked for {} (suggestion: {:?})",
            checked.id, checked.suggested_correction
        );
        self.merge(checked).await;
    }

    /// Replace the in-memory copy with the same id, if it is still listed.
    async fn merge(&self, todo: Todo) {
        let todos = {
            let mut state = self.state.write().await;
            match state.todos.iter_mut().find(|t| t.id == todo.id) {
                Some(slot) => *slot = todo,
                None => return,
            }
            state.todos.clone()
        };
        self.publish(ListEvent::TodosChanged(todos));
    }

    pub async fn toggle_completion(&self, todo: &Todo) {
        match self.use_cases.toggle(todo).await {
            Ok(true) => {}
            Ok(false) => debug!("Toggle ignored, todo {} is gone", todo.id),
            Err(e) => warn!("Failed to toggle todo {}: {}", todo.id, e),
        }
        self.reload().await;
    }

    pub async fn delete(&self, todo: &Todo) {
        match self.use_cases.delete(todo).await {
            Ok(true) => info!("Deleted todo {}", todo.id),
            Ok(false) => debug!("Delete ignored, todo {} is gone", todo.id),
            Err(e) => warn!("Failed to delete todo {}: {}", todo.id, e),
        }
        self.reload().await;
    }

    pub async fn accept_correction(&self, todo: &Todo) {
        if let Err(e) = self.use_cases.accept_correction(todo).await {
            warn!("Failed to accept correction for {}: {}", todo.id, e);
        }
        self.reload().await;
    }

    pub async fn reject_correction(&self, todo: &Todo) {
        if let Err(e) = self.use_cases.reject_correction(todo).await {
            warn!("Failed to reject correction for {}: {}", todo.id, e);
        }
        self.reload().await;
    }

    pub async fn update(&self, todo: &Todo) {
        if let Err(e) = self.use_cases.update(todo).await {
            warn!("Failed to update todo {}: {}", todo.id, e);
        }
        self.reload().await;
    }

    pub async fn set_due_date(&self, todo: &Todo, due_date: Option<DateTime<Utc>>) {
        if let Err(e) = self.use_cases.set_due_date(todo, due_date).await {
            warn!("Failed to set due date on {}: {}", todo.id, e);
        }
        self.reload().await;
    }
}
