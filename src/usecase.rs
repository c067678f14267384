//! Task use cases: one operation per user intent, no state of their own.

use crate::store::{StoreError, TodoStore};
use crate::todo::{DailyBriefing, Todo};
use crate::transform::{TextTransformService, TransformError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl SummarizeError {
    pub fn is_busy(&self) -> bool {
        matches!(self, SummarizeError::Transform(TransformError::ModelBusy))
    }
}

#[derive(Clone)]
pub struct TodoUseCases {
    store: Arc<dyn TodoStore>,
    transformer: Arc<TextTransformService>,
}

impl TodoUseCases {
    pub fn new(store: Arc<dyn TodoStore>, transformer: Arc<TextTransformService>) -> Self {
        Self { store, transformer }
    }

    pub fn transformer(&self) -> &Arc<TextTransformService> {
        &self.transformer
    }

    pub async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        self.store.list_todos().await
    }

    /// The stored copy of a todo, if it still exists.
    pub async fn get(&self, id: Uuid) -> Result<Option<Todo>, StoreError> {
        self.store.get_todo(id).await
    }

    pub async fn add(
        &self,
        title: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Todo, StoreError> {
        let todo = Todo::new(title, due_date);
        self.store.insert_todo(&todo).await?;
        Ok(todo)
    }

    pub async fn update(&self, todo: &Todo) -> Result<(), StoreError> {
        self.store.update_todo(todo).await
    }

    /// Returns `false` when the todo no longer exists.
    pub async fn toggle(&self, todo: &Todo) -> Result<bool, StoreError> {
        self.store.toggle_todo(todo.id).await
    }

    /// Returns `false` when the todo no longer exists.
    pub async fn delete(&self, todo: &Todo) -> Result<bool, StoreError> {
        self.store.delete_todo(todo.id).await
    }

    /// Adopt the suggestion as the title. No-op without a suggestion.
    pub async fn accept_correction(&self, todo: &Todo) -> Result<(), StoreError> {
        let mut updated = todo.clone();
        if !updated.accept_correction() {
            return Ok(());
        }
        self.store.update_todo(&updated).await
    }

    pub async fn reject_correction(&self, todo: &Todo) -> Result<(), StoreError> {
        let mut updated = todo.clone();
        updated.reject_correction();
        self.store.update_todo(&updated).await
    }

    /// Set or clear the due date.
    pub async fn set_due_date(
        &self,
        todo: &Todo,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut updated = todo.clone();
        updated.due_date = due_date;
        self.store.update_todo(&updated).await
    }

    /// Briefing over incomplete todos. Returns the fixed no-tasks sentence
    /// without calling the model when nothing is left.
    pub async fn summarize(&self) -> Result<DailyBriefing, SummarizeError> {
        let todos = self.store.list_todos().await?;
        let lines: Vec<String> = todos
            .iter()
            .filter(|t| !t.is_completed)
            .map(Todo::briefing_line)
            .collect();

        if lines.is_empty() {
            return Ok(DailyBriefing::no_tasks());
        }

        Ok(self.transformer.summarize(&lines).await?)
    }
}
