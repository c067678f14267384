//! Todo storage module with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `file`: JSON snapshot file
//! - `sqlite`: SQLite database

mod file;
mod memory;
mod sqlite;

pub use file::FileTodoStore;
pub use memory::InMemoryTodoStore;
pub use sqlite::SqliteTodoStore;

use crate::todo::Todo;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Todo {0} not found")]
    NotFound(Uuid),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "default".to_string()
    } else {
        out
    }
}

/// Todo store trait - implemented by all storage backends.
///
/// Records are keyed by `Todo::id`.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// List all todos, oldest first.
    async fn list_todos(&self) -> Result<Vec<Todo>, StoreError>;

    /// Get a single todo by ID.
    async fn get_todo(&self, id: Uuid) -> Result<Option<Todo>, StoreError>;

    /// Insert a new record. Replaces an existing record with the same ID.
    async fn insert_todo(&self, todo: &Todo) -> Result<(), StoreError>;

    /// Replace the stored record with the same ID.
    ///
    /// Fails with `StoreError::NotFound` when no such record exists.
    async fn update_todo(&self, todo: &Todo) -> Result<(), StoreError>;

    /// Flip the completion flag. Returns `false` if the ID is unknown.
    async fn toggle_todo(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Delete a record. Returns `false` if the ID is unknown.
    async fn delete_todo(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Todo store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TodoStoreType {
    Memory,
    File,
    #[default]
    Sqlite,
}

impl TodoStoreType {
    /// Parse a store name (`memory`, `file`/`json`, `sqlite`/`db`), case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "file" | "json" => Some(Self::File),
            "sqlite" | "db" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Create a todo store based on type and configuration.
pub async fn create_todo_store(
    store_type: TodoStoreType,
    base_dir: PathBuf,
    user_id: &str,
) -> Result<Box<dyn TodoStore>, StoreError> {
    match store_type {
        TodoStoreType::Memory => Ok(Box::new(InMemoryTodoStore::new())),
        TodoStoreType::File => {
            let store = FileTodoStore::new(base_dir, user_id).await?;
            Ok(Box::new(store))
        }
        TodoStoreType::Sqlite => {
            let store = SqliteTodoStore::new(base_dir, user_id).await?;
            Ok(Box::new(store))
        }
    }
}

/// Sort todos the way every backend returns them.
pub(crate) fn sort_oldest_first(todos: &mut [Todo]) {
    todos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}
