//! In-memory todo store (non-persistent).

use super::{sort_oldest_first, StoreError, TodoStore};
use crate::todo::Todo;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryTodoStore {
    todos: Arc<RwLock<HashMap<Uuid, Todo>>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self {
            todos: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, StoreError> {
        let mut todos: Vec<Todo> = self.todos.read().await.values().cloned().collect();
        sort_oldest_first(&mut todos);
        Ok(todos)
    }

    async fn get_todo(&self, id: Uuid) -> Result<Option<Todo>, StoreError> {
        Ok(self.todos.read().await.get(&id).cloned())
    }

    async fn insert_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        self.todos.write().await.insert(todo.id, todo.clone());
        Ok(())
    }

    async fn update_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        let mut todos = self.todos.write().await;
        let stored = todos
            .get_mut(&todo.id)
            .ok_or(StoreError::NotFound(todo.id))?;
        *stored = todo.clone();
        Ok(())
    }

    async fn toggle_todo(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut todos = self.todos.write().await;
        match todos.get_mut(&id) {
            Some(todo) => {
                todo.is_completed = !todo.is_completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_todo(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.todos.write().await.remove(&id).is_some())
    }
}
