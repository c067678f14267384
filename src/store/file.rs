//! JSON file-based todo store.

use super::{sanitize_filename, sort_oldest_first, StoreError, TodoStore};
use crate::todo::Todo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Default)]
struct TodoStoreSnapshot {
    todos: HashMap<Uuid, Todo>,
}

#[derive(Clone)]
pub struct FileTodoStore {
    path: PathBuf,
    todos: Arc<RwLock<HashMap<Uuid, Todo>>>,
    persist_lock: Arc<Mutex<()>>,
}

impl FileTodoStore {
    pub async fn new(base_dir: PathBuf, user_id: &str) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to create todo store dir: {}", e)))?;
        let filename = format!("todos-{}.json", sanitize_filename(user_id));
        let path = base_dir.join(filename);
        let snapshot = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<TodoStoreSnapshot>(&bytes) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("Failed to parse todo store {}: {}", path.display(), e);
                    TodoStoreSnapshot::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => TodoStoreSnapshot::default(),
            Err(err) => {
                tracing::warn!("Failed to read todo store {}: {}", path.display(), err);
                TodoStoreSnapshot::default()
            }
        };

        tracing::debug!(
            "Opened file todo store {} ({} todos)",
            path.display(),
            snapshot.todos.len()
        );

        Ok(Self {
            path,
            todos: Arc::new(RwLock::new(snapshot.todos)),
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = TodoStoreSnapshot {
            todos: self.todos.read().await.clone(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to write todo store: {}", e)))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to finalize todo store: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl TodoStore for FileTodoStore {
    fn is_persistent(&self) -> bool {
        true
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
        self.persist().await
    }

    async fn update_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        {
            let mut todos = self.todos.write().await;
            let stored = todos
                .get_mut(&todo.id)
                .ok_or(StoreError::NotFound(todo.id))?;
            *stored = todo.clone();
        }
        self.persist().await
    }

    async fn toggle_todo(&self, id: Uuid) -> Result<bool, StoreError> {
        let toggled = {
            let mut todos = self.todos.write().await;
            match todos.get_mut(&id) {
                Some(todo) => {
                    todo.is_completed = !todo.is_completed;
                    true
                }
                None => false,
            }
        };
        if toggled {
            self.persist().await?;
        }
        Ok(toggled)
    }

    async fn delete_todo(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.todos.write().await.remove(&id).is_some();
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_todos_survive_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().to_path_buf();

        let mut todo = Todo::new("water plants", None);
        {
            let store = FileTodoStore::new(base.clone(), "alice").await.expect("open");
            store.insert_todo(&todo).await.expect("insert");
            todo.apply_correction_result("Water the plants");
            store.update_todo(&todo).await.expect("update");
            assert!(store.toggle_todo(todo.id).await.expect("toggle"));
        }

        let reopened = FileTodoStore::new(base, "alice").await.expect("reopen");
        let todos = reopened.list_todos().await.expect("list");
        assert_eq!(todos.len(), 1);
        assert_eq!(
            todos[0].suggested_correction.as_deref(),
            Some("Water the plants")
        );
        assert!(todos[0].is_completed);
    }

    #[tokio::test]
    async fn test_lists_oldest_first_after_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().to_path_buf();

        let first = Todo::new("first", None);
        let mut second = Todo::new("second", None);
        second.created_at = first.created_at + chrono::Duration::seconds(3);
        {
            let store = FileTodoStore::new(base.clone(), "frank").await.expect("open");
            store.insert_todo(&second).await.expect("insert");
            store.insert_todo(&first).await.expect("insert");
        }

        let reopened = FileTodoStore::new(base, "frank").await.expect("reopen");
        let todos = reopened.list_todos().await.expect("list");
        let titles: Vec<&str> = todos.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("todos-bob.json"), b"{not json").expect("write");

        let store = FileTodoStore::new(temp.path().to_path_buf(), "bob")
            .await
            .expect("open");
        assert!(store.list_todos().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_delete_persists() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().to_path_buf();
        let todo = Todo::new("temporary", None);
        {
            let store = FileTodoStore::new(base.clone(), "carol").await.expect("open");
            store.insert_todo(&todo).await.expect("insert");
            assert!(store.delete_todo(todo.id).await.expect("delete"));
        }
        let reopened = FileTodoStore::new(base, "carol").await.expect("reopen");
        assert!(reopened.get_todo(todo.id).await.expect("get").is_none());
    }
}
