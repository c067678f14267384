//! SQLite-based todo store.

use super::{sanitize_filename, StoreError, TodoStore};
use crate::todo::Todo;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS todos (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    suggested_correction TEXT,
    is_correction_pending INTEGER NOT NULL DEFAULT 0,
    due_date TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos(created_at);
"#;

const SELECT_COLUMNS: &str = "SELECT id, title, is_completed, suggested_correction,
        is_correction_pending, due_date, created_at FROM todos";

pub struct SqliteTodoStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTodoStore {
    pub async fn new(base_dir: PathBuf, user_id: &str) -> Result<Self, StoreError> {
        let db_path = base_dir.join(format!("todos-{}.db", sanitize_filename(user_id)));

        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| StoreError::Io(format!("Failed to create todo store dir: {}", e)))?;

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            Self::run_migrations(&conn)?;
            tracing::debug!("Opened SQLite todo store {}", db_path.display());
            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Database(format!("Task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Bring databases created before correction and due-date support up to date.
    /// CREATE TABLE IF NOT EXISTS doesn't add columns to existing tables.
    fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
        let added_columns = [
            ("suggested_correction", "TEXT"),
            ("is_correction_pending", "INTEGER NOT NULL DEFAULT 0"),
            ("due_date", "TEXT"),
        ];

        for (column, definition) in added_columns {
            let exists: bool = conn
                .prepare("SELECT 1 FROM pragma_table_info('todos') WHERE name = ?1")?
                .exists(params![column])?;
            if !exists {
                tracing::info!("Running migration: adding '{}' column to todos table", column);
                conn.execute(
                    &format!("ALTER TABLE todos ADD COLUMN {} {}", column, definition),
                    [],
                )?;
            }
        }

        Ok(())
    }
}

/// Fixed-width UTC timestamps, so text order is time order.
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(idx: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_row(row: &rusqlite::Row<'_>) -> Result<Todo, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let due_date: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Todo {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        title: row.get(1)?,
        is_completed: row.get::<_, i32>(2)? != 0,
        suggested_correction: row.get(3)?,
        is_correction_pending: row.get::<_, i32>(4)? != 0,
        due_date: due_date.as_deref().map(|s| parse_time(5, s)).transpose()?,
        created_at: parse_time(6, &created_at)?,
    })
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt =
                conn.prepare(&format!("{} ORDER BY created_at ASC, id ASC", SELECT_COLUMNS))?;
            let todos = stmt
                .query_map([], parse_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok::<_, StoreError>(todos)
        })
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
    }

    async fn get_todo(&self, id: Uuid) -> Result<Option<Todo>, StoreError> {
        let conn = self.conn.clone();
        let id_str = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let todo = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                    params![&id_str],
                    parse_row,
                )
                .optional()?;
            Ok::<_, StoreError>(todo)
        })
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
    }

    async fn insert_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let todo = todo.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT OR REPLACE INTO todos (id, title, is_completed, suggested_correction,
                        is_correction_pending, due_date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    todo.id.to_string(),
                    todo.title,
                    todo.is_completed as i32,
                    todo.suggested_correction,
                    todo.is_correction_pending as i32,
                    todo.due_date.as_ref().map(format_time),
                    format_time(&todo.created_at),
                ],
            )?;
            Ok::<_, StoreError>(())
        })
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
    }

    async fn update_todo(&self, todo: &Todo) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let todo = todo.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let changed = conn.execute(
                "UPDATE todos SET title = ?2, is_completed = ?3, suggested_correction = ?4,
                        is_correction_pending = ?5, due_date = ?6
                 WHERE id = ?1",
                params![
                    todo.id.to_string(),
                    todo.title,
                    todo.is_completed as i32,
                    todo.suggested_correction,
                    todo.is_correction_pending as i32,
                    todo.due_date.as_ref().map(format_time),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(todo.id));
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
    }

    async fn toggle_todo(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.conn.clone();
        let id_str = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let changed = conn.execute(
                "UPDATE todos SET is_completed = 1 - is_completed WHERE id = ?1",
                params![&id_str],
            )?;
            Ok::<_, StoreError>(changed > 0)
        })
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
    }

    async fn delete_todo(&self, id: Uuid) -> Result<bool, StoreError> {
        let conn = self.conn.clone();
        let id_str = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let changed = conn.execute("DELETE FROM todos WHERE id = ?1", params![&id_str])?;
            Ok::<_, StoreError>(changed > 0)
        })
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_roundtrip_through_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = temp.path().to_path_buf();
        let due = Utc.with_ymd_and_hms(2026, 11, 2, 17, 30, 0).unwrap();

        let mut todo = Todo::new("pay rent", Some(due));
        {
            let store = SqliteTodoStore::new(base.clone(), "dave").await.expect("open");
            store.insert_todo(&todo).await.expect("insert");
            todo.apply_correction_result("Pay the rent");
            store.update_todo(&todo).await.expect("update");
        }

        let reopened = SqliteTodoStore::new(base, "dave").await.expect("reopen");
        let stored = reopened
            .get_todo(todo.id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(stored.title, "pay rent");
        assert_eq!(stored.suggested_correction.as_deref(), Some("Pay the rent"));
        assert!(stored.is_correction_pending);
        assert_eq!(stored.due_date, Some(due));
        assert_eq!(
            stored.created_at.timestamp_micros(),
            todo.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_lists_oldest_first() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SqliteTodoStore::new(temp.path().to_path_buf(), "erin")
            .await
            .expect("open");

        // Whole-second and fractional timestamps must still order by time.
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut first = Todo::new("first", None);
        first.created_at = base;
        let mut second = Todo::new("second", None);
        second.created_at = base + chrono::Duration::milliseconds(500);
        let mut third = Todo::new("third", None);
        third.created_at = base + chrono::Duration::seconds(1);

        for todo in [&third, &first, &second] {
            store.insert_todo(todo).await.expect("insert");
        }

        let todos = store.list_todos().await.expect("list");
        let titles: Vec<&str> = todos.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_toggle_delete_and_missing_update() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SqliteTodoStore::new(temp.path().to_path_buf(), "erin")
            .await
            .expect("open");
        let todo = Todo::new("stretch", None);
        store.insert_todo(&todo).await.expect("insert");

        assert!(store.toggle_todo(todo.id).await.expect("toggle"));
        assert!(store.list_todos().await.expect("list")[0].is_completed);
        assert!(store.toggle_todo(todo.id).await.expect("toggle"));
        assert!(!store.list_todos().await.expect("list")[0].is_completed);

        assert!(!store.toggle_todo(Uuid::new_v4()).await.expect("toggle"));
        assert!(!store.delete_todo(Uuid::new_v4()).await.expect("delete"));

        let ghost = Todo::new("ghost", None);
        assert!(matches!(
            store.update_todo(&ghost).await,
            Err(StoreError::NotFound(_))
        ));

        assert!(store.delete_todo(todo.id).await.expect("delete"));
        assert!(store.list_todos().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_migrates_legacy_schema() {
        let temp = tempfile::tempdir().expect("tempdir");
        let db_path = temp.path().join("todos-legacy.db");
        {
            let conn = Connection::open(&db_path).expect("open legacy");
            conn.execute_batch(
                "CREATE TABLE todos (
                    id TEXT PRIMARY KEY NOT NULL,
                    title TEXT NOT NULL,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );",
            )
            .expect("legacy schema");
            conn.execute(
                "INSERT INTO todos (id, title, is_completed, created_at) VALUES (?1, ?2, 0, ?3)",
                params![
                    Uuid::new_v4().to_string(),
                    "old entry",
                    Utc::now().to_rfc3339()
                ],
            )
            .expect("legacy row");
        }

        let store = SqliteTodoStore::new(temp.path().to_path_buf(), "legacy")
            .await
            .expect("migrate");
        let todos = store.list_todos().await.expect("list");
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "old entry");
        assert!(!todos[0].is_correction_pending);
        assert!(todos[0].due_date.is_none());
    }
}
