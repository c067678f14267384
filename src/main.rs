//! taskbrief - line-oriented front end for the task list.
//!
//! Commands: `add <title> [@YYYY-MM-DD]`, `list`, `toggle <n>`, `delete <n>`,
//! `accept <n>`, `reject <n>`, `due <n> <YYYY-MM-DD|none>`, `brief`, `quit`.
//! Indexes are 1-based positions in the last printed list.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use taskbrief::llm::{EchoClient, LlmClient, OpenRouterClient};
use taskbrief::store::{create_todo_store, TodoStore};
use taskbrief::transform::TextTransformService;
use taskbrief::usecase::TodoUseCases;
use taskbrief::{Config, ListEvent, Todo, TodoListController};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskbrief=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, store={:?}, data_dir={}",
        config.default_model,
        config.store_type,
        config.data_dir.display()
    );

    let client: Arc<dyn LlmClient> = match (&config.api_key, &config.api_url) {
        (Some(key), Some(url)) => Arc::new(OpenRouterClient::with_api_url(key.clone(), url.clone())),
        (Some(key), None) => Arc::new(OpenRouterClient::new(key.clone())),
        (None, _) => {
            warn!("OPENROUTER_API_KEY not set, running offline");
            Arc::new(EchoClient)
        }
    };

    let store: Arc<dyn TodoStore> = Arc::from(
        create_todo_store(config.store_type, config.data_dir.clone(), &config.user_id).await?,
    );
    if !store.is_persistent() {
        warn!("Using the in-memory store, todos are lost on exit");
    }
    let transformer = Arc::new(TextTransformService::new(client, &config.default_model));
    let controller = TodoListController::new(TodoUseCases::new(store, transformer));

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ListEvent::TodosChanged(todos)) => print_todos(&todos),
                Ok(ListEvent::BriefingChanged(briefing)) => println!("Briefing: {}", briefing),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Skipped {} list events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    controller.reload().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            "" => {}
            "quit" | "exit" => break,
            "list" => print_todos(&controller.todos().await),
            "brief" => match controller.briefing().await {
                Some(briefing) => println!("Briefing: {}", briefing),
                None => println!("Briefing: (not generated yet)"),
            },
            "add" => {
                let (title, due) = match rest.rsplit_once(" @") {
                    Some((title, date)) => match parse_due(date) {
                        Ok(due) => (title.trim(), due),
                        Err(e) => {
                            println!("{}", e);
                            continue;
                        }
                    },
                    None => (rest, None),
                };
                if title.is_empty() {
                    println!("usage: add <title> [@YYYY-MM-DD]");
                    continue;
                }
                // The correction finishes in the background and publishes its own event.
                let _ = controller.add_todo(title, due).await;
            }
            "toggle" | "delete" | "accept" | "reject" | "due" => {
                let (index, arg) = rest.split_once(' ').unwrap_or((rest, ""));
                let Some(todo) = pick(&controller, index).await else {
                    println!("no todo at position {:?}", index);
                    continue;
                };
                match command {
                    "toggle" => controller.toggle_completion(&todo).await,
                    "delete" => controller.delete(&todo).await,
                    "accept" => controller.accept_correction(&todo).await,
                    "reject" => controller.reject_correction(&todo).await,
                    _ => match parse_due(arg.trim()) {
                        Ok(due) => controller.set_due_date(&todo, due).await,
                        Err(e) => println!("{}", e),
                    },
                }
            }
            other => println!("unknown command: {}", other),
        }
    }

    Ok(())
}

async fn pick(controller: &TodoListController, index: &str) -> Option<Todo> {
    let position: usize = index.trim().parse().ok()?;
    controller
        .todos()
        .await
        .into_iter()
        .nth(position.checked_sub(1)?)
}

fn parse_due(value: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid date {:?}: {}", value, e))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid date {:?}", value))?;
    Ok(Some(midnight.and_utc()))
}

fn print_todos(todos: &[Todo]) {
    if todos.is_empty() {
        println!("(no todos)");
        return;
    }
    for (i, todo) in todos.iter().enumerate() {
        for line in todo_lines(i + 1, todo) {
            println!("{}", line);
        }
    }
}

/// Display lines for the todo at list position `n` (1-based).
fn todo_lines(n: usize, todo: &Todo) -> Vec<String> {
    let mark = if todo.is_completed { "x" } else { " " };
    let due = todo
        .due_date
        .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
        .unwrap_or_default();
    let mut lines = vec![format!("{:>3}. [{}] {}{}", n, mark, todo.title, due)];
    if let Some(suggestion) = &todo.suggested_correction {
        lines.push(format!(
            "       suggestion: {}  (accept {1} / reject {1})",
            suggestion, n
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_line_names_list_position() {
        let mut todo = Todo::new("todo go store", None);
        todo.apply_correction_result("Go to the store");

        let lines = todo_lines(2, &todo);
        assert_eq!(lines[0], "  2. [ ] todo go store");
        assert_eq!(
            lines[1],
            "       suggestion: Go to the store  (accept 2 / reject 2)"
        );
    }

    #[test]
    fn parses_due_dates() {
        assert_eq!(parse_due("none").expect("none"), None);
        let due = parse_due("2026-11-02").expect("date").expect("some");
        assert_eq!(due.format("%Y-%m-%d").to_string(), "2026-11-02");
        assert!(parse_due("tomorrow").is_err());
    }
}
