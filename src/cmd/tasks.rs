//! Board commands: `kanban board|add|edit|move|forward|back|delete`.
//!
//! Every command loads the full task list first, then goes through the
//! `TaskSynchronizer` so the CLI sees exactly what a UI session would.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use kanban::board::{
    ColumnView, HttpTaskStore, Task, TaskDraft, TaskPatch, TaskStatus, TaskSynchronizer,
};
use kanban::config::KanbanConfig;
use kanban::errors::SyncError;

/// Column step for `forward` / `back`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
}

/// Connect to the configured store and load the board.
async fn connect(config: &KanbanConfig) -> Result<TaskSynchronizer> {
    let store = HttpTaskStore::new(&config.api_url(), config.request_timeout())?;
    let base_url = store.base_url().to_string();
    let sync = TaskSynchronizer::new(Arc::new(store));
    sync.refresh()
        .await
        .with_context(|| format!("Could not load tasks from {}", base_url))?;
    Ok(sync)
}

/// Lead store failures with the board's message. Precondition errors
/// already read as one.
fn report(err: SyncError) -> anyhow::Error {
    if err.is_precondition() {
        return err.into();
    }
    let message = err.user_message().unwrap_or("Task store request failed");
    anyhow::Error::new(err).context(message)
}

/// Resolve a full id or a unique id prefix against the loaded tasks.
fn resolve_id(tasks: &[Task], input: &str) -> Result<String> {
    if let Some(task) = tasks.iter().find(|t| t.id == input) {
        return Ok(task.id.clone());
    }
    let matches: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(input)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => bail!("No task matches id '{}'", input),
        _ => bail!(
            "Id prefix '{}' is ambiguous ({} tasks match)",
            input,
            matches.len()
        ),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Render the columns as plain text blocks, one per column.
pub fn render_board(columns: &[ColumnView]) -> String {
    let mut out = String::new();
    for column in columns {
        out.push_str(&format!(
            "{} ({})\n",
            style(column.title).bold().cyan(),
            column.tasks.len()
        ));
        if column.tasks.is_empty() {
            out.push_str(&format!("  {}\n", style("(empty)").dim()));
        }
        for task in &column.tasks {
            out.push_str(&format!(
                "  {} {}\n",
                style(short_id(&task.id)).dim(),
                task.title
            ));
            if !task.description.is_empty() {
                out.push_str(&format!("      {}\n", task.description));
            }
        }
        out.push('\n');
    }
    out
}

pub async fn cmd_board(config: &KanbanConfig) -> Result<()> {
    let sync = connect(config).await?;
    print!("{}", render_board(&sync.board()));
    Ok(())
}

pub async fn cmd_add(config: &KanbanConfig, title: &str, description: Option<&str>) -> Result<()> {
    let sync = connect(config).await?;
    let mut draft = TaskDraft::new(title);
    if let Some(description) = description {
        draft = draft.with_description(description);
    }
    let task = sync.create(draft).await.map_err(report)?;
    println!("Created {} {}", style(&task.id).green(), task.title);
    Ok(())
}

pub async fn cmd_edit(
    config: &KanbanConfig,
    id: &str,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    if title.is_none() && description.is_none() {
        bail!("Nothing to change: pass --title and/or --description");
    }
    let sync = connect(config).await?;
    let id = resolve_id(&sync.tasks(), id)?;
    let patch = TaskPatch {
        title,
        description,
        status: None,
    };
    let task = sync.update(&id, patch).await.map_err(report)?;
    println!("Updated {} {}", style(short_id(&task.id)).green(), task.title);
    Ok(())
}

pub async fn cmd_move(config: &KanbanConfig, id: &str, status: TaskStatus) -> Result<()> {
    let sync = connect(config).await?;
    let id = resolve_id(&sync.tasks(), id)?;
    sync.move_task(&id, status).await.map_err(report)?;
    println!("Moved {} to {}", short_id(&id), style(status.title()).bold());
    Ok(())
}

pub async fn cmd_step(config: &KanbanConfig, id: &str, direction: Direction) -> Result<()> {
    let sync = connect(config).await?;
    let id = resolve_id(&sync.tasks(), id)?;
    match direction {
        Direction::Forward => sync.move_forward(&id).await.map_err(report)?,
        Direction::Back => sync.move_backward(&id).await.map_err(report)?,
    }
    let status = sync
        .snapshot()
        .find(&id)
        .map(|t| t.status.title())
        .unwrap_or("?");
    println!("Moved {} to {}", short_id(&id), style(status).bold());
    Ok(())
}

pub async fn cmd_delete(config: &KanbanConfig, id: &str, yes: bool) -> Result<()> {
    use dialoguer::Confirm;

    let sync = connect(config).await?;
    let id = resolve_id(&sync.tasks(), id)?;

    if !yes {
        let title = sync
            .snapshot()
            .find(&id)
            .map(|t| t.title.clone())
            .unwrap_or_default();
        let confirm = Confirm::new()
            .with_prompt(format!("Delete task '{}'?", title))
            .default(false)
            .interact()
            .context("Failed to read delete confirmation")?;

        if !confirm {
            println!("Delete cancelled");
            return Ok(());
        }
    }

    sync.delete(&id).await.map_err(report)?;
    println!("Deleted {}", short_id(&id));
    Ok(())
}
