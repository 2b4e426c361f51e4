//! Task management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use nook_core::state::NewTask;

use super::{open_app, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task text
        text: String,
        /// Category (default: General)
        #[arg(long)]
        category: Option<String>,
        /// Priority from 1 (normal) to 4 (urgent)
        #[arg(long)]
        priority: Option<u8>,
        /// Estimated pomodoros (default: 1)
        #[arg(long)]
        estimate: Option<u32>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// List tasks
    List {
        /// Show archived tasks instead
        #[arg(long)]
        archived: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle completion
    Toggle {
        /// Task ID
        id: String,
    },
    /// Archive a task, or remove it for good if already archived
    Delete {
        /// Task ID
        id: String,
    },
    /// Move an archived task back to the list
    Restore {
        /// Task ID
        id: String,
    },
    /// Set the task credited by focus sessions
    Focus {
        /// Task ID; omit to clear
        id: Option<String>,
    },
    /// Archive every completed task
    ArchiveCompleted,
    /// Remove every archived task
    ClearArchive,
}

pub fn run(action: TaskAction) -> CmdResult {
    let app = open_app()?;

    match action {
        TaskAction::Add {
            text,
            category,
            priority,
            estimate,
            due,
        } => {
            let id = app.add_task(NewTask {
                text,
                category,
                priority,
                estimated_pomos: estimate,
                due_date: due,
            })?;
            println!("Task added: {id}");
        }
        TaskAction::List { archived, json } => {
            let tasks = app.tasks.with_state(|t| {
                if archived {
                    t.archived_tasks.clone()
                } else {
                    t.tasks.clone()
                }
            });
            let focused = app.tasks.with_state(|t| t.focused_task_id.clone());
            if json {
                print_json(&tasks)?;
            } else if tasks.is_empty() {
                println!("No tasks.");
            } else {
                for task in &tasks {
                    let mark = if task.completed { "x" } else { " " };
                    let star = if focused.as_deref() == Some(task.id.as_str()) { "*" } else { " " };
                    println!(
                        "[{mark}]{star} {}  {}  P{} {}  {}/{}",
                        task.id,
                        task.text,
                        task.priority,
                        task.category,
                        task.completed_pomos,
                        task.estimated_pomos
                    );
                }
            }
        }
        TaskAction::Toggle { id } => {
            let completed = app.toggle_task(&id)?;
            println!("Task {id}: {}", if completed { "completed" } else { "reopened" });
        }
        TaskAction::Delete { id } => {
            app.delete_task(&id)?;
            println!("Task deleted: {id}");
        }
        TaskAction::Restore { id } => {
            app.restore_task(&id)?;
            println!("Task restored: {id}");
        }
        TaskAction::Focus { id } => {
            app.set_focused_task(id.as_deref())?;
            match id {
                Some(id) => println!("Focused task: {id}"),
                None => println!("Focus cleared"),
            }
        }
        TaskAction::ArchiveCompleted => {
            let moved = app.archive_completed();
            println!("Archived {moved} task(s)");
        }
        TaskAction::ClearArchive => {
            let removed = app.clear_archive();
            println!("Removed {removed} archived task(s)");
        }
    }
    Ok(())
}
