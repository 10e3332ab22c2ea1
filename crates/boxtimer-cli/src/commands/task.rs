//! Task management commands for CLI.

use boxtimer_core::task::{self, TaskRecord, TaskStore};
use boxtimer_core::ValidationError;
use chrono::{Local, NaiveDate};
use clap::Subcommand;

use super::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Planned duration in minutes (default: from config)
        #[arg(long)]
        minutes: Option<u32>,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Scheduled date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List tasks
    List {
        /// Only tasks scheduled on this date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "today")]
        date: Option<NaiveDate>,
        /// Only tasks scheduled today
        #[arg(long)]
        today: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New planned duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New scheduled date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Set completed status
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Mark a task as done
    Complete {
        /// Task ID
        id: String,
    },
    /// Create a fresh copy of a task to run again
    Repeat {
        /// Task ID
        id: String,
    },
    /// Delete all completed tasks
    ClearCompleted,
}

fn require(app: &App, id: &str) -> CliResult<TaskRecord> {
    let task = app.tasks.get_task(id)?.ok_or_else(|| ValidationError::NotFound {
        kind: "task",
        id: id.to_string(),
    })?;
    Ok(task)
}

pub fn run(action: TaskAction) -> CliResult {
    let app = App::open()?;

    match action {
        TaskAction::Create {
            title,
            minutes,
            description,
            date,
        } => {
            let minutes = minutes.unwrap_or(app.config.timer.default_duration_min);
            let mut task = TaskRecord::new(title, minutes)?;
            if let Some(description) = description {
                task = task.with_description(description);
            }
            if let Some(date) = date {
                task = task.scheduled_on(date);
            }
            app.tasks.create_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::List { date, today } => {
            let date = if today {
                Some(Local::now().date_naive())
            } else {
                date
            };
            let tasks = match date {
                Some(date) => app.tasks.list_scheduled_on(date)?,
                None => app.tasks.list_tasks()?,
            };
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            print_json(&require(&app, &id)?)?;
        }
        TaskAction::Update {
            id,
            title,
            minutes,
            description,
            date,
            completed,
        } => {
            let mut task = require(&app, &id)?;
            if let Some(title) = title {
                if title.trim().is_empty() {
                    return Err(ValidationError::Empty("title").into());
                }
                task.title = title;
            }
            if let Some(minutes) = minutes {
                if minutes == 0 {
                    return Err(ValidationError::InvalidValue {
                        field: "minutes".into(),
                        message: "must be at least one minute".into(),
                    }
                    .into());
                }
                task.duration_min = minutes;
            }
            if let Some(description) = description {
                task.description = description;
            }
            if date.is_some() {
                task.scheduled_date = date;
            }
            if let Some(completed) = completed {
                task.completed = completed;
            }
            app.tasks.update_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::Delete { id } => {
            task::delete_task(app.tasks.as_ref(), &app.timer, &id)?;
            println!("{{\"type\": \"task_deleted\", \"id\": {}}}", serde_json::to_string(&id)?);
        }
        TaskAction::Complete { id } => {
            let done = task::complete_task(app.tasks.as_ref(), &app.timer, &id)?;
            print_json(&done)?;
        }
        TaskAction::Repeat { id } => {
            let again = task::repeat_task(app.tasks.as_ref(), &id)?;
            print_json(&again)?;
        }
        TaskAction::ClearCompleted => {
            let removed = app.tasks.clear_completed()?;
            println!("{{\"type\": \"tasks_cleared\", \"removed\": {removed}}}");
        }
    }
    Ok(())
}
