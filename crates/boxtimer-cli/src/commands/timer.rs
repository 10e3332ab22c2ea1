use std::sync::Arc;
use std::time::Duration;

use boxtimer_core::events::Event;
use boxtimer_core::task::TaskStore;
use boxtimer_core::timer::run_expiry_loop;
use boxtimer_core::ValidationError;
use clap::Subcommand;
use tokio::sync::watch;

use super::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start counting down for a task
    Start {
        /// Task ID
        task_id: String,
        /// Duration in seconds (defaults to the task's planned duration)
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Stop and rewind the countdown
    Reset {
        /// New duration in seconds (defaults to the task's planned duration)
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Drop the active timer without completing it
    Clear,
    /// Print current timer state as JSON
    Status,
    /// Stay in the foreground and complete the timer when it runs out
    Watch,
}

fn planned_secs(app: &App, task_id: &str) -> CliResult<u64> {
    let task = app
        .tasks
        .get_task(task_id)?
        .ok_or_else(|| ValidationError::NotFound {
            kind: "task",
            id: task_id.to_string(),
        })?;
    Ok(task.planned_secs())
}

/// Print the event when the command did something, the snapshot otherwise.
fn print_outcome(app: &App, event: Option<Event>) -> CliResult {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&app.timer.snapshot()),
    }
}

pub fn run(action: TimerAction) -> CliResult {
    let app = App::open()?;

    match action {
        TimerAction::Start { task_id, secs } => {
            let secs = match secs {
                Some(secs) => secs,
                None => planned_secs(&app, &task_id)?,
            };
            let event = app.timer.start(&task_id, secs)?;
            print_outcome(&app, event)?;
        }
        TimerAction::Pause => print_outcome(&app, app.timer.pause()?)?,
        TimerAction::Resume => print_outcome(&app, app.timer.resume()?)?,
        TimerAction::Reset { secs } => {
            let secs = match (secs, app.timer.active_task_id()) {
                (Some(secs), _) => secs,
                (None, Some(task_id)) => planned_secs(&app, &task_id)?,
                (None, None) => 0,
            };
            print_outcome(&app, app.timer.reset(secs)?)?;
        }
        TimerAction::Clear => print_outcome(&app, app.timer.clear()?)?,
        TimerAction::Status => {
            let completed = app.timer.poll_once(&app.hooks)?;
            print_json(&app.timer.snapshot())?;
            if let Some(event) = completed {
                print_json(&event)?;
                app.alarm.wait();
            }
        }
        TimerAction::Watch => watch_timer(app)?,
    }
    Ok(())
}

fn watch_timer(app: App) -> CliResult {
    let period = Duration::from_millis(app.config.timer.poll_interval_ms);
    let alarm = app.alarm.clone();
    app.timer.add_listener(|event| {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
    });
    println!("{}", serde_json::to_string(&app.timer.snapshot())?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_expiry_loop(
            Arc::clone(&app.timer),
            Arc::clone(&app.hooks),
            period,
            shutdown_rx,
        ));
        tokio::signal::ctrl_c().await?;
        let _ = shutdown_tx.send(true);
        handle.await?;
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;
    alarm.wait();
    Ok(())
}
