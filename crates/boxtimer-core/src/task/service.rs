//! Task operations that also touch the countdown.

use tracing::debug;

use super::record::{TaskRecord, TaskStore};
use crate::error::{Result, ValidationError};
use crate::timer::TimerController;

fn require(store: &dyn TaskStore, id: &str) -> Result<TaskRecord> {
    store.get_task(id)?.ok_or_else(|| {
        ValidationError::NotFound {
            kind: "task",
            id: id.to_string(),
        }
        .into()
    })
}

/// Mark a task done by hand.
///
/// If it is the task being timed, the actual duration is what has elapsed
/// so far and the timer is cleared; otherwise the full plan counts.
pub fn complete_task(
    store: &dyn TaskStore,
    timer: &TimerController,
    id: &str,
) -> Result<TaskRecord> {
    let mut task = require(store, id)?;
    let is_active = timer.active_task_id().as_deref() == Some(id);
    let actual = if is_active {
        task.planned_secs()
            .saturating_sub(timer.remaining_seconds())
    } else {
        task.planned_secs()
    };
    task.completed = true;
    task.actual_duration_secs = Some(actual);
    store.update_task(&task)?;
    if is_active {
        timer.clear()?;
    }
    debug!(task_id = id, actual, "task completed manually");
    Ok(task)
}

/// Delete a task, clearing the timer when it was counting for it.
pub fn delete_task(store: &dyn TaskStore, timer: &TimerController, id: &str) -> Result<()> {
    store.delete_task(id)?;
    if timer.active_task_id().as_deref() == Some(id) {
        timer.clear()?;
    }
    Ok(())
}

/// Create a fresh copy of an existing task to run it again.
pub fn repeat_task(store: &dyn TaskStore, id: &str) -> Result<TaskRecord> {
    let again = require(store, id)?.repeat();
    store.create_task(&again)?;
    Ok(again)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::MemoryTaskStore;
    use crate::timer::{ManualClock, MemorySlot, TimerPhase};
    use std::sync::Arc;

    fn setup() -> (MemoryTaskStore, TimerController, ManualClock) {
        let clock = ManualClock::default();
        let timer = TimerController::new(Arc::new(MemorySlot::new()), Arc::new(clock.clone()));
        (MemoryTaskStore::new(), timer, clock)
    }

    #[test]
    fn completing_active_task_records_elapsed_and_clears() {
        let (store, timer, clock) = setup();
        let task = TaskRecord::new("Draft", 25).unwrap();
        store.create_task(&task).unwrap();
        timer.start(&task.id, task.planned_secs()).unwrap();
        clock.advance_secs(600);

        let done = complete_task(&store, &timer, &task.id).unwrap();
        assert!(done.completed);
        assert_eq!(done.actual_duration_secs, Some(600));
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(store.get_task(&task.id).unwrap().unwrap(), done);
    }

    #[test]
    fn completing_other_task_counts_full_plan() {
        let (store, timer, _) = setup();
        let running = TaskRecord::new("Running", 25).unwrap();
        let other = TaskRecord::new("Other", 10).unwrap();
        store.create_task(&running).unwrap();
        store.create_task(&other).unwrap();
        timer.start(&running.id, 1500).unwrap();

        let done = complete_task(&store, &timer, &other.id).unwrap();
        assert_eq!(done.actual_duration_secs, Some(600));
        assert_eq!(timer.active_task_id().as_deref(), Some(running.id.as_str()));
    }

    #[test]
    fn completing_unknown_task_fails() {
        let (store, timer, _) = setup();
        assert!(complete_task(&store, &timer, "missing").is_err());
    }

    #[test]
    fn deleting_active_task_clears_timer() {
        let (store, timer, _) = setup();
        let task = TaskRecord::new("Gone", 5).unwrap();
        store.create_task(&task).unwrap();
        timer.start(&task.id, 300).unwrap();

        delete_task(&store, &timer, &task.id).unwrap();
        assert!(store.get_task(&task.id).unwrap().is_none());
        assert_eq!(timer.phase(), TimerPhase::Idle);
    }

    #[test]
    fn repeat_creates_new_record() {
        let (store, _, _) = setup();
        let task = TaskRecord::new("Again", 5).unwrap();
        store.create_task(&task).unwrap();
        let again = repeat_task(&store, &task.id).unwrap();
        assert_ne!(again.id, task.id);
        assert_eq!(store.list_tasks().unwrap().len(), 2);
    }
}
