//! Side effects of a finished countdown.
//!
//! Steps run in order: record write-back, alarm, notification. Each one is
//! independently fallible; a failure is logged and the next step still runs.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::alarm::Alarm;
use crate::notify::{Notifier, Permission};
use crate::storage::config::{Settings, SettingsSource};
use crate::task::TaskStore;

/// Title used when the task record could not be loaded.
pub const PLACEHOLDER_TITLE: &str = "Task";
pub const NOTIFICATION_TITLE: &str = "Timebox complete!";

pub fn completion_message(task_title: &str) -> String {
    format!("\"{task_title}\" is finished. Nice work!")
}

/// Collaborators the completion sequence talks to.
#[derive(Clone)]
pub struct CompletionHooks {
    tasks: Arc<dyn TaskStore>,
    settings: Arc<dyn SettingsSource>,
    alarm: Arc<dyn Alarm>,
    notifier: Arc<dyn Notifier>,
}

/// What actually happened during one completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionReport {
    pub task_title: Option<String>,
    pub actual_duration_secs: Option<u64>,
    pub record_updated: bool,
    pub sound_played: bool,
    pub notified: bool,
}

impl CompletionHooks {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        settings: Arc<dyn SettingsSource>,
        alarm: Arc<dyn Alarm>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tasks,
            settings,
            alarm,
            notifier,
        }
    }

    /// Run the sequence for `task_id` with `remaining_secs` left on the
    /// clock (zero on the normal expiry path).
    pub fn run(&self, task_id: &str, remaining_secs: u64) -> CompletionReport {
        let mut report = CompletionReport::default();
        self.write_back(task_id, remaining_secs, &mut report);

        let settings = self.settings.settings().unwrap_or_else(|e| {
            error!("failed to load settings for timer completion: {e}");
            Settings::fallback()
        });

        if settings.sound_enabled {
            match self.alarm.play(settings.sound_choice, settings.sound_volume) {
                Ok(()) => report.sound_played = true,
                Err(e) => warn!("failed to play alarm: {e}"),
            }
        }

        if settings.notification_enabled {
            let permission = self.notifier.permission();
            if permission == Permission::Granted {
                let title = report.task_title.as_deref().unwrap_or(PLACEHOLDER_TITLE);
                match self
                    .notifier
                    .notify(NOTIFICATION_TITLE, &completion_message(title))
                {
                    Ok(()) => report.notified = true,
                    Err(e) => warn!("failed to show completion notification: {e}"),
                }
            } else {
                debug!(?permission, "notification not shown");
            }
        }

        report
    }

    fn write_back(&self, task_id: &str, remaining_secs: u64, report: &mut CompletionReport) {
        let mut task = match self.tasks.get_task(task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(task_id, "completed task no longer exists, skipping write-back");
                return;
            }
            Err(e) => {
                error!(task_id, "failed to load completed task: {e}");
                return;
            }
        };
        report.task_title = Some(task.title.clone());
        let actual = task.planned_secs().saturating_sub(remaining_secs);
        task.actual_duration_secs = Some(actual);
        report.actual_duration_secs = Some(actual);
        match self.tasks.update_task(&task) {
            Ok(()) => report.record_updated = true,
            Err(e) => error!(task_id, "failed to record actual duration: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::SoundChoice;
    use crate::storage::config::Config;
    use crate::task::{MemoryTaskStore, TaskRecord};
    use crate::timer::testing::{BrokenSettings, BrokenStore, Fixture, RecordingNotifier};
    use crate::timer::{ManualClock, MemorySlot, TimerController, TimerPhase};

    #[test]
    fn records_elapsed_and_alerts() {
        let fx = Fixture::new();
        let task = TaskRecord::new("Write tests", 25).unwrap();
        fx.tasks.create_task(&task).unwrap();

        let report = fx.hooks(Config::default()).run(&task.id, 0);
        assert!(report.record_updated);
        assert_eq!(report.actual_duration_secs, Some(1500));
        assert_eq!(
            fx.tasks.get_task(&task.id).unwrap().unwrap().actual_duration_secs,
            Some(1500)
        );
        assert!(report.sound_played);
        assert_eq!(fx.alarm.plays.lock().unwrap()[0], (SoundChoice::Chime, 0.5));
        assert_eq!(
            fx.shown(),
            vec![(
                "Timebox complete!".to_string(),
                "\"Write tests\" is finished. Nice work!".to_string()
            )]
        );
    }

    #[test]
    fn missing_task_uses_placeholder_title() {
        let fx = Fixture::new();
        let report = fx.hooks(Config::default()).run("gone", 0);
        assert!(!report.record_updated);
        assert!(report.actual_duration_secs.is_none());
        assert_eq!(fx.shown()[0].1, "\"Task\" is finished. Nice work!");
    }

    #[test]
    fn disabled_alerts_are_skipped() {
        let fx = Fixture::new();
        let mut config = Config::default();
        config.sound.enabled = false;
        config.notifications.enabled = false;
        let report = fx.hooks(config).run("t1", 0);
        assert!(!report.sound_played && !report.notified);
        assert_eq!(fx.plays(), 0);
        assert!(fx.shown().is_empty());
    }

    #[test]
    fn notification_needs_permission() {
        let mut fx = Fixture::new();
        fx.notifier = RecordingNotifier::with(Permission::Default);
        let report = fx.hooks(Config::default()).run("t1", 0);
        assert!(!report.notified);
        assert!(report.sound_played);
    }

    #[test]
    fn failures_do_not_stop_later_steps() {
        let fx = Fixture::new();
        let hooks = CompletionHooks::new(
            Arc::new(BrokenStore),
            Arc::new(BrokenSettings),
            Arc::new(fx.alarm.clone()),
            Arc::new(fx.notifier.clone()),
        );
        let report = hooks.run("t1", 0);
        assert!(!report.record_updated);
        // Unreadable settings: silent, but still notify.
        assert!(!report.sound_played);
        assert!(report.notified);
        assert_eq!(fx.shown().len(), 1);
    }

    #[test]
    fn competing_completions_run_side_effects_once() {
        let fx = Fixture::new();
        let task = TaskRecord::new("Once", 1).unwrap();
        fx.tasks.create_task(&task).unwrap();
        let hooks = fx.hooks(Config::default());

        let slot = MemorySlot::new();
        let clock = ManualClock::default();
        let a = TimerController::new(Arc::new(slot.clone()), Arc::new(clock.clone()));
        let b = TimerController::new(Arc::new(slot), Arc::new(clock.clone()));
        a.start(&task.id, 60).unwrap();
        clock.advance_secs(60);

        let first = a.poll_once(&hooks).unwrap();
        let second = b.poll_once(&hooks).unwrap();
        assert!(matches!(first, Some(crate::events::Event::TimerCompleted { .. })));
        assert!(second.is_none());
        assert!(a.complete(&hooks).unwrap().is_none());
        assert_eq!(fx.plays(), 1);
        assert_eq!(fx.shown().len(), 1);
        assert_eq!(b.phase(), TimerPhase::Idle);
    }

    #[test]
    fn early_completion_records_elapsed_only() {
        let tasks = MemoryTaskStore::new();
        let fx = Fixture {
            tasks: tasks.clone(),
            ..Fixture::new()
        };
        let task = TaskRecord::new("Early", 10).unwrap();
        tasks.create_task(&task).unwrap();
        let clock = ManualClock::default();
        let ctl = TimerController::new(Arc::new(MemorySlot::new()), Arc::new(clock.clone()));
        ctl.start(&task.id, 600).unwrap();
        clock.advance_secs(240);

        let event = ctl.complete(&fx.hooks(Config::default())).unwrap();
        match event {
            Some(crate::events::Event::TimerCompleted {
                actual_duration_secs,
                ..
            }) => assert_eq!(actual_duration_secs, Some(240)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctl.phase(), TimerPhase::Idle);
    }
}
