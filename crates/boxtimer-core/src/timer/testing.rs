//! Recording collaborators for unit tests.

use std::sync::{Arc, Mutex};

use super::completion::CompletionHooks;
use crate::alarm::{Alarm, SoundChoice};
use crate::error::{CoreError, Result};
use crate::notify::{Notifier, Permission};
use crate::storage::config::{Config, Settings, SettingsSource};
use crate::task::{MemoryTaskStore, TaskRecord, TaskStore};

#[derive(Clone, Default)]
pub struct RecordingAlarm {
    pub plays: Arc<Mutex<Vec<(SoundChoice, f64)>>>,
}

impl Alarm for RecordingAlarm {
    fn play(&self, choice: SoundChoice, volume: f64) -> Result<()> {
        self.plays.lock().unwrap().push((choice, volume));
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordingNotifier {
    pub permission: Permission,
    pub shown: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn granted() -> Self {
        Self::with(Permission::Granted)
    }

    pub fn with(permission: Permission) -> Self {
        Self {
            permission,
            shown: Arc::default(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Store whose every call fails.
pub struct BrokenStore;

impl TaskStore for BrokenStore {
    fn create_task(&self, _task: &TaskRecord) -> Result<()> {
        Err(CoreError::Custom("store offline".into()))
    }
    fn get_task(&self, _id: &str) -> Result<Option<TaskRecord>> {
        Err(CoreError::Custom("store offline".into()))
    }
    fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        Err(CoreError::Custom("store offline".into()))
    }
    fn update_task(&self, _task: &TaskRecord) -> Result<()> {
        Err(CoreError::Custom("store offline".into()))
    }
    fn delete_task(&self, _id: &str) -> Result<()> {
        Err(CoreError::Custom("store offline".into()))
    }
    fn clear_completed(&self) -> Result<usize> {
        Err(CoreError::Custom("store offline".into()))
    }
}

pub struct BrokenSettings;

impl SettingsSource for BrokenSettings {
    fn settings(&self) -> Result<Settings> {
        Err(CoreError::Custom("settings unreadable".into()))
    }
}

pub struct Fixture {
    pub tasks: MemoryTaskStore,
    pub alarm: RecordingAlarm,
    pub notifier: RecordingNotifier,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            tasks: MemoryTaskStore::new(),
            alarm: RecordingAlarm::default(),
            notifier: RecordingNotifier::granted(),
        }
    }

    pub fn hooks(&self, config: Config) -> CompletionHooks {
        CompletionHooks::new(
            Arc::new(self.tasks.clone()),
            Arc::new(config),
            Arc::new(self.alarm.clone()),
            Arc::new(self.notifier.clone()),
        )
    }

    pub fn plays(&self) -> usize {
        self.alarm.plays.lock().unwrap().len()
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.notifier.shown.lock().unwrap().clone()
    }
}
