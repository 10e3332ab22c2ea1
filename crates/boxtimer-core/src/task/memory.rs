use std::sync::{Arc, Mutex, MutexGuard};

use super::record::{TaskRecord, TaskStore};
use crate::error::Result;

/// In-process task store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    tasks: Arc<Mutex<Vec<TaskRecord>>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TaskRecord>> {
        self.tasks.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl TaskStore for MemoryTaskStore {
    fn create_task(&self, task: &TaskRecord) -> Result<()> {
        self.update_task(task)
    }

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>> {
        Ok(self.lock().iter().find(|t| t.id == id).cloned())
    }

    fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let mut tasks = self.lock().clone();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    fn update_task(&self, task: &TaskRecord) -> Result<()> {
        let mut tasks = self.lock();
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => tasks.push(task.clone()),
        }
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.lock().retain(|t| t.id != id);
        Ok(())
    }

    fn clear_completed(&self) -> Result<usize> {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|t| !t.completed);
        Ok(before - tasks.len())
    }
}
