//! The one durable slot every controller instance reads and writes.

use std::sync::{Arc, Mutex};

use crate::error::{CoreError, Result};

/// Name of the persisted timer slot.
pub const TIMER_STATE_KEY: &str = "box_timer_state";

/// Shared raw storage for the serialized [`TimerState`](super::TimerState).
///
/// Implementations must make writes visible to every other instance
/// reading the same slot.
pub trait StateSlot: Send + Sync {
    fn load(&self) -> Result<Option<String>>;

    fn store(&self, value: &str) -> Result<()>;

    /// Replace the slot content only if it still equals `expected`.
    ///
    /// Returns `false` when another writer got there first.
    fn compare_and_swap(&self, expected: Option<&str>, value: &str) -> Result<bool>;
}

/// In-memory slot. Clones share storage, standing in for one origin
/// shared by several processes.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    value: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.value
            .lock()
            .map_err(|_| CoreError::Custom("memory slot poisoned".into()))
    }
}

impl StateSlot for MemorySlot {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn store(&self, value: &str) -> Result<()> {
        *self.lock()? = Some(value.to_string());
        Ok(())
    }

    fn compare_and_swap(&self, expected: Option<&str>, value: &str) -> Result<bool> {
        let mut current = self.lock()?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        *current = Some(value.to_string());
        Ok(true)
    }
}
