//! Subscription list for timer change callbacks.

use std::sync::{Arc, Mutex};

use crate::events::Event;

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by `add_listener`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    inner: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Listener) -> ListenerId {
        let mut reg = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let id = ListenerId(reg.next_id);
        reg.next_id += 1;
        reg.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut reg = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let before = reg.entries.len();
        reg.entries.retain(|(entry_id, _)| *entry_id != id);
        reg.entries.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|reg| reg.entries.len())
            .unwrap_or_default()
    }

    /// Invoke every listener registered at call time.
    ///
    /// Callbacks run on a snapshot with the lock released, so they may
    /// subscribe or unsubscribe freely.
    pub(crate) fn notify(&self, event: &Event) {
        let snapshot: Vec<Listener> = {
            let reg = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            reg.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            listener(event);
        }
    }
}
