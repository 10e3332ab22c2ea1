mod clock;
mod completion;
mod controller;
mod listeners;
mod poller;
mod slot;
mod state;
#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{
    completion_message, CompletionHooks, CompletionReport, NOTIFICATION_TITLE, PLACEHOLDER_TITLE,
};
pub use controller::{ClaimedCompletion, TimerController};
pub use listeners::{Listener, ListenerId};
pub use poller::run_expiry_loop;
pub use slot::{MemorySlot, StateSlot, TIMER_STATE_KEY};
pub use state::{TimerPhase, TimerState, MAX_DURATION_SECS};
