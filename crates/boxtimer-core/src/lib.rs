//! # BoxTimer Core Library
//!
//! Core logic for BoxTimer, a timeboxing countdown. The `boxtimer` CLI is a
//! thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a wall-clock countdown persisted in one shared slot, so
//!   every process that opens the same data directory sees the same timer.
//!   The caller drives expiry with [`timer::run_expiry_loop`] or
//!   [`TimerController::poll_once`].
//! - **Storage**: SQLite for tasks and the timer slot, TOML for settings.
//! - **Completion**: record write-back, alarm and desktop notification,
//!   claimed by exactly one instance.
//! - **Stats**: per-day review totals.
//!
//! ## Key Components
//!
//! - [`TimerController`]: the countdown state machine
//! - [`Database`]: task and key-value persistence
//! - [`Config`]: application configuration management
//! - [`CompletionHooks`]: side effects of a finished countdown

pub mod alarm;
pub mod error;
pub mod events;
pub mod notify;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use alarm::{Alarm, SoundChoice, SystemAlarm};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use notify::{DesktopNotifier, Notifier, Permission};
pub use stats::{daily_stats, DailyStats};
pub use storage::{Config, ConfigStore, Database, DbTaskStore, KvSlot, Settings, SharedDatabase};
pub use task::{TaskRecord, TaskStore};
pub use timer::{
    CompletionHooks, StateSlot, SystemClock, TimerController, TimerPhase, TimerState,
    TIMER_STATE_KEY,
};
