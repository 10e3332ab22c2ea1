use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerPhase;

/// Every timer state change produces an Event.
/// Listeners receive it; the CLI prints it as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        task_id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        task_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        task_id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        task_id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCleared {
        at: DateTime<Utc>,
    },
    /// Countdown reached zero and this instance ran the completion.
    TimerCompleted {
        task_id: String,
        actual_duration_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    /// Another instance changed the shared timer slot.
    ExternalChange {
        phase: TimerPhase,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        task_id: Option<String>,
        remaining_secs: u64,
        is_running: bool,
        ends_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::TimerReset { .. } => "timer_reset",
            Event::TimerCleared { .. } => "timer_cleared",
            Event::TimerCompleted { .. } => "timer_completed",
            Event::ExternalChange { .. } => "external_change",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
