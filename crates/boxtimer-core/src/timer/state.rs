//! Persisted countdown snapshot.
//!
//! While running, `remaining_secs` is the duration at the moment running
//! last started; the live value is derived from `ends_at_ms`.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Derived state machine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
}

/// The single countdown snapshot shared by every controller instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    #[serde(default)]
    pub active_task_id: Option<String>,
    /// Epoch ms when the current running interval began.
    #[serde(default)]
    pub started_at_ms: Option<i64>,
    #[serde(default)]
    pub remaining_secs: u64,
    #[serde(default)]
    pub is_running: bool,
    /// `started_at_ms + remaining_secs * 1000`, only while running.
    #[serde(default)]
    pub ends_at_ms: Option<i64>,
}

impl TimerState {
    pub fn idle() -> Self {
        Self {
            active_task_id: None,
            started_at_ms: None,
            remaining_secs: 0,
            is_running: false,
            ends_at_ms: None,
        }
    }

    pub fn running(task_id: String, remaining_secs: u64, now_ms: i64) -> Self {
        Self {
            active_task_id: Some(task_id),
            started_at_ms: Some(now_ms),
            remaining_secs,
            is_running: true,
            ends_at_ms: Some(now_ms.saturating_add(secs_to_ms(remaining_secs))),
        }
    }

    pub fn phase(&self) -> TimerPhase {
        match (&self.active_task_id, self.is_running) {
            (None, _) => TimerPhase::Idle,
            (Some(_), true) => TimerPhase::Running,
            (Some(_), false) => TimerPhase::Paused,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active_task_id.is_none()
    }

    /// Whole seconds left at `now_ms`, floored and never negative.
    pub fn remaining_at(&self, now_ms: i64) -> u64 {
        match (self.is_running, self.ends_at_ms) {
            (true, Some(ends_at)) => {
                let left_ms = ends_at.saturating_sub(now_ms).max(0);
                (left_ms / 1000) as u64
            }
            _ => self.remaining_secs,
        }
    }

    /// True only when the snapshot says running and the end is still ahead.
    pub fn is_running_at(&self, now_ms: i64) -> bool {
        self.is_running && self.ends_at_ms.is_some_and(|ends_at| now_ms < ends_at)
    }

    /// True when a running snapshot has reached its end.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.is_running
            && self.active_task_id.is_some()
            && self.ends_at_ms.is_some_and(|ends_at| now_ms >= ends_at)
    }

    /// Repair snapshots that violate the state invariants.
    ///
    /// A snapshot without a task collapses to idle; a running flag without
    /// both timestamps becomes paused at the stored remaining time.
    pub fn normalized(self) -> Self {
        if self.active_task_id.as_deref().map_or(true, str::is_empty) {
            if self != Self::idle() {
                warn!(?self, "timer snapshot without task, treating as idle");
            }
            return Self::idle();
        }
        if self.is_running && (self.ends_at_ms.is_none() || self.started_at_ms.is_none()) {
            warn!(?self, "running timer snapshot missing timestamps, treating as paused");
            return Self {
                is_running: false,
                started_at_ms: None,
                ends_at_ms: None,
                ..self
            };
        }
        if !self.is_running && self.ends_at_ms.is_some() {
            return Self {
                ends_at_ms: None,
                ..self
            };
        }
        self
    }

    /// Decode a persisted snapshot. Missing or corrupt input yields idle.
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::idle();
        };
        match serde_json::from_str::<TimerState>(raw) {
            Ok(state) => state.normalized(),
            Err(e) => {
                warn!("failed to parse timer state, falling back to idle: {e}");
                Self::idle()
            }
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Longest countdown accepted by `start` and `reset`: one hundred years.
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

pub(crate) fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX / 1000).saturating_mul(1000)
}
