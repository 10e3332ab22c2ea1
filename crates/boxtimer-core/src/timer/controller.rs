//! Countdown controller.
//!
//! A wall-clock state machine over one shared [`StateSlot`]. Every command
//! re-reads the slot, applies its transition and writes the new snapshot
//! back, so any number of controller instances (one per process) stay
//! consistent. Remaining time is never counted down in memory; it is always
//! derived from the persisted end timestamp.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -start-> Running -pause-> Paused -resume-> Running
//!  ^              |  ^              |
//!  |              |  +----reset-----+  (reset stops and rewinds)
//!  +--clear/complete--------------------+
//! ```
//!
//! Commands return `Ok(None)` when their precondition does not hold; these
//! are expected races between a UI and the shared state, not errors.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::completion::{CompletionHooks, CompletionReport};
use super::listeners::{Listener, ListenerId, ListenerRegistry};
use super::slot::StateSlot;
use super::state::{TimerPhase, TimerState, MAX_DURATION_SECS};
use crate::error::{Result, ValidationError};
use crate::events::Event;

/// The single countdown controller.
///
/// Construct one per process in the composition root and share it by
/// `Arc`; other processes coordinate through the slot.
pub struct TimerController {
    slot: Arc<dyn StateSlot>,
    clock: Arc<dyn Clock>,
    listeners: ListenerRegistry,
    /// Raw slot value this instance last read or wrote.
    last_seen: Mutex<Option<String>>,
}

/// A completion this instance won the right to run.
#[derive(Debug, Clone)]
pub struct ClaimedCompletion {
    pub task_id: String,
    /// Remaining seconds at the moment of the claim, normally zero.
    pub remaining_secs: u64,
}

impl TimerController {
    pub fn new(slot: Arc<dyn StateSlot>, clock: Arc<dyn Clock>) -> Self {
        let last_seen = slot.load().unwrap_or_else(|e| {
            warn!("failed to read timer slot at startup: {e}");
            None
        });
        Self {
            slot,
            clock,
            listeners: ListenerRegistry::default(),
            last_seen: Mutex::new(last_seen),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Current persisted snapshot. Read failures fall back to idle.
    pub fn state(&self) -> TimerState {
        match self.slot.load() {
            Ok(raw) => TimerState::decode(raw.as_deref()),
            Err(e) => {
                warn!("failed to read timer slot, treating as idle: {e}");
                TimerState::idle()
            }
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.state().phase()
    }

    pub fn active_task_id(&self) -> Option<String> {
        self.state().active_task_id
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.state().remaining_at(self.now_ms())
    }

    /// Running according to the snapshot *and* the end is still ahead.
    pub fn is_active_running(&self) -> bool {
        self.state().is_running_at(self.now_ms())
    }

    pub fn snapshot(&self) -> Event {
        let state = self.state();
        let now = self.now_ms();
        Event::StateSnapshot {
            phase: state.phase(),
            task_id: state.active_task_id.clone(),
            remaining_secs: state.remaining_at(now),
            is_running: state.is_running_at(now),
            ends_at: state.ends_at_ms.and_then(DateTime::from_timestamp_millis),
            at: self.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting down `duration_secs` for `task_id`.
    ///
    /// Overwrites whatever timer was active; the last caller wins.
    pub fn start(&self, task_id: &str, duration_secs: u64) -> Result<Option<Event>> {
        if task_id.trim().is_empty() {
            return Err(ValidationError::Empty("task id").into());
        }
        if duration_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_secs".into(),
                message: "must be positive".into(),
            }
            .into());
        }
        check_max_duration(duration_secs)?;
        let previous = self.state();
        if let Some(prev) = previous.active_task_id.as_deref() {
            debug!(previous = prev, next = task_id, "start replaces active timer");
        }
        let state = TimerState::running(task_id.to_string(), duration_secs, self.now_ms());
        let event = Event::TimerStarted {
            task_id: task_id.to_string(),
            duration_secs,
            at: self.now(),
        };
        self.commit(&state, event).map(Some)
    }

    pub fn pause(&self) -> Result<Option<Event>> {
        let state = self.state();
        let (Some(task_id), true, Some(_)) =
            (state.active_task_id.clone(), state.is_running, state.ends_at_ms)
        else {
            return Ok(None);
        };
        let remaining = state.remaining_at(self.now_ms());
        let paused = TimerState {
            active_task_id: Some(task_id.clone()),
            started_at_ms: None,
            remaining_secs: remaining,
            is_running: false,
            ends_at_ms: None,
        };
        let event = Event::TimerPaused {
            task_id,
            remaining_secs: remaining,
            at: self.now(),
        };
        self.commit(&paused, event).map(Some)
    }

    pub fn resume(&self) -> Result<Option<Event>> {
        let state = self.state();
        if state.phase() != TimerPhase::Paused || state.remaining_secs == 0 {
            return Ok(None);
        }
        let Some(task_id) = state.active_task_id else {
            return Ok(None);
        };
        let remaining = state.remaining_secs;
        let resumed = TimerState::running(task_id.clone(), remaining, self.now_ms());
        let event = Event::TimerResumed {
            task_id,
            remaining_secs: remaining,
            at: self.now(),
        };
        self.commit(&resumed, event).map(Some)
    }

    /// Stop and rewind the active timer to `duration_secs`. Does not resume.
    pub fn reset(&self, duration_secs: u64) -> Result<Option<Event>> {
        check_max_duration(duration_secs)?;
        let Some(task_id) = self.state().active_task_id else {
            return Ok(None);
        };
        let rewound = TimerState {
            active_task_id: Some(task_id.clone()),
            started_at_ms: None,
            remaining_secs: duration_secs,
            is_running: false,
            ends_at_ms: None,
        };
        let event = Event::TimerReset {
            task_id,
            duration_secs,
            at: self.now(),
        };
        self.commit(&rewound, event).map(Some)
    }

    pub fn clear(&self) -> Result<Option<Event>> {
        let event = Event::TimerCleared { at: self.now() };
        self.commit(&TimerState::idle(), event).map(Some)
    }

    /// Run the completion sequence for the active timer.
    ///
    /// Safe to call from several instances at once: only the instance
    /// whose claim succeeds runs side effects, the others get `Ok(None)`.
    pub fn complete(&self, hooks: &CompletionHooks) -> Result<Option<Event>> {
        match self.claim(false)? {
            Some(claimed) => Ok(Some(self.finish_completion(&claimed, hooks))),
            None => Ok(None),
        }
    }

    /// One expiry check: observe external changes, then complete if the
    /// countdown has reached zero.
    pub fn poll_once(&self, hooks: &CompletionHooks) -> Result<Option<Event>> {
        self.sync()?;
        match self.claim_expired()? {
            Some(claimed) => Ok(Some(self.finish_completion(&claimed, hooks))),
            None => Ok(None),
        }
    }

    // ── Cross-instance plumbing ──────────────────────────────────────

    /// Compare the slot with what this instance last saw and tell
    /// listeners if another instance changed it.
    pub fn sync(&self) -> Result<Option<Event>> {
        let raw = self.slot.load()?;
        {
            let mut last = self.lock_last_seen();
            if *last == raw {
                return Ok(None);
            }
            *last = raw.clone();
        }
        let phase = TimerState::decode(raw.as_deref()).phase();
        debug!(?phase, "timer slot changed externally");
        let event = Event::ExternalChange {
            phase,
            at: self.now(),
        };
        self.listeners.notify(&event);
        Ok(Some(event))
    }

    /// Claim the completion of an expired countdown, if there is one.
    pub fn claim_expired(&self) -> Result<Option<ClaimedCompletion>> {
        self.claim(true)
    }

    /// Run write-back and alerts for a claimed completion and tell
    /// listeners. Never fails; each side effect degrades on its own.
    pub fn finish_completion(
        &self,
        claimed: &ClaimedCompletion,
        hooks: &CompletionHooks,
    ) -> Event {
        let report: CompletionReport = hooks.run(&claimed.task_id, claimed.remaining_secs);
        info!(
            task_id = %claimed.task_id,
            actual_duration_secs = ?report.actual_duration_secs,
            sound = report.sound_played,
            notified = report.notified,
            "timebox completed"
        );
        let event = Event::TimerCompleted {
            task_id: claimed.task_id.clone(),
            actual_duration_secs: report.actual_duration_secs,
            at: self.now(),
        };
        self.listeners.notify(&event);
        event
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Atomically swap the observed active snapshot for idle.
    ///
    /// The swap is the idle transition itself, so a failing side effect
    /// afterwards can never leave the timer stuck active.
    fn claim(&self, require_expired: bool) -> Result<Option<ClaimedCompletion>> {
        let raw = self.slot.load()?;
        let state = TimerState::decode(raw.as_deref());
        let now = self.now_ms();
        let Some(task_id) = state.active_task_id.clone() else {
            return Ok(None);
        };
        if require_expired && !state.is_expired_at(now) {
            return Ok(None);
        }
        let idle = TimerState::idle().encode()?;
        if !self.slot.compare_and_swap(raw.as_deref(), &idle)? {
            debug!(%task_id, "completion already claimed by another instance");
            return Ok(None);
        }
        *self.lock_last_seen() = Some(idle);
        Ok(Some(ClaimedCompletion {
            task_id,
            remaining_secs: state.remaining_at(now),
        }))
    }

    fn commit(&self, state: &TimerState, event: Event) -> Result<Event> {
        let raw = state.encode()?;
        self.slot.store(&raw)?;
        *self.lock_last_seen() = Some(raw);
        debug!(event = event.name(), phase = ?state.phase(), "timer state saved");
        self.listeners.notify(&event);
        Ok(event)
    }

    fn lock_last_seen(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_seen.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_ms()).unwrap_or_else(Utc::now)
    }
}

fn check_max_duration(duration_secs: u64) -> Result<()> {
    if duration_secs > MAX_DURATION_SECS {
        return Err(ValidationError::InvalidValue {
            field: "duration_secs".into(),
            message: format!("must be at most {MAX_DURATION_SECS}"),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::clock::ManualClock;
    use crate::timer::slot::MemorySlot;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn controller() -> (TimerController, ManualClock) {
        let clock = ManualClock::default();
        let ctl = TimerController::new(Arc::new(MemorySlot::new()), Arc::new(clock.clone()));
        (ctl, clock)
    }

    #[test]
    fn start_pause_resume() {
        let (ctl, clock) = controller();
        assert_eq!(ctl.phase(), TimerPhase::Idle);

        assert!(ctl.start("t1", 600).unwrap().is_some());
        assert_eq!(ctl.phase(), TimerPhase::Running);
        assert_eq!(ctl.remaining_seconds(), 600);

        clock.advance_secs(100);
        assert!(ctl.pause().unwrap().is_some());
        assert_eq!(ctl.phase(), TimerPhase::Paused);
        assert_eq!(ctl.remaining_seconds(), 500);

        clock.advance_secs(1_000);
        assert_eq!(ctl.remaining_seconds(), 500);

        assert!(ctl.resume().unwrap().is_some());
        assert_eq!(ctl.phase(), TimerPhase::Running);
        assert_eq!(ctl.remaining_seconds(), 500);
        assert!(ctl.is_active_running());
    }

    #[test]
    fn start_rejects_empty_task_and_zero_duration() {
        let (ctl, _) = controller();
        assert!(ctl.start("", 10).is_err());
        assert!(ctl.start("  ", 10).is_err());
        assert!(ctl.start("t1", 0).is_err());
        assert_eq!(ctl.phase(), TimerPhase::Idle);
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let (ctl, _) = controller();
        assert!(ctl.start("t1", u64::MAX).is_err());
        assert!(ctl.start("t1", 9_300_000_000_000_000).is_err());
        assert_eq!(ctl.phase(), TimerPhase::Idle);

        ctl.start("t1", MAX_DURATION_SECS).unwrap();
        assert_eq!(ctl.remaining_seconds(), MAX_DURATION_SECS);
        assert!(ctl.is_active_running());

        assert!(ctl.reset(u64::MAX).is_err());
        assert_eq!(ctl.remaining_seconds(), MAX_DURATION_SECS);
    }

    #[test]
    fn start_overwrites_active_timer() {
        let (ctl, _) = controller();
        ctl.start("t1", 60).unwrap();
        ctl.start("t2", 30).unwrap();
        assert_eq!(ctl.active_task_id().as_deref(), Some("t2"));
        assert_eq!(ctl.remaining_seconds(), 30);
    }

    #[test]
    fn commands_without_precondition_are_silent() {
        let (ctl, _) = controller();
        assert!(ctl.pause().unwrap().is_none());
        assert!(ctl.resume().unwrap().is_none());
        assert!(ctl.reset(60).unwrap().is_none());

        ctl.start("t1", 60).unwrap();
        assert!(ctl.resume().unwrap().is_none());
        ctl.pause().unwrap();
        assert!(ctl.pause().unwrap().is_none());
    }

    #[test]
    fn resume_requires_remaining_time() {
        let (ctl, clock) = controller();
        ctl.start("t1", 5).unwrap();
        clock.advance_secs(10);
        ctl.pause().unwrap();
        assert_eq!(ctl.remaining_seconds(), 0);
        assert!(ctl.resume().unwrap().is_none());
    }

    #[test]
    fn reset_stops_and_rewinds() {
        let (ctl, clock) = controller();
        ctl.start("t1", 300).unwrap();
        clock.advance_secs(200);
        ctl.reset(300).unwrap();
        assert_eq!(ctl.remaining_seconds(), 300);
        assert!(!ctl.is_active_running());
        assert_eq!(ctl.phase(), TimerPhase::Paused);
    }

    #[test]
    fn clear_returns_to_idle() {
        let (ctl, _) = controller();
        ctl.start("t1", 300).unwrap();
        ctl.clear().unwrap();
        assert_eq!(ctl.state(), TimerState::idle());
        assert_eq!(ctl.remaining_seconds(), 0);
        assert!(ctl.active_task_id().is_none());
    }

    #[test]
    fn expired_flag_is_not_active_running() {
        let (ctl, clock) = controller();
        ctl.start("t1", 10).unwrap();
        clock.advance_secs(10);
        assert!(ctl.state().is_running);
        assert!(!ctl.is_active_running());
        assert_eq!(ctl.remaining_seconds(), 0);
    }

    #[test]
    fn listeners_see_every_mutation() {
        let (ctl, _) = controller();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let id = ctl.add_listener(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        ctl.start("t1", 60).unwrap();
        ctl.pause().unwrap();
        ctl.pause().unwrap(); // no-op, no notification
        ctl.clear().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(ctl.remove_listener(id));
        ctl.start("t1", 60).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn sync_reports_changes_from_other_instances() {
        let slot = MemorySlot::new();
        let clock = ManualClock::default();
        let a = TimerController::new(Arc::new(slot.clone()), Arc::new(clock.clone()));
        let b = TimerController::new(Arc::new(slot), Arc::new(clock));

        assert!(b.sync().unwrap().is_none());
        a.start("t1", 60).unwrap();
        assert!(a.sync().unwrap().is_none(), "own writes are not external");
        match b.sync().unwrap() {
            Some(Event::ExternalChange { phase, .. }) => assert_eq!(phase, TimerPhase::Running),
            other => panic!("expected external change, got {other:?}"),
        }
        assert!(b.sync().unwrap().is_none());
        assert_eq!(b.remaining_seconds(), 60);
    }

    #[test]
    fn corrupt_slot_reads_as_idle() {
        let slot = MemorySlot::new();
        slot.store("garbage").unwrap();
        let ctl = TimerController::new(Arc::new(slot), Arc::new(ManualClock::default()));
        assert_eq!(ctl.phase(), TimerPhase::Idle);
        assert_eq!(ctl.remaining_seconds(), 0);
        ctl.start("t1", 10).unwrap();
        assert_eq!(ctl.phase(), TimerPhase::Running);
    }

    #[test]
    fn claim_expired_waits_for_end() {
        let (ctl, clock) = controller();
        ctl.start("t1", 10).unwrap();
        clock.advance_ms(9_999);
        assert!(ctl.claim_expired().unwrap().is_none());
        clock.advance_ms(1);
        let claimed = ctl.claim_expired().unwrap().expect("claim");
        assert_eq!(claimed.task_id, "t1");
        assert_eq!(claimed.remaining_secs, 0);
        assert_eq!(ctl.phase(), TimerPhase::Idle);
        assert!(ctl.claim_expired().unwrap().is_none());
    }

    #[test]
    fn paused_timer_never_expires() {
        let (ctl, clock) = controller();
        ctl.start("t1", 10).unwrap();
        ctl.pause().unwrap();
        clock.advance_secs(60);
        assert!(ctl.claim_expired().unwrap().is_none());
        assert_eq!(ctl.phase(), TimerPhase::Paused);
    }
}
