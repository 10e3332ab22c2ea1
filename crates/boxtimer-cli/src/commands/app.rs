use std::sync::Arc;

use boxtimer_core::storage::{ConfigStore, Database, DbTaskStore, KvSlot};
use boxtimer_core::timer::{CompletionHooks, SystemClock, TimerController, TIMER_STATE_KEY};
use boxtimer_core::{Config, DesktopNotifier, SystemAlarm};

use super::CliResult;

/// Everything a command needs, wired once per invocation.
///
/// This is the only place a [`TimerController`] is built; commands borrow it.
pub struct App {
    pub tasks: Arc<DbTaskStore>,
    pub timer: Arc<TimerController>,
    pub hooks: Arc<CompletionHooks>,
    /// Shared with `hooks`; wait on it before exiting after a completion.
    pub alarm: SystemAlarm,
    pub config: Config,
}

impl App {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let db = Database::open()?.into_shared();
        let tasks = Arc::new(DbTaskStore::new(Arc::clone(&db)));
        let slot = Arc::new(KvSlot::new(Arc::clone(&db), TIMER_STATE_KEY));
        let timer = Arc::new(TimerController::new(slot, Arc::new(SystemClock)));
        let alarm = SystemAlarm::new();
        let hooks = Arc::new(CompletionHooks::new(
            tasks.clone(),
            Arc::new(ConfigStore::default_location()?),
            Arc::new(alarm.clone()),
            Arc::new(DesktopNotifier::detect()),
        ));
        Ok(Self {
            tasks,
            timer,
            hooks,
            alarm,
            config,
        })
    }
}
