//! SQLite-based task storage and the shared key-value slot.
//!
//! Provides persistent storage for:
//! - Task records (timeboxes)
//! - Key-value store for application state, including the timer slot
//!
//! Every process opens its own connection to the same file; SQLite's
//! locking makes writes visible across them.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::task::{TaskRecord, TaskStore};
use crate::timer::StateSlot;

const DB_FILE: &str = "boxtimer.db";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(date_str: Option<String>) -> Option<NaiveDate> {
    date_str.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

const TASK_COLUMNS: &str = "id, title, description, duration_min, actual_duration_secs, \
                            completed, created_at, scheduled_date";

fn row_to_task(row: &rusqlite::Row) -> Result<TaskRecord, rusqlite::Error> {
    let created_at: String = row.get(6)?;
    Ok(TaskRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        duration_min: row.get(3)?,
        actual_duration_secs: row.get(4)?,
        completed: row.get(5)?,
        created_at: parse_datetime_fallback(&created_at),
        scheduled_date: parse_date(row.get(7)?),
    })
}

/// SQLite database for tasks and the timer slot.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/boxtimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join(DB_FILE);
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(2))?;
        // WAL lets a watching process read while another writes.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Wrap in the shared handle used by [`DbTaskStore`] and [`KvSlot`].
    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn create_task(&self, task: &TaskRecord) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO tasks (id, title, description, duration_min, actual_duration_secs,
                                completed, created_at, scheduled_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                task.id,
                task.title,
                task.description,
                task.duration_min,
                task.actual_duration_secs,
                task.completed,
                task.created_at.to_rfc3339(),
                task.scheduled_date.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()
    }

    /// All tasks, oldest first.
    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC"))?;
        let rows = stmt.query_map([], row_to_task)?;
        rows.collect()
    }

    /// Tasks scheduled for `date`.
    pub fn list_tasks_scheduled_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<TaskRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE scheduled_date = ?1 ORDER BY created_at ASC"
        ))?;
        let date = date.format(DATE_FORMAT).to_string();
        let rows = stmt.query_map(params![date], row_to_task)?;
        rows.collect()
    }

    /// Tasks created in `[start, end)`.
    pub fn list_tasks_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, rusqlite::Error> {
        // RFC3339 strings in UTC sort chronologically.
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(
            params![start.to_rfc3339(), end.to_rfc3339()],
            row_to_task,
        )?;
        rows.collect()
    }

    /// Insert or replace the whole record.
    pub fn update_task(&self, task: &TaskRecord) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO tasks (id, title, description, duration_min, actual_duration_secs,
                                completed, created_at, scheduled_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                duration_min = excluded.duration_min,
                actual_duration_secs = excluded.actual_duration_secs,
                completed = excluded.completed,
                created_at = excluded.created_at,
                scheduled_date = excluded.scheduled_date",
            params![
                task.id,
                task.title,
                task.description,
                task.duration_min,
                task.actual_duration_secs,
                task.completed,
                task.created_at.to_rfc3339(),
                task.scheduled_date.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn delete_task(&self, id: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn clear_completed_tasks(&self) -> Result<usize, rusqlite::Error> {
        self.conn.execute("DELETE FROM tasks WHERE completed = 1", [])
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Write `value` only if the key currently holds `expected`
    /// (`None` = key absent). Returns whether the write happened.
    pub fn kv_compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, rusqlite::Error> {
        let changed = match expected {
            Some(expected) => self.conn.execute(
                "UPDATE kv SET value = ?2 WHERE key = ?1 AND value = ?3",
                params![key, value, expected],
            )?,
            None => self.conn.execute(
                "INSERT OR IGNORE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?,
        };
        Ok(changed == 1)
    }
}

/// Connection handle shared by the task store and the timer slot.
pub type SharedDatabase = Arc<Mutex<Database>>;

fn lock(db: &SharedDatabase) -> Result<MutexGuard<'_, Database>> {
    db.lock().map_err(|_| DatabaseError::Poisoned.into())
}

/// [`TaskStore`] over the SQLite tasks table.
#[derive(Clone)]
pub struct DbTaskStore {
    db: SharedDatabase,
}

impl DbTaskStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn list_scheduled_on(&self, date: NaiveDate) -> Result<Vec<TaskRecord>> {
        Ok(lock(&self.db)?.list_tasks_scheduled_on(date)?)
    }

    /// Tasks created in `[start, end)`.
    pub fn list_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>> {
        Ok(lock(&self.db)?.list_tasks_created_between(start, end)?)
    }
}

impl TaskStore for DbTaskStore {
    fn create_task(&self, task: &TaskRecord) -> Result<()> {
        Ok(lock(&self.db)?.create_task(task)?)
    }

    fn get_task(&self, id: &str) -> Result<Option<TaskRecord>> {
        Ok(lock(&self.db)?.get_task(id)?)
    }

    fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        Ok(lock(&self.db)?.list_tasks()?)
    }

    fn update_task(&self, task: &TaskRecord) -> Result<()> {
        Ok(lock(&self.db)?.update_task(task)?)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        Ok(lock(&self.db)?.delete_task(id)?)
    }

    fn clear_completed(&self) -> Result<usize> {
        Ok(lock(&self.db)?.clear_completed_tasks()?)
    }
}

/// [`StateSlot`] backed by one row of the kv table.
#[derive(Clone)]
pub struct KvSlot {
    db: SharedDatabase,
    key: String,
}

impl KvSlot {
    pub fn new(db: SharedDatabase, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }
}

impl StateSlot for KvSlot {
    fn load(&self) -> Result<Option<String>> {
        Ok(lock(&self.db)?.kv_get(&self.key)?)
    }

    fn store(&self, value: &str) -> Result<()> {
        Ok(lock(&self.db)?.kv_set(&self.key, value)?)
    }

    fn compare_and_swap(&self, expected: Option<&str>, value: &str) -> Result<bool> {
        Ok(lock(&self.db)?.kv_compare_and_set(&self.key, expected, value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(title: &str, minutes: u32) -> TaskRecord {
        TaskRecord::new(title, minutes).unwrap()
    }

    #[test]
    fn create_and_get_task() {
        let db = Database::open_memory().unwrap();
        let t = task("Write", 25).scheduled_on(NaiveDate::from_ymd_opt(2026, 5, 4).unwrap());
        db.create_task(&t).unwrap();
        let loaded = db.get_task(&t.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Write");
        assert_eq!(loaded.duration_min, 25);
        assert_eq!(loaded.scheduled_date, t.scheduled_date);
        assert_eq!(loaded.created_at.timestamp(), t.created_at.timestamp());
        assert!(db.get_task("missing").unwrap().is_none());
    }

    #[test]
    fn update_is_upsert() {
        let db = Database::open_memory().unwrap();
        let mut t = task("Read", 10);
        db.update_task(&t).unwrap();
        t.actual_duration_secs = Some(480);
        t.completed = true;
        db.update_task(&t).unwrap();
        let loaded = db.get_task(&t.id).unwrap().unwrap();
        assert_eq!(loaded.actual_duration_secs, Some(480));
        assert!(loaded.completed);
        assert_eq!(db.list_tasks().unwrap().len(), 1);
    }

    #[test]
    fn clear_completed_keeps_open_tasks() {
        let db = Database::open_memory().unwrap();
        let mut done = task("done", 5);
        done.completed = true;
        db.create_task(&done).unwrap();
        db.create_task(&task("open", 5)).unwrap();
        assert_eq!(db.clear_completed_tasks().unwrap(), 1);
        let left = db.list_tasks().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].title, "open");
    }

    #[test]
    fn list_by_schedule_and_creation_range() {
        let db = Database::open_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
        let mut a = task("a", 5).scheduled_on(day);
        a.created_at = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let mut b = task("b", 5);
        b.created_at = Utc.with_ymd_and_hms(2026, 5, 2, 9, 0, 0).unwrap();
        db.create_task(&a).unwrap();
        db.create_task(&b).unwrap();

        let scheduled = db.list_tasks_scheduled_on(day).unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].id, a.id);

        let start = Utc.with_ymd_and_hms(2026, 5, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 5, 3, 0, 0, 0).unwrap();
        let created = db.list_tasks_created_between(start, end).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, b.id);
    }

    #[test]
    fn store_lists_by_creation_range() {
        let store = DbTaskStore::new(Database::open_memory().unwrap().into_shared());
        let mut early = task("early", 5);
        early.created_at = Utc.with_ymd_and_hms(2026, 5, 1, 23, 59, 59).unwrap();
        let mut inside = task("inside", 5);
        inside.created_at = Utc.with_ymd_and_hms(2026, 5, 2, 12, 0, 0).unwrap();
        let mut edge = task("edge", 5);
        edge.created_at = Utc.with_ymd_and_hms(2026, 5, 3, 0, 0, 0).unwrap();
        for t in [&early, &inside, &edge] {
            store.create_task(t).unwrap();
        }

        let start = Utc.with_ymd_and_hms(2026, 5, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 5, 3, 0, 0, 0).unwrap();
        let found = store.list_created_between(start, end).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, inside.id);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn kv_compare_and_set() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_compare_and_set("k", None, "v1").unwrap());
        assert!(!db.kv_compare_and_set("k", None, "v2").unwrap());
        assert!(!db.kv_compare_and_set("k", Some("nope"), "v2").unwrap());
        assert!(db.kv_compare_and_set("k", Some("v1"), "v2").unwrap());
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn shared_handles_see_same_rows() {
        let shared = Database::open_memory().unwrap().into_shared();
        let store = DbTaskStore::new(Arc::clone(&shared));
        let slot = KvSlot::new(Arc::clone(&shared), "slot");
        let t = task("shared", 5);
        store.create_task(&t).unwrap();
        slot.store("x").unwrap();
        let db = shared.lock().unwrap();
        assert!(db.get_task(&t.id).unwrap().is_some());
        assert_eq!(db.kv_get("slot").unwrap().as_deref(), Some("x"));
    }
}
