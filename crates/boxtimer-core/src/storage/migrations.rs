//! Database schema migrations for boxtimer.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// v1: task records and the key-value table holding the timer slot.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    debug!("applying schema v1");
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                    TEXT PRIMARY KEY,
            title                 TEXT NOT NULL,
            description           TEXT NOT NULL DEFAULT '',
            duration_min          INTEGER NOT NULL,
            actual_duration_secs  INTEGER,
            completed             INTEGER NOT NULL DEFAULT 0,
            created_at            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
        CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks(completed);",
    )?;
    set_schema_version(conn, 1)
}

/// v2: optional scheduled date per task.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    debug!("applying schema v2");
    let has_column = conn
        .prepare("SELECT 1 FROM pragma_table_info('tasks') WHERE name = 'scheduled_date'")?
        .exists([])?;
    if !has_column {
        conn.execute("ALTER TABLE tasks ADD COLUMN scheduled_date TEXT", [])?;
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tasks_scheduled_date ON tasks(scheduled_date);",
    )?;
    set_schema_version(conn, 2)
}
