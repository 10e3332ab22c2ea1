pub mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, ConfigStore, Settings, SettingsSource};
pub use database::{Database, DbTaskStore, KvSlot, SharedDatabase};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `BOXTIMER_HOME` wins when set. Otherwise `~/.config/boxtimer`, or
/// `~/.config/boxtimer-dev` with `BOXTIMER_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BOXTIMER_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BOXTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("boxtimer-dev")
            } else {
                base_dir.join("boxtimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
