pub mod database;
mod feed;
mod settings;
mod settings_store;

pub use database::{Database, NewSession, SessionQuery, SessionRecord};
pub use feed::{Feed, SessionStore};
pub use settings::{
    AppearanceSettings, AutomationSettings, Language, NotificationSettings, Settings,
    TimerSettings,
};
pub use settings_store::SettingsStore;

use std::path::PathBuf;

use crate::error::Result;

/// Returns the data directory, creating it if needed.
///
/// `POMODORO_DATA_DIR` overrides the location outright. Otherwise this is
/// `~/.config/pomodoro/`, or `~/.config/pomodoro-dev/` when
/// `POMODORO_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("POMODORO_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("POMODORO_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("pomodoro-dev")
            } else {
                base_dir.join("pomodoro")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
