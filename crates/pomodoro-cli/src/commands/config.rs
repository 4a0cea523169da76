use clap::Subcommand;
use pomodoro_core::{ConfigError, SettingsStore};

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "timer.work_minutes")
        key: String,
    },
    /// Set a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List {
        /// Print one `key = value` line per setting instead of JSON
        #[arg(long)]
        flat: bool,
    },
    /// Reset config to defaults
    Reset,
    /// Print the settings file location
    Path,
}

pub fn run(action: ConfigAction) -> CliResult {
    let store = SettingsStore::open()?;

    match action {
        ConfigAction::Get { key } => {
            let value = store.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let settings = store.set(&key, &value)?;
            let stored = settings.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List { flat: false } => {
            let settings = store.current();
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::List { flat: true } => {
            let settings = store.current();
            for key in settings.keys() {
                let value = settings.get(&key).unwrap_or_default();
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            store.reset()?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}
