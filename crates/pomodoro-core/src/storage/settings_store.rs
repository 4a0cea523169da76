//! Observable settings store.
//!
//! Wraps [`Settings`] with a `watch` channel so the timer runtime picks up
//! changes as they are made. Every update validates first, writes the whole
//! file, then broadcasts; a rejected update changes neither.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::settings::{
    AppearanceSettings, AutomationSettings, NotificationSettings, Settings, TimerSettings,
};
use crate::error::Result;

#[derive(Clone)]
pub struct SettingsStore {
    path: Arc<PathBuf>,
    tx: Arc<watch::Sender<Settings>>,
    // Serializes read-modify-write cycles.
    write_lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    /// Open the store at the default location.
    pub fn open() -> Result<Self> {
        Self::load(&Settings::default_path()?)
    }

    /// Open the store backed by `path`, creating it with defaults if needed.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = Settings::load_from(path)?;
        let (tx, _rx) = watch::channel(settings);
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            tx: Arc::new(tx),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Apply `f` to a copy of the current settings and store the result.
    pub fn update<F>(&self, f: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = self.current();
        f(&mut next);
        self.commit(next)
    }

    /// Validate, persist and broadcast `next` as the new settings.
    pub fn replace(&self, next: Settings) -> Result<Settings> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.commit(next)
    }

    fn commit(&self, next: Settings) -> Result<Settings> {
        next.validate()?;
        next.save_to(&self.path)?;
        self.tx.send_replace(next.clone());
        tracing::debug!(path = %self.path.display(), "settings updated");
        Ok(next)
    }

    pub fn update_timer(&self, timer: TimerSettings) -> Result<Settings> {
        self.update(|s| s.timer = timer)
    }

    pub fn update_automation(&self, automation: AutomationSettings) -> Result<Settings> {
        self.update(|s| s.automation = automation)
    }

    pub fn update_notifications(&self, notifications: NotificationSettings) -> Result<Settings> {
        self.update(|s| s.notifications = notifications)
    }

    pub fn update_appearance(&self, appearance: AppearanceSettings) -> Result<Settings> {
        self.update(|s| s.appearance = appearance)
    }

    /// Set one value by dot-separated key, e.g. `timer.work_minutes`.
    pub fn set(&self, key: &str, value: &str) -> Result<Settings> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let next = self.current().with_value(key, value)?;
        self.commit(next)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.tx.borrow().get(key)
    }

    /// Restore defaults.
    pub fn reset(&self) -> Result<Settings> {
        self.replace(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(&dir.path().join("settings.toml")).unwrap();
        (dir, store)
    }

    #[test]
    fn set_persists_and_broadcasts() {
        let (_dir, store) = store();
        let mut rx = store.subscribe();
        store.set("timer.work_minutes", "40").unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().timer.work_minutes, 40);

        let reloaded = Settings::load_from(store.path()).unwrap();
        assert_eq!(reloaded.timer.work_minutes, 40);
    }

    #[test]
    fn rejected_update_changes_nothing() {
        let (_dir, store) = store();
        let rx = store.subscribe();
        let bad = TimerSettings {
            work_minutes: 0,
            ..TimerSettings::default()
        };
        assert!(store.update_timer(bad).is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.current().timer.work_minutes, 25);
        assert_eq!(
            Settings::load_from(store.path()).unwrap().timer.work_minutes,
            25
        );
    }

    #[test]
    fn group_updates_replace_whole_group() {
        let (_dir, store) = store();
        store
            .update_automation(AutomationSettings {
                auto_start_breaks: true,
                auto_start_pomodoros: true,
            })
            .unwrap();
        store
            .update_notifications(NotificationSettings {
                sound_enabled: false,
                vibration_enabled: false,
                custom_sound: None,
            })
            .unwrap();
        let current = store.current();
        assert!(current.automation.auto_start_breaks);
        assert!(current.automation.auto_start_pomodoros);
        assert!(!current.notifications.sound_enabled);
        assert_eq!(current.timer, TimerSettings::default());
    }

    #[test]
    fn reset_restores_defaults() {
        let (_dir, store) = store();
        store.set("appearance.dark_theme", "true").unwrap();
        store.reset().unwrap();
        assert_eq!(store.current(), Settings::default());
    }
}
