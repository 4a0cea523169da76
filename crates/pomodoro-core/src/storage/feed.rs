//! Shared session store with change feeds.
//!
//! [`SessionStore`] puts a [`Database`] behind a mutex so the session writer
//! and readers can share it, and bumps a revision counter on every insert or
//! delete. A [`Feed`] re-runs its query whenever the revision moves.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use chrono::NaiveDate;
use tokio::sync::watch;

use super::database::{Database, NewSession, SessionQuery, SessionRecord};
use crate::error::{DatabaseError, Result};
use crate::timer::SessionSink;

type Query<T> = Box<dyn Fn(&Database) -> Result<T, DatabaseError> + Send + Sync>;

#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Mutex<Database>>,
    revision: Arc<watch::Sender<u64>>,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            db: Arc::new(Mutex::new(db)),
            revision: Arc::new(tx),
        }
    }

    /// Open the store over the default database file.
    pub fn open() -> Result<Self> {
        Ok(Self::new(Database::open()?))
    }

    /// Run `f` against the database while holding the lock.
    pub fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T, DatabaseError>,
    {
        let db = self.db.lock().map_err(DatabaseError::from)?;
        Ok(f(&*db)?)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    pub fn insert(&self, session: &NewSession) -> Result<i64> {
        let id = self.with_db(|db| db.insert_session(session))?;
        self.bump();
        Ok(id)
    }

    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = self.with_db(|db| db.delete_session(id))?;
        if removed {
            self.bump();
        }
        Ok(removed)
    }

    pub fn get(&self, id: i64) -> Result<Option<SessionRecord>> {
        self.with_db(|db| db.get_session(id))
    }

    pub fn sessions(&self, query: &SessionQuery) -> Result<Vec<SessionRecord>> {
        self.with_db(|db| db.sessions(query))
    }

    pub fn daily_completed_work(&self) -> Result<BTreeMap<NaiveDate, u32>> {
        self.with_db(|db| db.daily_completed_work())
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        self.with_db(|db| db.kv_get(key))
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.with_db(|db| db.kv_set(key, value))
    }

    /// Sessions matching `query`, refreshed on every change.
    pub fn watch_sessions(&self, query: SessionQuery) -> Feed<Vec<SessionRecord>> {
        self.feed(Box::new(move |db: &Database| db.sessions(&query)))
    }

    /// Completed work sessions per date, refreshed on every change.
    pub fn watch_daily_completed_work(&self) -> Feed<BTreeMap<NaiveDate, u32>> {
        self.feed(Box::new(|db: &Database| db.daily_completed_work()))
    }

    fn feed<T>(&self, query: Query<T>) -> Feed<T> {
        Feed {
            db: Arc::downgrade(&self.db),
            rx: self.revision.subscribe(),
            query,
        }
    }
}

impl SessionSink for SessionStore {
    fn record(&mut self, session: &NewSession) -> Result<i64> {
        self.insert(session)
    }
}

/// A query result that follows the store.
///
/// Holds only a weak reference: once every [`SessionStore`] handle is gone,
/// [`Feed::changed`] returns `None`.
pub struct Feed<T> {
    db: Weak<Mutex<Database>>,
    rx: watch::Receiver<u64>,
    query: Query<T>,
}

impl<T> Feed<T> {
    /// Run the query now and mark the current revision as seen.
    pub fn current(&mut self) -> Result<T> {
        self.rx.borrow_and_update();
        let db = self.db.upgrade().ok_or(DatabaseError::Closed)?;
        let guard = db.lock().map_err(DatabaseError::from)?;
        Ok((self.query)(&*guard)?)
    }

    /// Wait for the next insert or delete, then return the fresh result.
    pub async fn changed(&mut self) -> Option<Result<T>> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::PeriodType;
    use chrono::Utc;

    fn work(completed: bool) -> NewSession {
        let now = Utc::now();
        NewSession {
            started_at: now - chrono::Duration::minutes(25),
            ended_at: now,
            date: now.date_naive(),
            duration_min: 25,
            period_type: PeriodType::Work,
            completed,
        }
    }

    #[tokio::test]
    async fn feed_refreshes_on_insert_and_delete() {
        let store = SessionStore::new(Database::open_memory().unwrap());
        let mut feed = store.watch_sessions(SessionQuery::Type(PeriodType::Work));
        assert!(feed.current().unwrap().is_empty());

        let id = store.insert(&work(true)).unwrap();
        let sessions = feed.changed().await.unwrap().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);

        store.delete(id).unwrap();
        assert!(feed.changed().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn daily_feed_counts_completed_work() {
        let store = SessionStore::new(Database::open_memory().unwrap());
        let mut daily = store.watch_daily_completed_work();
        store.insert(&work(true)).unwrap();
        store.insert(&work(false)).unwrap();
        let counts = daily.changed().await.unwrap().unwrap();
        assert_eq!(counts.values().copied().sum::<u32>(), 1);
    }

    #[tokio::test]
    async fn feed_ends_when_store_dropped() {
        let store = SessionStore::new(Database::open_memory().unwrap());
        let mut feed = store.watch_sessions(SessionQuery::All);
        drop(store);
        assert!(feed.changed().await.is_none());
        assert!(feed.current().is_err());
    }

    #[test]
    fn deleting_missing_row_does_not_notify() {
        let store = SessionStore::new(Database::open_memory().unwrap());
        let mut feed = store.watch_sessions(SessionQuery::All);
        feed.current().unwrap();
        assert!(!store.delete(42).unwrap());
        assert!(!feed.rx.has_changed().unwrap());
    }
}
