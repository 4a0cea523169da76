//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Session records (completed and interrupted periods)
//! - Daily completed-work aggregates
//! - Key-value store for application state

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::timer::{PeriodType, SessionSink};

/// A stored session. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Calendar date the session is filed under.
    pub date: NaiveDate,
    pub duration_min: u32,
    pub period_type: PeriodType,
    pub completed: bool,
}

/// A session about to be written; the database assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub date: NaiveDate,
    pub duration_min: u32,
    pub period_type: PeriodType,
    pub completed: bool,
}

impl NewSession {
    pub fn with_id(self, id: i64) -> SessionRecord {
        SessionRecord {
            id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            date: self.date,
            duration_min: self.duration_min,
            period_type: self.period_type,
            completed: self.completed,
        }
    }
}

/// Which sessions a query returns. Results are always newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionQuery {
    All,
    Date(NaiveDate),
    /// Inclusive on both ends.
    DateRange(NaiveDate, NaiveDate),
    Type(PeriodType),
}

impl SessionQuery {
    pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(SessionQuery::DateRange(start, end))
    }
}

const SESSION_COLUMNS: &str =
    "id, started_at, ended_at, date, duration_min, period_type, completed";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/pomodoro.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("pomodoro.db"))
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    started_at   TEXT NOT NULL,
                    ended_at     TEXT NOT NULL,
                    date         TEXT NOT NULL,
                    duration_min INTEGER NOT NULL,
                    period_type  TEXT NOT NULL,
                    completed    INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date, started_at);
                CREATE INDEX IF NOT EXISTS idx_sessions_period_type ON sessions(period_type);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Insert a session and return its generated id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_session(&self, session: &NewSession) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (started_at, ended_at, date, duration_min, period_type, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.started_at.to_rfc3339(),
                session.ended_at.to_rfc3339(),
                session.date.format(DATE_FORMAT).to_string(),
                session.duration_min,
                session.period_type.as_str(),
                session.completed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Delete a session. Returns whether a row was removed.
    pub fn delete_session(&self, id: i64) -> Result<bool, DatabaseError> {
        let n = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    pub fn get_session(&self, id: i64) -> Result<Option<SessionRecord>, DatabaseError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], raw_session)
            .optional()?;
        row.map(RawSession::decode).transpose()
    }

    pub fn sessions(&self, query: &SessionQuery) -> Result<Vec<SessionRecord>, DatabaseError> {
        const ORDER: &str = "ORDER BY date DESC, started_at DESC, id DESC";
        let mut stmt;
        let rows = match query {
            SessionQuery::All => {
                stmt = self
                    .conn
                    .prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions {ORDER}"))?;
                stmt.query_map([], raw_session)?
            }
            SessionQuery::Date(date) => {
                stmt = self.conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE date = ?1 {ORDER}"
                ))?;
                stmt.query_map(params![date.format(DATE_FORMAT).to_string()], raw_session)?
            }
            SessionQuery::DateRange(start, end) => {
                stmt = self.conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE date BETWEEN ?1 AND ?2 {ORDER}"
                ))?;
                stmt.query_map(
                    params![
                        start.format(DATE_FORMAT).to_string(),
                        end.format(DATE_FORMAT).to_string()
                    ],
                    raw_session,
                )?
            }
            SessionQuery::Type(period) => {
                stmt = self.conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE period_type = ?1 {ORDER}"
                ))?;
                stmt.query_map(params![period.as_str()], raw_session)?
            }
        };

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.decode()?);
        }
        Ok(out)
    }

    /// Completed work sessions per calendar date.
    pub fn daily_completed_work(&self) -> Result<BTreeMap<NaiveDate, u32>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, COUNT(*)
             FROM sessions
             WHERE period_type = 'WORK' AND completed = 1
             GROUP BY date",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;

        let mut daily = BTreeMap::new();
        for row in rows {
            let (date, count) = row?;
            daily.insert(parse_date(&date)?, count);
        }
        Ok(daily)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionSink for Database {
    fn record(&mut self, session: &NewSession) -> Result<i64> {
        Ok(self.insert_session(session)?)
    }
}

/// Row as stored, before text columns are parsed.
struct RawSession {
    id: i64,
    started_at: String,
    ended_at: String,
    date: String,
    duration_min: u32,
    period_type: String,
    completed: bool,
}

fn raw_session(row: &Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        id: row.get(0)?,
        started_at: row.get(1)?,
        ended_at: row.get(2)?,
        date: row.get(3)?,
        duration_min: row.get(4)?,
        period_type: row.get(5)?,
        completed: row.get(6)?,
    })
}

impl RawSession {
    fn decode(self) -> Result<SessionRecord, DatabaseError> {
        Ok(SessionRecord {
            id: self.id,
            started_at: parse_timestamp(&self.started_at)?,
            ended_at: parse_timestamp(&self.ended_at)?,
            date: parse_date(&self.date)?,
            duration_min: self.duration_min,
            period_type: self.period_type.parse().map_err(corrupt)?,
            completed: self.completed,
        })
    }
}

fn corrupt(message: String) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: "sessions",
        message,
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("bad timestamp '{s}': {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| corrupt(format!("bad date '{s}': {e}")))
}
