//! # Pomodoro Core Library
//!
//! Core logic for a Pomodoro timer: a countdown state machine, the rule that
//! picks the next period, session history in SQLite and TOML settings. The
//! `pomodoro` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: [`TimerEngine`] counts down one period and is driven by
//!   `tick()`. [`TimerController`] wraps it, records finished periods through a
//!   [`SessionSink`] and advances to the next period.
//! - **Runtime**: [`runtime::TimerRuntime`] owns a controller on a tokio task,
//!   ticks it once per second and publishes snapshots over `watch`.
//! - **Storage**: SQLite session history ([`Database`], [`SessionStore`]) and
//!   TOML settings ([`SettingsStore`]).
//! - **Export**: JSON and iCalendar renderings of session history.

pub mod error;
pub mod events;
pub mod export;
pub mod notify;
pub mod runtime;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use notify::{Alert, NotificationView, Notifier, NullNotifier};
pub use runtime::{spawn_session_writer, ChannelSink, TimerHandle, TimerRuntime};
pub use stats::Statistics;
pub use storage::{
    Database, NewSession, SessionQuery, SessionRecord, SessionStore, Settings, SettingsStore,
};
pub use timer::{
    PeriodDurations, PeriodType, SessionSink, TimerController, TimerEngine, TimerSnapshot,
    TimerState,
};

/// Key under which the CLI keeps the timer controller in the kv table.
pub const CONTROLLER_KEY: &str = "timer_controller";
