use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::PeriodType;

/// Every state change in the timer produces an Event.
/// The CLI prints them; the runtime logs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        period: PeriodType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        period: PeriodType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        period: PeriodType,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        period: PeriodType,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: PeriodType,
        to: PeriodType,
        at: DateTime<Utc>,
    },
    PeriodAdvanced {
        period: PeriodType,
        duration_secs: u64,
        auto_started: bool,
        at: DateTime<Utc>,
    },
    SessionRecorded {
        period: PeriodType,
        completed: bool,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    /// Handing a session to storage failed. Timer state is unaffected.
    SessionSaveFailed {
        period: PeriodType,
        message: String,
        at: DateTime<Utc>,
    },
}
