//! Timer engine implementation.
//!
//! The timer engine is a discrete countdown state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` once per
//! elapsed second (or with a larger step when catching up).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused -> Running)* -> Completed -> Idle
//!   any --reset/set_period--> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(PeriodDurations::default());
//! engine.start();
//! // Once per second:
//! engine.tick(1); // Returns Some(Event) when the period completes
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::period::{PeriodDurations, PeriodType};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Remaining time reached zero. Transient: the controller advances to
    /// the next period straight away.
    Completed,
}

/// Read-only copy of the engine state, published to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub period: PeriodType,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub completed_work: u32,
    pub completed_short_breaks: u32,
    pub completed_long_breaks: u32,
    pub durations: PeriodDurations,
    /// Last non-fatal persistence failure, if any.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl TimerSnapshot {
    /// Remaining time as `MM:SS`.
    pub fn remaining_display(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }
}

pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Core timer engine.
///
/// Holds the current period and its countdown plus the completed-period
/// counters. `remaining_secs` never exceeds `total_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    state: TimerState,
    period: PeriodType,
    remaining_secs: u64,
    total_secs: u64,
    completed_work: u32,
    completed_short_breaks: u32,
    completed_long_breaks: u32,
    durations: PeriodDurations,
}

impl TimerEngine {
    /// Create an idle engine positioned on a full work period.
    pub fn new(durations: PeriodDurations) -> Self {
        let total = durations.for_period(PeriodType::Work);
        Self {
            state: TimerState::Idle,
            period: PeriodType::Work,
            remaining_secs: total,
            total_secs: total,
            completed_work: 0,
            completed_short_breaks: 0,
            completed_long_breaks: 0,
            durations,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn period(&self) -> PeriodType {
        self.period
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs - self.remaining_secs
    }

    pub fn completed_work(&self) -> u32 {
        self.completed_work
    }

    pub fn completed_short_breaks(&self) -> u32 {
        self.completed_short_breaks
    }

    pub fn completed_long_breaks(&self) -> u32 {
        self.completed_long_breaks
    }

    pub fn durations(&self) -> &PeriodDurations {
        &self.durations
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            period: self.period,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            completed_work: self.completed_work,
            completed_short_breaks: self.completed_short_breaks,
            completed_long_breaks: self.completed_long_breaks,
            durations: self.durations,
            last_error: None,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Idle | TimerState::Paused => {
                self.state = TimerState::Running;
                Some(Event::TimerStarted {
                    period: self.period,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            TimerState::Running | TimerState::Completed => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::Paused;
                Some(Event::TimerPaused {
                    period: self.period,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.state = TimerState::Idle;
        self.total_secs = self.durations.for_period(self.period);
        self.remaining_secs = self.total_secs;
        Some(Event::TimerReset {
            period: self.period,
            total_secs: self.total_secs,
            at: Utc::now(),
        })
    }

    /// Count down by `elapsed` seconds. Returns `Some(Event::TimerCompleted)`
    /// on the tick that exhausts the period; later ticks are no-ops until the
    /// engine is reset or moved to another period.
    pub fn tick(&mut self, elapsed: u64) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(elapsed);
        if self.remaining_secs == 0 {
            self.state = TimerState::Completed;
            return Some(Event::TimerCompleted {
                period: self.period,
                at: Utc::now(),
            });
        }
        None
    }

    pub fn set_period(&mut self, period: PeriodType) {
        self.period = period;
        self.reset();
    }

    pub fn increment_completed_count(&mut self) {
        let counter = match self.period {
            PeriodType::Work => &mut self.completed_work,
            PeriodType::ShortBreak => &mut self.completed_short_breaks,
            PeriodType::LongBreak => &mut self.completed_long_breaks,
        };
        *counter = counter.saturating_add(1);
    }

    /// Replace the configured durations. The period in progress keeps its
    /// total; new values apply from the next reset or period change.
    pub fn configure(&mut self, durations: PeriodDurations) {
        self.durations = durations;
    }
}
