//! Host logic around the timer engine.
//!
//! The controller is the host side of the engine: it
//! stamps when a period really started, turns finished or skipped periods
//! into session records, asks the sequencer what comes next and applies the
//! auto-start flags. It is plain data, so a one-shot CLI call can persist it
//! and the next call can catch up on the wall-clock time in between.

use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};

use super::engine::{TimerEngine, TimerSnapshot, TimerState};
use super::period::PeriodType;
use super::sequencer::{next_period, should_auto_start};
use crate::error::Result;
use crate::events::Event;
use crate::storage::{NewSession, Settings};

/// Where finished periods go.
///
/// `Ok` means the record was accepted (written, or queued for writing).
pub trait SessionSink {
    fn record(&mut self, session: &NewSession) -> Result<i64>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerController {
    engine: TimerEngine,
    /// First time the current period was started. Survives pause/resume.
    #[serde(default)]
    period_started_at: Option<DateTime<Utc>>,
    /// Instant up to which elapsed time has been applied while running.
    #[serde(default)]
    last_tick_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_error: Option<String>,
}

impl TimerController {
    pub fn new(settings: &Settings) -> Self {
        Self {
            engine: TimerEngine::new(settings.timer.durations()),
            period_started_at: None,
            last_tick_at: None,
            last_error: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn state(&self) -> TimerState {
        self.engine.state()
    }

    pub fn period_started_at(&self) -> Option<DateTime<Utc>> {
        self.period_started_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            last_error: self.last_error.clone(),
            ..self.engine.snapshot()
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Pick up new durations. An untouched idle period is resized at once;
    /// a period already under way keeps its length.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.engine.configure(settings.timer.durations());
        if self.engine.state() == TimerState::Idle && self.period_started_at.is_none() {
            self.engine.reset();
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let events = self.begin(now);
        if !events.is_empty() {
            self.last_error = None;
        }
        events
    }

    pub fn pause(&mut self, _now: DateTime<Utc>) -> Vec<Event> {
        match self.engine.pause() {
            Some(event) => {
                self.last_tick_at = None;
                self.last_error = None;
                vec![event]
            }
            None => Vec::new(),
        }
    }

    /// Restart the current period from full length. Nothing is recorded.
    pub fn reset(&mut self, _now: DateTime<Utc>) -> Vec<Event> {
        self.period_started_at = None;
        self.last_tick_at = None;
        self.last_error = None;
        self.engine.reset().into_iter().collect()
    }

    /// Apply `elapsed` seconds. Completing the period records it, advances
    /// to the next one and honours the auto-start flags.
    pub fn tick(
        &mut self,
        elapsed: u64,
        settings: &Settings,
        sink: &mut dyn SessionSink,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        match self.engine.tick(elapsed) {
            Some(completed) => {
                events.push(completed);
                self.finish_period(settings, sink, now, &mut events);
            }
            None => {
                if self.engine.state() == TimerState::Running {
                    self.last_tick_at = Some(now);
                }
            }
        }
        events
    }

    /// Abandon the current period and move to the next one.
    ///
    /// A period that was never started leaves no record; otherwise an
    /// interrupted session with the minutes actually run is written.
    pub fn skip(
        &mut self,
        settings: &Settings,
        sink: &mut dyn SessionSink,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        self.last_error = None;
        let from = self.engine.period();

        if let Some(started_at) = self.period_started_at {
            let session = NewSession {
                started_at,
                ended_at: now,
                date: local_date(now),
                duration_min: minutes(self.engine.elapsed_secs()),
                period_type: from,
                completed: false,
            };
            self.save(sink, session, now, &mut events);
        }

        let next = next_period(
            from,
            self.engine.completed_work(),
            settings.timer.periods_until_long_break,
        );
        events.push(Event::TimerSkipped {
            from,
            to: next,
            at: now,
        });
        self.advance(next, settings, now, &mut events);
        events
    }

    /// Apply the whole seconds elapsed since the last tick, stepping across
    /// any completions on the way. Used when nothing ticked in between, e.g.
    /// across separate CLI invocations.
    pub fn catch_up(
        &mut self,
        settings: &Settings,
        sink: &mut dyn SessionSink,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(mut cursor) = self.last_tick_at else {
            return events;
        };
        let mut pending = u64::try_from((now - cursor).num_seconds()).unwrap_or(0);

        while pending > 0 && self.engine.state() == TimerState::Running {
            let step = pending.min(self.engine.remaining_secs());
            if step == 0 {
                break;
            }
            pending -= step;
            cursor += Duration::seconds(step as i64);
            events.extend(self.tick(step, settings, sink, cursor));
        }
        events
    }

    /// Record a non-fatal failure reported from outside, e.g. by a
    /// background session writer.
    pub fn report_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        match self.engine.start() {
            Some(event) => {
                self.period_started_at.get_or_insert(now);
                self.last_tick_at = Some(now);
                vec![event]
            }
            None => Vec::new(),
        }
    }

    fn finish_period(
        &mut self,
        settings: &Settings,
        sink: &mut dyn SessionSink,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        let period = self.engine.period();
        let total = self.engine.total_secs();
        let session = NewSession {
            started_at: self
                .period_started_at
                .unwrap_or_else(|| now - Duration::seconds(total as i64)),
            ended_at: now,
            date: local_date(now),
            duration_min: minutes(total),
            period_type: period,
            completed: true,
        };
        self.save(sink, session, now, events);

        self.engine.increment_completed_count();
        let next = next_period(
            period,
            self.engine.completed_work(),
            settings.timer.periods_until_long_break,
        );
        tracing::info!(
            finished = %period,
            next = %next,
            completed_work = self.engine.completed_work(),
            "period completed"
        );
        self.advance(next, settings, now, events);
    }

    fn advance(
        &mut self,
        next: PeriodType,
        settings: &Settings,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        self.engine.configure(settings.timer.durations());
        self.engine.set_period(next);
        self.period_started_at = None;
        self.last_tick_at = None;

        let auto_started = should_auto_start(
            next,
            settings.automation.auto_start_pomodoros,
            settings.automation.auto_start_breaks,
        );
        events.push(Event::PeriodAdvanced {
            period: next,
            duration_secs: self.engine.total_secs(),
            auto_started,
            at: now,
        });
        if auto_started {
            events.extend(self.begin(now));
        }
    }

    fn save(
        &mut self,
        sink: &mut dyn SessionSink,
        session: NewSession,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) {
        match sink.record(&session) {
            Ok(id) => {
                tracing::debug!(id, period = %session.period_type, completed = session.completed, "session recorded");
                events.push(Event::SessionRecorded {
                    period: session.period_type,
                    completed: session.completed,
                    duration_min: session.duration_min,
                    at: now,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, period = %session.period_type, "failed to record session");
                let message = e.to_string();
                self.last_error = Some(message.clone());
                events.push(Event::SessionSaveFailed {
                    period: session.period_type,
                    message,
                    at: now,
                });
            }
        }
    }
}

fn local_date(at: DateTime<Utc>) -> chrono::NaiveDate {
    at.with_timezone(&Local).date_naive()
}

fn minutes(secs: u64) -> u32 {
    u32::try_from(secs / 60).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use chrono::TimeZone;

    #[derive(Default)]
    struct MemorySink(Vec<NewSession>);

    impl SessionSink for MemorySink {
        fn record(&mut self, session: &NewSession) -> Result<i64> {
            self.0.push(session.clone());
            Ok(self.0.len() as i64)
        }
    }

    struct FailingSink;

    impl SessionSink for FailingSink {
        fn record(&mut self, _session: &NewSession) -> Result<i64> {
            Err(CoreError::SinkClosed)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    fn settings(auto_breaks: bool, auto_pomodoros: bool) -> Settings {
        let mut s = Settings::default();
        s.automation.auto_start_breaks = auto_breaks;
        s.automation.auto_start_pomodoros = auto_pomodoros;
        s
    }

    fn run_period(c: &mut TimerController, s: &Settings, sink: &mut MemorySink, at: DateTime<Utc>) -> DateTime<Utc> {
        c.start(at);
        let total = c.engine().remaining_secs() as i64;
        let end = at + secs(total);
        c.tick(total as u64, s, sink, end);
        end
    }

    #[test]
    fn completion_records_session_and_advances() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        for i in 1..1500 {
            assert!(c.tick(1, &s, &mut sink, t0() + secs(i)).is_empty());
        }
        let events = c.tick(1, &s, &mut sink, t0() + secs(1500));

        assert!(matches!(events[0], Event::TimerCompleted { period: PeriodType::Work, .. }));
        assert_eq!(sink.0.len(), 1);
        let session = &sink.0[0];
        assert!(session.completed);
        assert_eq!(session.duration_min, 25);
        assert_eq!(session.started_at, t0());
        assert_eq!(session.ended_at, t0() + secs(1500));
        assert_eq!(session.period_type, PeriodType::Work);

        assert_eq!(c.engine().period(), PeriodType::ShortBreak);
        assert_eq!(c.state(), TimerState::Idle);
        assert_eq!(c.engine().completed_work(), 1);
        assert_eq!(c.engine().remaining_secs(), 300);
    }

    #[test]
    fn third_pomodoro_is_followed_by_long_break() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);
        let mut at = t0();
        let mut sequence = Vec::new();
        for _ in 0..8 {
            at = run_period(&mut c, &s, &mut sink, at);
            sequence.push(c.engine().period());
        }
        assert_eq!(
            sequence,
            vec![
                PeriodType::ShortBreak,
                PeriodType::Work,
                PeriodType::ShortBreak,
                PeriodType::Work,
                PeriodType::LongBreak,
                PeriodType::Work,
                PeriodType::ShortBreak,
                PeriodType::Work,
            ]
        );
        assert_eq!(c.engine().completed_work(), 4);
        assert_eq!(c.engine().completed_short_breaks(), 3);
        assert_eq!(c.engine().completed_long_breaks(), 1);
        assert_eq!(sink.0.len(), 8);
    }

    #[test]
    fn auto_start_breaks_only() {
        let s = settings(true, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        let end = run_period(&mut c, &s, &mut sink, t0());
        assert_eq!(c.engine().period(), PeriodType::ShortBreak);
        assert_eq!(c.state(), TimerState::Running);
        assert_eq!(c.period_started_at(), Some(end));

        c.tick(300, &s, &mut sink, end + secs(300));
        assert_eq!(c.engine().period(), PeriodType::Work);
        assert_eq!(c.state(), TimerState::Idle);
    }

    #[test]
    fn auto_start_pomodoros_only() {
        let s = settings(false, true);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        run_period(&mut c, &s, &mut sink, t0());
        assert_eq!(c.state(), TimerState::Idle);
        run_period(&mut c, &s, &mut sink, t0() + secs(3600));
        assert_eq!(c.engine().period(), PeriodType::Work);
        assert_eq!(c.state(), TimerState::Running);
    }

    #[test]
    fn resume_keeps_original_start() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        c.tick(60, &s, &mut sink, t0() + secs(60));
        c.pause(t0() + secs(60));
        c.start(t0() + secs(600));
        assert_eq!(c.period_started_at(), Some(t0()));
    }

    #[test]
    fn skip_unstarted_period_records_nothing() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        let events = c.skip(&s, &mut sink, t0());
        assert!(sink.0.is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            Event::TimerSkipped { from: PeriodType::Work, to: PeriodType::ShortBreak, .. }
        )));
        assert_eq!(c.engine().period(), PeriodType::ShortBreak);
        assert_eq!(c.engine().completed_work(), 0);
        assert_eq!(c.state(), TimerState::Idle);
    }

    #[test]
    fn skip_started_period_records_interrupted_session() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        c.tick(10 * 60 + 30, &s, &mut sink, t0() + secs(630));
        c.pause(t0() + secs(630));
        c.skip(&s, &mut sink, t0() + secs(700));

        assert_eq!(sink.0.len(), 1);
        let session = &sink.0[0];
        assert!(!session.completed);
        assert_eq!(session.duration_min, 10);
        assert_eq!(session.ended_at, t0() + secs(700));
        assert_eq!(c.engine().completed_work(), 0);
        assert_eq!(c.engine().period(), PeriodType::ShortBreak);
    }

    #[test]
    fn reset_discards_progress_without_recording() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        c.tick(100, &s, &mut sink, t0() + secs(100));
        c.reset(t0() + secs(100));
        assert!(sink.0.is_empty());
        assert_eq!(c.state(), TimerState::Idle);
        assert_eq!(c.engine().remaining_secs(), 1500);
        assert!(c.period_started_at().is_none());
    }

    #[test]
    fn sink_failure_is_non_fatal() {
        let s = settings(false, false);
        let mut c = TimerController::new(&s);

        c.start(t0());
        let events = c.tick(1500, &s, &mut FailingSink, t0() + secs(1500));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::SessionSaveFailed { .. })));
        assert_eq!(c.engine().period(), PeriodType::ShortBreak);
        assert_eq!(c.engine().completed_work(), 1);
        assert!(c.snapshot().last_error.is_some());

        c.start(t0() + secs(1600));
        assert!(c.snapshot().last_error.is_none());
    }

    #[test]
    fn fresh_settings_apply_at_transition() {
        let mut s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        s.timer.short_break_minutes = 10;
        c.tick(1500, &s, &mut sink, t0() + secs(1500));
        assert_eq!(c.engine().total_secs(), 600);
    }

    #[test]
    fn apply_settings_resizes_only_untouched_idle_period() {
        let mut s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        s.timer.work_minutes = 50;
        c.apply_settings(&s);
        assert_eq!(c.engine().total_secs(), 3000);

        c.start(t0());
        c.tick(5, &s, &mut sink, t0() + secs(5));
        s.timer.work_minutes = 10;
        c.apply_settings(&s);
        assert_eq!(c.engine().total_secs(), 3000);
        assert_eq!(c.engine().remaining_secs(), 2995);
    }

    #[test]
    fn catch_up_steps_across_auto_started_periods() {
        let s = settings(true, true);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        // 25 min work + 5 min break + 2 min into the next work period.
        let events = c.catch_up(&s, &mut sink, t0() + secs(1500 + 300 + 120));

        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0].ended_at, t0() + secs(1500));
        assert_eq!(sink.0[1].started_at, t0() + secs(1500));
        assert_eq!(sink.0[1].period_type, PeriodType::ShortBreak);
        assert_eq!(c.engine().period(), PeriodType::Work);
        assert_eq!(c.state(), TimerState::Running);
        assert_eq!(c.engine().remaining_secs(), 1500 - 120);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::TimerCompleted { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn catch_up_stops_when_next_period_waits() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        c.catch_up(&s, &mut sink, t0() + secs(10_000));
        assert_eq!(sink.0.len(), 1);
        assert_eq!(c.engine().period(), PeriodType::ShortBreak);
        assert_eq!(c.state(), TimerState::Idle);
        assert_eq!(c.engine().remaining_secs(), 300);
    }

    #[test]
    fn catch_up_ignores_paused_timer() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);

        c.start(t0());
        c.pause(t0() + secs(30));
        assert!(c.catch_up(&s, &mut sink, t0() + secs(5000)).is_empty());
        assert_eq!(c.engine().remaining_secs(), 1500);
    }

    #[test]
    fn persists_through_json() {
        let s = settings(false, false);
        let mut sink = MemorySink::default();
        let mut c = TimerController::new(&s);
        c.start(t0());
        c.tick(42, &s, &mut sink, t0() + secs(42));

        let json = serde_json::to_string(&c).unwrap();
        let restored: TimerController = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.snapshot(), c.snapshot());
        assert_eq!(restored.period_started_at(), Some(t0()));
    }
}
