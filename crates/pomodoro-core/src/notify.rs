//! What a notification surface needs to know about the timer.
//!
//! Rendering is left to the host: the runtime hands a [`Notifier`] a ready
//! [`NotificationView`] on every state change and an [`Alert`] when a period
//! runs out.

use serde::{Deserialize, Serialize};

use crate::storage::NotificationSettings;
use crate::timer::{PeriodType, TimerSnapshot, TimerState};

/// Buttons offered next to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Start,
    Pause,
    Reset,
    Skip,
}

impl Control {
    pub fn label(&self) -> &'static str {
        match self {
            Control::Start => "Start",
            Control::Pause => "Pause",
            Control::Reset => "Reset",
            Control::Skip => "Skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    pub title: String,
    /// Remaining time as `MM:SS`.
    pub remaining: String,
    pub state: TimerState,
    /// Start-or-Pause, then Reset and Skip.
    pub controls: [Control; 3],
}

impl NotificationView {
    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        let toggle = if snapshot.state == TimerState::Running {
            Control::Pause
        } else {
            Control::Start
        };
        Self {
            title: title_for(snapshot.period).to_string(),
            remaining: snapshot.remaining_display(),
            state: snapshot.state,
            controls: [toggle, Control::Reset, Control::Skip],
        }
    }
}

pub fn title_for(period: PeriodType) -> &'static str {
    match period {
        PeriodType::Work => "Focus time",
        PeriodType::ShortBreak => "Short break",
        PeriodType::LongBreak => "Long break",
    }
}

/// How loudly to announce the end of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Alert {
    pub sound: bool,
    pub vibrate: bool,
}

impl Alert {
    pub fn from_settings(settings: &NotificationSettings) -> Self {
        Self {
            sound: settings.sound_enabled,
            vibrate: settings.vibration_enabled,
        }
    }
}

/// Receives timer updates from the runtime. Both hooks default to no-ops.
pub trait Notifier: Send + 'static {
    /// Called after every state change with the view to display.
    fn on_state(&mut self, _view: &NotificationView) {}

    /// Called when a period ran to zero (not on skip or reset).
    fn on_period_finished(&mut self, _finished: PeriodType, _alert: Alert) {}
}

/// Notifier for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::PeriodDurations;

    fn snapshot(state: TimerState, period: PeriodType, remaining_secs: u64) -> TimerSnapshot {
        TimerSnapshot {
            state,
            period,
            remaining_secs,
            total_secs: 1500,
            completed_work: 0,
            completed_short_breaks: 0,
            completed_long_breaks: 0,
            durations: PeriodDurations::default(),
            last_error: None,
        }
    }

    #[test]
    fn running_view_offers_pause() {
        let view = NotificationView::from_snapshot(&snapshot(TimerState::Running, PeriodType::Work, 754));
        assert_eq!(view.title, "Focus time");
        assert_eq!(view.remaining, "12:34");
        assert_eq!(view.controls, [Control::Pause, Control::Reset, Control::Skip]);
    }

    #[test]
    fn idle_and_paused_views_offer_start() {
        for state in [TimerState::Idle, TimerState::Paused] {
            let view = NotificationView::from_snapshot(&snapshot(state, PeriodType::LongBreak, 900));
            assert_eq!(view.controls[0], Control::Start);
            assert_eq!(view.title, "Long break");
        }
    }

    #[test]
    fn alert_follows_settings() {
        let mut settings = NotificationSettings::default();
        assert_eq!(
            Alert::from_settings(&settings),
            Alert { sound: true, vibrate: true }
        );
        settings.sound_enabled = false;
        settings.vibration_enabled = false;
        assert_eq!(
            Alert::from_settings(&settings),
            Alert { sound: false, vibrate: false }
        );
    }
}
