//! Period sequencing.
//!
//! Pure functions deciding which period follows the current one and whether
//! it should start on its own.

use super::period::PeriodType;

/// The period that follows `current`.
///
/// The controller passes the work count after it has counted the period that
/// just ended, so with `periods_until_long_break = 4` the long break follows
/// the 3rd pomodoro, then every fourth one after that. A zero cadence never
/// yields a long break.
pub fn next_period(
    current: PeriodType,
    completed_work: u32,
    periods_until_long_break: u32,
) -> PeriodType {
    match current {
        PeriodType::Work => {
            let finished = u64::from(completed_work) + 1;
            match finished.checked_rem(u64::from(periods_until_long_break)) {
                Some(0) => PeriodType::LongBreak,
                _ => PeriodType::ShortBreak,
            }
        }
        PeriodType::ShortBreak | PeriodType::LongBreak => PeriodType::Work,
    }
}

/// Whether `next` starts running as soon as it is entered.
pub fn should_auto_start(next: PeriodType, auto_start_pomodoros: bool, auto_start_breaks: bool) -> bool {
    if next.is_break() {
        auto_start_breaks
    } else {
        auto_start_pomodoros
    }
}
