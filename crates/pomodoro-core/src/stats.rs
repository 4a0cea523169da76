//! Aggregate statistics over recorded sessions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;
use crate::timer::PeriodType;

/// Number of most recent days kept in [`Statistics::recent_days`].
pub const RECENT_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub completed_work: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Statistics {
    pub total_sessions: u32,
    pub work_sessions: u32,
    pub work_minutes: u64,
    /// Completed work sessions as a rounded percentage of all work sessions.
    pub completion_rate: u32,
    pub short_break_sessions: u32,
    pub long_break_sessions: u32,
    pub work_percentage: u32,
    pub short_break_percentage: u32,
    pub long_break_percentage: u32,
    /// Mean completed work sessions over the days that have any.
    pub daily_average: f64,
    /// Up to the last [`RECENT_DAYS`] days with completed work, oldest first.
    pub recent_days: Vec<DailyCount>,
}

impl Statistics {
    pub fn compute(sessions: &[SessionRecord], daily: &BTreeMap<NaiveDate, u32>) -> Self {
        let mut stats = Statistics {
            total_sessions: count(sessions.len()),
            ..Default::default()
        };

        let mut completed_work = 0u32;
        for session in sessions {
            match session.period_type {
                PeriodType::Work => {
                    stats.work_sessions += 1;
                    stats.work_minutes += u64::from(session.duration_min);
                    if session.completed {
                        completed_work += 1;
                    }
                }
                PeriodType::ShortBreak => stats.short_break_sessions += 1,
                PeriodType::LongBreak => stats.long_break_sessions += 1,
            }
        }

        stats.completion_rate = percent(completed_work, stats.work_sessions);
        stats.work_percentage = percent(stats.work_sessions, stats.total_sessions);
        stats.short_break_percentage = percent(stats.short_break_sessions, stats.total_sessions);
        stats.long_break_percentage = percent(stats.long_break_sessions, stats.total_sessions);

        if !daily.is_empty() {
            let sum: u64 = daily.values().map(|&n| u64::from(n)).sum();
            stats.daily_average = sum as f64 / daily.len() as f64;
        }

        // BTreeMap iterates in ascending date order.
        let skip = daily.len().saturating_sub(RECENT_DAYS);
        stats.recent_days = daily
            .iter()
            .skip(skip)
            .map(|(&date, &completed_work)| DailyCount {
                date,
                completed_work,
            })
            .collect();

        stats
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(whole)).round() as u32
}
