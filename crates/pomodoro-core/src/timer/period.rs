use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodType {
    Work,
    ShortBreak,
    LongBreak,
}

impl PeriodType {
    pub const ALL: [PeriodType; 3] = [
        PeriodType::Work,
        PeriodType::ShortBreak,
        PeriodType::LongBreak,
    ];

    /// Stable name used in the database and in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Work => "WORK",
            PeriodType::ShortBreak => "SHORT_BREAK",
            PeriodType::LongBreak => "LONG_BREAK",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PeriodType::Work => "Work",
            PeriodType::ShortBreak => "Short Break",
            PeriodType::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, PeriodType::Work)
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = String;

    /// Accepts the stored name as well as the kebab/lowercase spellings used on
    /// the command line (`work`, `short-break`, `long_break`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "WORK" => Ok(PeriodType::Work),
            "SHORT_BREAK" => Ok(PeriodType::ShortBreak),
            "LONG_BREAK" => Ok(PeriodType::LongBreak),
            _ => Err(format!("unknown period type: {s}")),
        }
    }
}

/// Configured lengths of the three period types, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDurations {
    pub work_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    pub periods_until_long_break: u32,
}

impl PeriodDurations {
    pub fn from_minutes(work: u32, short_break: u32, long_break: u32, periods: u32) -> Self {
        Self {
            work_secs: u64::from(work).saturating_mul(60),
            short_break_secs: u64::from(short_break).saturating_mul(60),
            long_break_secs: u64::from(long_break).saturating_mul(60),
            periods_until_long_break: periods,
        }
    }

    pub fn for_period(&self, period: PeriodType) -> u64 {
        match period {
            PeriodType::Work => self.work_secs,
            PeriodType::ShortBreak => self.short_break_secs,
            PeriodType::LongBreak => self.long_break_secs,
        }
    }
}

impl Default for PeriodDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15, 4)
    }
}
