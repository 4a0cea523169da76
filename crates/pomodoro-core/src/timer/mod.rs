mod controller;
mod engine;
mod period;
pub mod sequencer;

pub use controller::{SessionSink, TimerController};
pub use engine::{format_mm_ss, TimerEngine, TimerSnapshot, TimerState};
pub use period::{PeriodDurations, PeriodType};
pub use sequencer::{next_period, should_auto_start};
