use chrono::Utc;
use clap::Subcommand;
use pomodoro_core::{Event, SessionStore, SettingsStore, TimerSnapshot};
use serde::Serialize;

use super::{load_controller, save_controller, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current period
    Start,
    /// Pause the running period
    Pause,
    /// Restart the current period from full length
    Reset,
    /// Abandon the current period and move to the next
    Skip,
    /// Print current timer state as JSON
    Status,
}

#[derive(Serialize)]
struct TimerOutput {
    snapshot: TimerSnapshot,
    events: Vec<Event>,
}

pub fn run(action: TimerAction) -> CliResult {
    let settings = SettingsStore::open()?.current();
    let mut store = SessionStore::open()?;
    let mut controller = load_controller(&store, &settings);

    // Apply the time that passed since the last invocation first.
    let now = Utc::now();
    let mut events = controller.catch_up(&settings, &mut store, now);

    events.extend(match action {
        TimerAction::Start => controller.start(now),
        TimerAction::Pause => controller.pause(now),
        TimerAction::Reset => controller.reset(now),
        TimerAction::Skip => controller.skip(&settings, &mut store, now),
        TimerAction::Status => Vec::new(),
    });

    save_controller(&store, &controller)?;

    let output = TimerOutput {
        snapshot: controller.snapshot(),
        events,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
