use std::collections::BTreeMap;

use chrono::Local;
use clap::Subcommand;
use pomodoro_core::stats::DailyCount;
use pomodoro_core::{SessionQuery, SessionStore, Statistics};

use super::CliResult;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// All-time stats
    All,
    /// Completed work sessions per day
    Daily,
}

pub fn run(action: StatsAction) -> CliResult {
    let store = SessionStore::open()?;

    match action {
        StatsAction::Today => {
            let today = Local::now().date_naive();
            let sessions = store.sessions(&SessionQuery::Date(today))?;
            let daily: BTreeMap<_, _> = store
                .daily_completed_work()?
                .into_iter()
                .filter(|(date, _)| *date == today)
                .collect();
            let stats = Statistics::compute(&sessions, &daily);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::All => {
            let sessions = store.sessions(&SessionQuery::All)?;
            let daily = store.daily_completed_work()?;
            let stats = Statistics::compute(&sessions, &daily);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Daily => {
            let days: Vec<DailyCount> = store
                .daily_completed_work()?
                .into_iter()
                .map(|(date, completed_work)| DailyCount {
                    date,
                    completed_work,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&days)?);
        }
    }
    Ok(())
}
