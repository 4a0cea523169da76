use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Subcommand, ValueEnum};
use pomodoro_core::export::{self, ExportFormat};
use pomodoro_core::{PeriodType, SessionQuery, SessionRecord, SessionStore};

use super::CliResult;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded sessions, newest first
    List {
        /// Only sessions filed under this date (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["from", "to", "period_type"])]
        date: Option<NaiveDate>,
        /// Start of an inclusive date range
        #[arg(long, requires = "to", conflicts_with = "period_type")]
        from: Option<NaiveDate>,
        /// End of an inclusive date range
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        /// Only sessions of this type (work, short-break, long-break)
        #[arg(long = "type")]
        period_type: Option<PeriodType>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete a session by id
    Delete { id: i64 },
    /// Export sessions as JSON or iCalendar
    Export {
        /// Export a single session
        #[arg(long)]
        id: Option<i64>,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// File or directory to write to (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Json,
    Ics,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ExportFormat::Json,
            Format::Ics => ExportFormat::Ics,
        }
    }
}

pub fn run(action: HistoryAction) -> CliResult {
    let store = SessionStore::open()?;

    match action {
        HistoryAction::List {
            date,
            from,
            to,
            period_type,
            json,
        } => {
            let query = match (date, from, to, period_type) {
                (Some(date), ..) => SessionQuery::Date(date),
                (None, Some(from), Some(to), _) => SessionQuery::date_range(from, to)?,
                (None, _, _, Some(period)) => SessionQuery::Type(period),
                _ => SessionQuery::All,
            };
            let sessions = store.sessions(&query)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("no sessions");
            } else {
                for session in &sessions {
                    println!("{}", format_row(session));
                }
            }
        }
        HistoryAction::Delete { id } => {
            if !store.delete(id)? {
                return Err(format!("session {id} not found").into());
            }
            println!("deleted session {id}");
        }
        HistoryAction::Export { id, format, output } => {
            let format = ExportFormat::from(format);
            let document = match id {
                Some(id) => {
                    let session = store
                        .get(id)?
                        .ok_or_else(|| format!("session {id} not found"))?;
                    match format {
                        ExportFormat::Json => export::export_session(&session)?,
                        ExportFormat::Ics => export::to_ical(&[session]),
                    }
                }
                None => format.render(&store.sessions(&SessionQuery::All)?)?,
            };

            match output {
                None if document.ends_with('\n') => print!("{document}"),
                None => println!("{document}"),
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(export::file_name(format, Local::now().date_naive(), id))
                    } else {
                        path
                    };
                    std::fs::write(&path, document)?;
                    tracing::info!(path = %path.display(), "export written");
                    println!("{}", path.display());
                }
            }
        }
    }
    Ok(())
}

fn format_row(session: &SessionRecord) -> String {
    let start = session.started_at.with_timezone(&Local).format("%H:%M");
    let end = session.ended_at.with_timezone(&Local).format("%H:%M");
    let status = if session.completed {
        "completed"
    } else {
        "interrupted"
    };
    format!(
        "{:>5}  {}  {start}-{end}  {:<11} {:>3} min  {status}",
        session.id,
        session.date,
        session.period_type.label(),
        session.duration_min,
    )
}
