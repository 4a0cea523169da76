//! Session export: JSON documents and iCalendar events.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::SessionRecord;
use crate::timer::PeriodType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Ics,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Ics => "ics",
        }
    }

    /// Render `sessions` in this format.
    pub fn render(&self, sessions: &[SessionRecord]) -> Result<String> {
        match self {
            ExportFormat::Json => export_sessions(sessions),
            ExportFormat::Ics => Ok(to_ical(sessions)),
        }
    }
}

/// One session as it appears in a JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSession {
    pub id: i64,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: u32,
    #[serde(rename = "type")]
    pub period_type: PeriodType,
    pub completed: bool,
}

impl From<&SessionRecord> for ExportedSession {
    fn from(s: &SessionRecord) -> Self {
        Self {
            id: s.id,
            date: s.date,
            start_time: timestamp(s.started_at),
            end_time: timestamp(s.ended_at),
            duration_minutes: s.duration_min,
            period_type: s.period_type,
            completed: s.completed,
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn export_session(session: &SessionRecord) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ExportedSession::from(session))?)
}

pub fn export_sessions(sessions: &[SessionRecord]) -> Result<String> {
    let exported: Vec<ExportedSession> = sessions.iter().map(ExportedSession::from).collect();
    Ok(serde_json::to_string_pretty(&exported)?)
}

/// `pomodoro_sessions_<date>.json`, or `pomodoro_session_<id>_<date>.json`
/// for a single session.
pub fn export_file_name(date: NaiveDate, id: Option<i64>) -> String {
    file_name(ExportFormat::Json, date, id)
}

pub fn file_name(format: ExportFormat, date: NaiveDate, id: Option<i64>) -> String {
    let date = date.format("%Y-%m-%d");
    let ext = format.extension();
    match id {
        Some(id) => format!("pomodoro_session_{id}_{date}.{ext}"),
        None => format!("pomodoro_sessions_{date}.{ext}"),
    }
}

// ── iCalendar ────────────────────────────────────────────────────────

pub fn event_title(period: PeriodType) -> &'static str {
    match period {
        PeriodType::Work => "Pomodoro: Work session",
        PeriodType::ShortBreak => "Pomodoro: Short break",
        PeriodType::LongBreak => "Pomodoro: Long break",
    }
}

pub fn event_description(session: &SessionRecord) -> String {
    let status = if session.completed {
        "Completed"
    } else {
        "Interrupted"
    };
    format!(
        "Pomodoro session\nDuration: {} minutes\nStatus: {status}",
        session.duration_min
    )
}

/// A calendar document with one busy event per session.
pub fn to_ical(sessions: &[SessionRecord]) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//pomodoro//session export//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
    ];
    for session in sessions {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:pomodoro-session-{}@pomodoro", session.id));
        lines.push(format!("DTSTAMP:{}", ical_time(session.ended_at)));
        lines.push(format!("DTSTART:{}", ical_time(session.started_at)));
        lines.push(format!("DTEND:{}", ical_time(session.ended_at)));
        lines.push(format!("SUMMARY:{}", escape_text(event_title(session.period_type))));
        lines.push(format!(
            "DESCRIPTION:{}",
            escape_text(&event_description(session))
        ));
        lines.push("TRANSP:OPAQUE".to_string());
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        fold_line(line, &mut out);
    }
    out
}

fn ical_time(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// Content lines end in CRLF and are folded at 75 octets.
fn fold_line(line: &str, out: &mut String) {
    const LIMIT: usize = 75;
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i64, period: PeriodType, completed: bool) -> SessionRecord {
        let start = Utc.with_ymd_and_hms(2026, 4, 12, 9, 30, 0).unwrap();
        SessionRecord {
            id,
            started_at: start,
            ended_at: start + chrono::Duration::minutes(25),
            date: start.date_naive(),
            duration_min: 25,
            period_type: period,
            completed,
        }
    }

    #[test]
    fn json_uses_export_field_names() {
        let json = export_session(&record(7, PeriodType::ShortBreak, false)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["date"], "2026-04-12");
        assert_eq!(value["start_time"], "2026-04-12T09:30:00Z");
        assert_eq!(value["end_time"], "2026-04-12T09:55:00Z");
        assert_eq!(value["duration_minutes"], 25);
        assert_eq!(value["type"], "SHORT_BREAK");
        assert_eq!(value["completed"], false);
    }

    #[test]
    fn json_list_keeps_order() {
        let sessions = vec![record(2, PeriodType::Work, true), record(1, PeriodType::Work, true)];
        let parsed: Vec<ExportedSession> =
            serde_json::from_str(&export_sessions(&sessions).unwrap()).unwrap();
        assert_eq!(parsed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(export_sessions(&[]).unwrap(), "[]");
    }

    #[test]
    fn file_names() {
        let date = NaiveDate::from_ymd_opt(2026, 4, 12).unwrap();
        assert_eq!(export_file_name(date, None), "pomodoro_sessions_2026-04-12.json");
        assert_eq!(
            export_file_name(date, Some(42)),
            "pomodoro_session_42_2026-04-12.json"
        );
        assert_eq!(
            file_name(ExportFormat::Ics, date, None),
            "pomodoro_sessions_2026-04-12.ics"
        );
    }

    #[test]
    fn ical_has_one_event_per_session() {
        let ics = to_ical(&[
            record(1, PeriodType::Work, true),
            record(2, PeriodType::LongBreak, false),
        ]);
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert!(ics.contains("SUMMARY:Pomodoro: Work session\r\n"));
        assert!(ics.contains("SUMMARY:Pomodoro: Long break\r\n"));
        assert!(ics.contains("DTSTART:20260412T093000Z\r\n"));
        assert!(ics.contains("DTEND:20260412T095500Z\r\n"));
        assert!(ics.contains("Status: Completed"));
        assert!(ics.contains("Status: Interrupted"));
        assert!(ics.contains("Duration: 25 minutes"));
    }

    #[test]
    fn ical_escapes_and_folds() {
        assert_eq!(escape_text("a;b,c\nd\\"), "a\\;b\\,c\\nd\\\\");

        let mut out = String::new();
        fold_line(&"x".repeat(100), &mut out);
        let lines: Vec<&str> = out.split("\r\n").collect();
        assert_eq!(lines[0].len(), 75);
        assert_eq!(lines[1], format!(" {}", "x".repeat(25)));
    }
}
