use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;
use tabled::{Table, Tabled, settings::Style};

use tally_core::TrackerService;
use tally_core::models::{Section, StatusFilter, Tracker, TrackerKind};
use tally_core::schedule::Schedule;

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today()),
        Some(s) => match s.as_str() {
            "today" => Ok(today()),
            "yesterday" => Ok(today() - chrono::Duration::days(1)),
            "tomorrow" => Ok(today() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

pub(crate) fn parse_filter(filter: Option<&str>) -> Result<StatusFilter> {
    match filter {
        None => Ok(StatusFilter::All),
        Some(f) => Ok(StatusFilter::parse(f)?),
    }
}

/// Schedule for a new tracker. Habits default to every day; events take no `--days`.
pub(crate) fn parse_schedule(days: Option<&str>, kind: TrackerKind) -> Result<Schedule> {
    match (kind, days) {
        (TrackerKind::IrregularEvent, Some(_)) => {
            bail!("Irregular events happen on any day; drop --days or --event")
        }
        (_, None) => Ok(Schedule::EVERY_DAY),
        (TrackerKind::Habit, Some(days)) => Ok(Schedule::parse(days)?),
    }
}

/// Resolves a tracker reference. An unknown tracker exits with status 2.
pub(crate) fn resolve(svc: &TrackerService, reference: &str, json: bool) -> Result<Tracker> {
    match svc.resolve_tracker(reference) {
        Ok(tracker) => Ok(tracker),
        Err(e) if e.is_not_found() => exit_not_found(&format!("Tracker '{reference}' not found"), json),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn short_id(tracker: &Tracker) -> String {
    tracker.id.to_string()[..8].to_string()
}

pub(crate) fn print_sections(sections: &[Section], completed: &dyn Fn(&Tracker) -> bool) {
    #[derive(Tabled)]
    struct TrackerRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "")]
        done: &'static str,
        #[tabled(rename = "Tracker")]
        name: String,
        #[tabled(rename = "Schedule")]
        schedule: String,
    }

    for section in sections {
        let rows: Vec<TrackerRow> = section
            .trackers
            .iter()
            .map(|t| TrackerRow {
                id: short_id(t),
                done: if completed(t) { "[x]" } else { "[ ]" },
                name: truncate(format!("{} {}", t.emoji, t.name).trim(), 35),
                schedule: t.effective_schedule().summary(),
            })
            .collect();

        let marker = if section.is_pinned { " *" } else { "" };
        println!("{}{marker}", section.title);
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
