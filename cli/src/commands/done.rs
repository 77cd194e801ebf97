use anyhow::Result;
use serde::Serialize;

use tally_core::TrackerService;
use tally_core::models::CompletionToggle;

use super::helpers::{parse_date, print_json, resolve, today};

#[derive(Serialize)]
struct DoneOutput<'a> {
    tracker: &'a str,
    date: String,
    #[serde(flatten)]
    toggle: CompletionToggle,
}

/// Toggles completion of a tracker for a day (today by default).
pub(crate) fn cmd_done(
    svc: &TrackerService,
    reference: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let tracker = resolve(svc, reference, json)?;
    let day = parse_date(date)?;
    let toggle = svc.toggle_completion(tracker.id, day, today())?;

    if json {
        return print_json(&DoneOutput {
            tracker: &tracker.name,
            date: day.format("%Y-%m-%d").to_string(),
            toggle,
        });
    }

    let verb = if toggle.completed {
        "Marked"
    } else {
        "Unmarked"
    };
    println!(
        "{verb} '{}' for {} ({} day(s) completed in total)",
        tracker.name,
        day.format("%Y-%m-%d"),
        toggle.total_completions
    );
    if toggle.completed && !tracker.is_due_on(day) {
        println!(
            "Note: '{}' is not scheduled on {}",
            tracker.name,
            day.format("%A")
        );
    }
    Ok(())
}
