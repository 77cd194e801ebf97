use std::fmt::Write;

use anyhow::Result;
use serde::Serialize;

use tally_core::TrackerService;
use tally_core::models::{Query, Section, StatusFilter};

use super::helpers::{parse_date, parse_filter, print_json, print_sections};

#[derive(Serialize)]
struct ListOutput<'a> {
    query: &'a Query,
    sections: &'a [Section],
}

pub(crate) fn cmd_list(
    svc: &mut TrackerService,
    date: Option<String>,
    filter: Option<&str>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let filter = parse_filter(filter)?;

    svc.set_date(date);
    svc.set_filter(filter);
    if let Some(search) = search {
        svc.set_search_text(search);
        svc.flush_search();
    }

    let query = svc.query();
    let sections = svc.sections();

    if json {
        return print_json(&ListOutput {
            query: &query,
            sections: &sections,
        });
    }

    render(svc, &query, &sections)
}

pub(crate) fn render(svc: &TrackerService, query: &Query, sections: &[Section]) -> Result<()> {
    println!("{}", heading(query));
    if let Some(error) = svc.view_error() {
        eprintln!("Warning: could not read trackers: {error}");
    }
    if sections.is_empty() {
        println!("{}", empty_message(query));
        return Ok(());
    }

    let done = svc.database().ledger().ids_completed_on(query.selected_date)?;
    print_sections(sections, &|t| done.contains(&t.id));
    Ok(())
}

fn heading(query: &Query) -> String {
    let mut heading = format!(
        "{} ({})",
        query.selected_date.format("%A, %Y-%m-%d"),
        query.status_filter.as_str()
    );
    if !query.search_text.is_empty() {
        let _ = write!(heading, " matching '{}'", query.search_text);
    }
    heading
}

fn empty_message(query: &Query) -> &'static str {
    if !query.search_text.is_empty() {
        return "Nothing found.";
    }
    match query.status_filter {
        StatusFilter::All | StatusFilter::DueToday => "Nothing to track on this day.",
        StatusFilter::Completed => "Nothing completed on this day yet.",
        StatusFilter::NotCompleted => "Everything is done for this day.",
    }
}
