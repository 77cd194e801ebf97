use std::time::Instant;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use tally_core::TrackerService;

use super::helpers::{parse_date, parse_filter, today};
use super::list::render;

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Render,
    Wait,
    Quit,
}

const HELP: &str = "Type to search. Commands: :date <day>, :filter <all|due-today|completed|not-completed>, :done <tracker>, :q";

/// Interactive view. Each input line replaces the search text, which is
/// applied once typing pauses for the configured debounce window.
pub(crate) async fn cmd_browse(
    svc: &mut TrackerService,
    date: Option<String>,
    filter: Option<&str>,
) -> Result<()> {
    svc.set_date(parse_date(date)?);
    svc.set_filter(parse_filter(filter)?);

    eprintln!("{HELP}");
    show(svc)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let deadline = svc.next_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_line(svc, &line) {
                    Ok(Action::Render) => show(svc)?,
                    Ok(Action::Wait) => {}
                    Ok(Action::Quit) => break,
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            () = wait_until(deadline) => {
                svc.poll_at(Instant::now());
                show(svc)?;
            }
        }
    }
    Ok(())
}

fn handle_line(svc: &mut TrackerService, line: &str) -> Result<Action> {
    let Some(command) = line.strip_prefix(':') else {
        svc.set_search_text(line);
        return Ok(if svc.next_deadline().is_some() {
            Action::Wait
        } else {
            Action::Render
        });
    };

    let (name, arg) = command
        .trim()
        .split_once(char::is_whitespace)
        .map_or((command.trim(), ""), |(n, a)| (n, a.trim()));
    match name {
        "q" | "quit" => Ok(Action::Quit),
        "date" => {
            let date = (!arg.is_empty()).then(|| arg.to_string());
            svc.set_date(parse_date(date)?);
            Ok(Action::Render)
        }
        "filter" => {
            svc.set_filter(parse_filter(Some(arg))?);
            Ok(Action::Render)
        }
        "done" => {
            let tracker = svc.resolve_tracker(arg)?;
            let day = svc.query().selected_date;
            svc.toggle_completion(tracker.id, day, today())?;
            Ok(Action::Render)
        }
        _ => {
            eprintln!("{HELP}");
            Ok(Action::Wait)
        }
    }
}

fn show(svc: &TrackerService) -> Result<()> {
    println!();
    render(svc, &svc.query(), &svc.sections())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}
