use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::TrackerService;
use tally_core::stats::LOOKBACK_DAYS;

use super::helpers::{print_json, today};

pub(crate) fn cmd_stats(svc: &TrackerService, json: bool) -> Result<()> {
    let stats = svc.stats(today())?;

    if json {
        return print_json(&stats);
    }
    if svc.list_trackers()?.is_empty() {
        println!("No trackers yet. Add one with: tally add <name>");
        return Ok(());
    }

    #[derive(Tabled)]
    struct StatRow {
        #[tabled(rename = "Stat")]
        label: String,
        #[tabled(rename = "Value")]
        value: i64,
    }

    let rows = vec![
        StatRow {
            label: format!("Best streak (last {LOOKBACK_DAYS} days)"),
            value: stats.best_streak,
        },
        StatRow {
            label: format!("Perfect days (last {LOOKBACK_DAYS} days)"),
            value: stats.perfect_days,
        },
        StatRow {
            label: "Completed today".to_string(),
            value: stats.completed_today,
        },
        StatRow {
            label: "Average completions per tracker".to_string(),
            value: stats.average_completions,
        },
    ];

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
