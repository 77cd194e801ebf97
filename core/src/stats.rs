//! Summary numbers for the stats view, computed over a fixed lookback window.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Tracker, TrackerStats};

pub const LOOKBACK_DAYS: i64 = 30;

pub type Completions = HashMap<NaiveDate, HashSet<Uuid>>;

/// Days of the lookback window, newest first.
fn window(today: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    (0..LOOKBACK_DAYS).map(move |offset| today - Duration::days(offset))
}

fn completed(completions: &Completions, day: NaiveDate, id: Uuid) -> bool {
    completions.get(&day).is_some_and(|ids| ids.contains(&id))
}

/// Longest run of completed scheduled days for any one tracker. Days the
/// tracker is not scheduled on are skipped and do not break a run.
#[must_use]
pub fn best_streak(trackers: &[Tracker], completions: &Completions, today: NaiveDate) -> i64 {
    trackers
        .iter()
        .map(|tracker| {
            let mut current = 0;
            let mut best = 0;
            for day in window(today).filter(|day| tracker.is_due_on(*day)) {
                if completed(completions, day, tracker.id) {
                    current += 1;
                    best = best.max(current);
                } else {
                    current = 0;
                }
            }
            best
        })
        .max()
        .unwrap_or(0)
}

/// Days where something was scheduled and everything scheduled was completed.
#[must_use]
pub fn perfect_days(trackers: &[Tracker], completions: &Completions, today: NaiveDate) -> i64 {
    let count = window(today)
        .filter(|day| {
            let mut due = trackers.iter().filter(|t| t.is_due_on(*day)).peekable();
            due.peek().is_some() && due.all(|t| completed(completions, *day, t.id))
        })
        .count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Records per tracker, rounded half up. Zero without trackers.
#[must_use]
pub fn average_completions(total_records: i64, tracker_count: usize) -> i64 {
    let Ok(n) = i64::try_from(tracker_count) else {
        return 0;
    };
    if n == 0 || total_records <= 0 {
        return 0;
    }
    (total_records * 2 + n) / (2 * n)
}

pub fn compute(db: &Database, today: NaiveDate) -> Result<TrackerStats> {
    let trackers = db.fetch_all_trackers()?;
    let ledger = db.ledger();
    let from = today - Duration::days(LOOKBACK_DAYS - 1);
    let completions = ledger.completions_between(from, today)?;
    let completed_today = completions.get(&today).map_or(0, HashSet::len);

    Ok(TrackerStats {
        best_streak: best_streak(&trackers, &completions, today),
        perfect_days: perfect_days(&trackers, &completions, today),
        completed_today: i64::try_from(completed_today).unwrap_or(i64::MAX),
        average_completions: average_completions(ledger.total_records()?, trackers.len()),
    })
}
