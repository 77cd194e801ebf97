use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Tracker, TrackerCategory};

/// Read side the visibility engine recomputes from.
///
/// Implementations must be cheap to call repeatedly: the engine re-reads
/// everything on every change instead of diffing.
pub trait TrackerStore: Send + Sync {
    fn fetch_all_trackers(&self) -> Result<Vec<Tracker>>;
    fn fetch_all_categories(&self) -> Result<Vec<TrackerCategory>>;
    fn ids_completed_on(&self, day: NaiveDate) -> Result<HashSet<Uuid>>;
}

impl TrackerStore for Database {
    fn fetch_all_trackers(&self) -> Result<Vec<Tracker>> {
        Database::fetch_all_trackers(self)
    }

    fn fetch_all_categories(&self) -> Result<Vec<TrackerCategory>> {
        Database::fetch_all_categories(self)
    }

    fn ids_completed_on(&self, day: NaiveDate) -> Result<HashSet<Uuid>> {
        self.ledger().ids_completed_on(day)
    }
}
