//! Completion ledger: which (tracker, day) pairs are marked done.

use std::collections::{HashMap, HashSet};

use chrono::{Local, NaiveDate};
use rusqlite::{OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use crate::db::{Database, day_column, day_key, uuid_column};
use crate::error::{Entity, Error, Result};
use crate::feed::Change;
use crate::models::TrackerRecord;

pub struct Ledger<'a> {
    db: &'a Database,
}

impl<'a> Ledger<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn exists(&self, tracker_id: Uuid, day: NaiveDate) -> Result<bool> {
        let found = self
            .db
            .conn()
            .query_row(
                "SELECT 1 FROM records WHERE tracker_id = ?1 AND day = ?2",
                params![tracker_id.to_string(), day_key(day)],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Marks the tracker done on `day`. Returns `false` when it already was.
    pub fn add(&self, tracker_id: Uuid, day: NaiveDate) -> Result<bool> {
        let inserted = {
            let conn = self.db.conn();
            let known = conn
                .query_row(
                    "SELECT 1 FROM trackers WHERE id = ?1",
                    params![tracker_id.to_string()],
                    |_| Ok(()),
                )
                .optional()?;
            if known.is_none() {
                return Err(Error::not_found(Entity::Tracker, tracker_id));
            }
            conn.execute(
                "INSERT OR IGNORE INTO records (id, tracker_id, day, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    tracker_id.to_string(),
                    day_key(day),
                    Local::now().to_rfc3339(),
                ],
            )? > 0
        };

        debug!(%tracker_id, %day, inserted, "record add");
        if inserted {
            self.db.publish(Change::Records);
        }
        Ok(inserted)
    }

    /// Returns `false` when there was nothing to remove.
    pub fn remove(&self, tracker_id: Uuid, day: NaiveDate) -> Result<bool> {
        let rows = self.db.conn().execute(
            "DELETE FROM records WHERE tracker_id = ?1 AND day = ?2",
            params![tracker_id.to_string(), day_key(day)],
        )?;
        if rows > 0 {
            self.db.publish(Change::Records);
        }
        Ok(rows > 0)
    }

    pub fn count(&self, tracker_id: Uuid) -> Result<i64> {
        let count = self.db.conn().query_row(
            "SELECT COUNT(*) FROM records WHERE tracker_id = ?1",
            params![tracker_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn ids_completed_on(&self, day: NaiveDate) -> Result<HashSet<Uuid>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT tracker_id FROM records WHERE day = ?1")?;
        let ids = stmt
            .query_map(params![day_key(day)], |row| uuid_column(row, 0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Drops every record of the tracker and returns how many went.
    pub fn remove_all(&self, tracker_id: Uuid) -> Result<usize> {
        let rows = self.db.conn().execute(
            "DELETE FROM records WHERE tracker_id = ?1",
            params![tracker_id.to_string()],
        )?;
        if rows > 0 {
            self.db.publish(Change::Records);
        }
        Ok(rows)
    }

    pub fn records_for(&self, tracker_id: Uuid) -> Result<Vec<TrackerRecord>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tracker_id, day FROM records WHERE tracker_id = ?1 ORDER BY day",
        )?;
        let records = stmt
            .query_map(params![tracker_id.to_string()], |row| {
                Ok(TrackerRecord {
                    id: uuid_column(row, 0)?,
                    tracker_id: uuid_column(row, 1)?,
                    day: day_column(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Completed tracker ids per day for `from..=to`. Days without records are absent.
    pub fn completions_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HashMap<NaiveDate, HashSet<Uuid>>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT day, tracker_id FROM records WHERE day >= ?1 AND day <= ?2",
        )?;
        let mut by_day: HashMap<NaiveDate, HashSet<Uuid>> = HashMap::new();
        let rows = stmt.query_map(params![day_key(from), day_key(to)], |row| {
            Ok((day_column(row, 0)?, uuid_column(row, 1)?))
        })?;
        for row in rows {
            let (day, id) = row?;
            by_day.entry(day).or_default().insert(id);
        }
        Ok(by_day)
    }

    pub fn total_records(&self) -> Result<i64> {
        let total = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTracker, TrackerKind};
    use crate::schedule::Schedule;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let tracker = db
            .insert_tracker(&NewTracker {
                name: "Water".to_string(),
                color: "blue".to_string(),
                emoji: "💧".to_string(),
                schedule: Schedule::EVERY_DAY,
                kind: TrackerKind::Habit,
                category_title: None,
                is_pinned: false,
            })
            .unwrap();
        (db, tracker.id)
    }

    #[test]
    fn test_add_is_idempotent() {
        let (db, id) = setup();
        let day = date(2024, 6, 17);

        assert!(db.ledger().add(id, day).unwrap());
        assert!(!db.ledger().add(id, day).unwrap());

        assert_eq!(db.ledger().count(id).unwrap(), 1);
        assert!(db.ledger().exists(id, day).unwrap());
    }

    #[test]
    fn test_add_unknown_tracker_is_not_found() {
        let (db, _) = setup();
        let err = db.ledger().add(Uuid::new_v4(), date(2024, 6, 17)).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.ledger().total_records().unwrap(), 0);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let (db, id) = setup();
        let day = date(2024, 6, 17);
        assert!(!db.ledger().remove(id, day).unwrap());

        db.ledger().add(id, day).unwrap();
        assert!(db.ledger().remove(id, day).unwrap());
        assert!(!db.ledger().exists(id, day).unwrap());
    }

    #[test]
    fn test_ids_completed_on() {
        let (db, id) = setup();
        let day = date(2024, 6, 17);
        assert!(db.ledger().ids_completed_on(day).unwrap().is_empty());

        db.ledger().add(id, day).unwrap();
        let ids = db.ledger().ids_completed_on(day).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&id));
        assert!(db.ledger().ids_completed_on(date(2024, 6, 18)).unwrap().is_empty());
    }

    #[test]
    fn test_remove_all() {
        let (db, id) = setup();
        for d in 10..15 {
            db.ledger().add(id, date(2024, 6, d)).unwrap();
        }
        assert_eq!(db.ledger().remove_all(id).unwrap(), 5);
        assert_eq!(db.ledger().count(id).unwrap(), 0);
    }

    #[test]
    fn test_records_for_sorted_by_day() {
        let (db, id) = setup();
        db.ledger().add(id, date(2024, 6, 20)).unwrap();
        db.ledger().add(id, date(2024, 6, 3)).unwrap();

        let days: Vec<NaiveDate> = db
            .ledger()
            .records_for(id)
            .unwrap()
            .into_iter()
            .map(|r| r.day)
            .collect();
        assert_eq!(days, vec![date(2024, 6, 3), date(2024, 6, 20)]);
    }

    #[test]
    fn test_completions_between_is_inclusive() {
        let (db, id) = setup();
        for d in [1, 5, 9] {
            db.ledger().add(id, date(2024, 6, d)).unwrap();
        }
        let map = db
            .ledger()
            .completions_between(date(2024, 6, 1), date(2024, 6, 5))
            .unwrap();
        assert_eq!(map.len(), 2);
        assert!(map[&date(2024, 6, 1)].contains(&id));
        assert!(map[&date(2024, 6, 5)].contains(&id));
    }

    #[test]
    fn test_duplicate_add_does_not_publish() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (db, id) = setup();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        db.feed().subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let day = date(2024, 6, 17);
        db.ledger().add(id, day).unwrap();
        db.ledger().add(id, day).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
