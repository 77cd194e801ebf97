mod categories;
mod settings;
mod trackers;

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use rusqlite::types::Type;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::feed::{Change, ChangeFeed};
use crate::ledger::Ledger;
use crate::models::{Tracker, TrackerKind};
use crate::schedule::Schedule;

/// Column list matching [`Database::tracker_from_row`].
pub(crate) const TRACKER_COLUMNS: &str =
    "id, name, color, emoji, schedule, kind, category_title, is_pinned";

pub struct Database {
    conn: Mutex<Connection>,
    feed: Arc<ChangeFeed>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening tracker database");
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database {
            conn: Mutex::new(conn),
            feed: Arc::new(ChangeFeed::new()),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS categories (
                    title TEXT PRIMARY KEY NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS trackers (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    color TEXT NOT NULL,
                    emoji TEXT NOT NULL,
                    schedule INTEGER NOT NULL,
                    kind TEXT NOT NULL DEFAULT 'habit',
                    category_title TEXT REFERENCES categories(title) ON DELETE SET NULL,
                    is_pinned INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS records (
                    id TEXT PRIMARY KEY NOT NULL,
                    tracker_id TEXT NOT NULL REFERENCES trackers(id) ON DELETE CASCADE,
                    day TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE (tracker_id, day)
                );

                CREATE INDEX IF NOT EXISTS idx_records_day ON records(day);
                CREATE INDEX IF NOT EXISTS idx_trackers_category ON trackers(category_title);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Must be called with the connection lock released.
    pub(crate) fn publish(&self, change: Change) {
        self.feed.publish(change);
    }

    /// The change stream every successful mutation is published on.
    #[must_use]
    pub fn feed(&self) -> Arc<ChangeFeed> {
        Arc::clone(&self.feed)
    }

    #[must_use]
    pub fn ledger(&self) -> Ledger<'_> {
        Ledger::new(self)
    }

    // --- Row mapping helpers ---

    pub(crate) fn tracker_from_row(row: &rusqlite::Row) -> rusqlite::Result<Tracker> {
        let schedule: i64 = row.get(4)?;
        let kind: String = row.get(5)?;
        Ok(Tracker {
            id: uuid_column(row, 0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            emoji: row.get(3)?,
            schedule: Schedule::from_bits(u8::try_from(schedule & 0x7F).unwrap_or_default()),
            kind: TrackerKind::from_db(&kind),
            category_title: row.get(6)?,
            is_pinned: row.get(7)?,
        })
    }
}

pub(crate) fn uuid_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn day_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_set_user_version() {
        let db = Database::open_in_memory().unwrap();
        let version: i64 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .conn()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_open_on_disk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        drop(Database::open(&path).unwrap());
        let db = Database::open(&path).unwrap();
        assert!(db.fetch_all_trackers().unwrap().is_empty());
    }

    #[test]
    fn test_day_key_format() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(day_key(day), "2024-01-05");
    }

    #[test]
    fn test_corrupt_uuid_surfaces_as_storage_error() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO trackers (id, name, color, emoji, schedule, kind, is_pinned, created_at, updated_at)
                 VALUES ('not-a-uuid', 'Broken', 'red', 'x', 127, 'habit', 0, '', '')",
                [],
            )
            .unwrap();
        let err = db.fetch_all_trackers().unwrap_err();
        assert!(err.is_storage());
    }
}
