use chrono::Local;
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::info;
use uuid::Uuid;

use super::{Database, TRACKER_COLUMNS};
use crate::error::{Entity, Error, Result};
use crate::feed::Change;
use crate::models::{
    NewTracker, Tracker, UpdateTracker, normalize_category, normalize_name, validate_schedule,
};

impl Database {
    // --- Trackers ---

    /// Creates the tracker, creating its category first if the title is new.
    pub fn insert_tracker(&self, new: &NewTracker) -> Result<Tracker> {
        let tracker = Tracker {
            id: Uuid::new_v4(),
            name: normalize_name("name", &new.name)?,
            color: new.color.trim().to_string(),
            emoji: new.emoji.trim().to_string(),
            schedule: validate_schedule(new.kind, new.schedule)?,
            kind: new.kind,
            category_title: normalize_category(new.category_title.as_deref()),
            is_pinned: new.is_pinned,
        };

        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            let now = Local::now().to_rfc3339();
            if let Some(title) = &tracker.category_title {
                ensure_category(&tx, title, &now)?;
            }
            tx.execute(
                "INSERT INTO trackers (id, name, color, emoji, schedule, kind, category_title, is_pinned, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    tracker.id.to_string(),
                    tracker.name,
                    tracker.color,
                    tracker.emoji,
                    tracker.schedule.bits(),
                    tracker.kind.as_str(),
                    tracker.category_title,
                    tracker.is_pinned,
                    now,
                    now,
                ],
            )?;
            tx.commit()?;
        }

        info!(id = %tracker.id, name = %tracker.name, "tracker created");
        self.publish(Change::Trackers);
        Ok(tracker)
    }

    pub fn find_tracker(&self, id: Uuid) -> Result<Option<Tracker>> {
        let conn = self.conn();
        let tracker = conn
            .query_row(
                &format!("SELECT {TRACKER_COLUMNS} FROM trackers WHERE id = ?1"),
                params![id.to_string()],
                Self::tracker_from_row,
            )
            .optional()?;
        Ok(tracker)
    }

    pub fn get_tracker(&self, id: Uuid) -> Result<Tracker> {
        self.find_tracker(id)?
            .ok_or_else(|| Error::not_found(Entity::Tracker, id))
    }

    pub fn fetch_all_trackers(&self) -> Result<Vec<Tracker>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACKER_COLUMNS} FROM trackers ORDER BY name COLLATE NOCASE, id"
        ))?;
        let trackers = stmt
            .query_map([], Self::tracker_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trackers)
    }

    /// Trackers whose name contains `query`, ignoring ASCII case.
    pub fn search_trackers(&self, query: &str) -> Result<Vec<Tracker>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACKER_COLUMNS} FROM trackers WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name COLLATE NOCASE, id"
        ))?;
        let trackers = stmt
            .query_map(params![pattern], Self::tracker_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trackers)
    }

    pub fn update_tracker(&self, id: Uuid, update: &UpdateTracker) -> Result<Tracker> {
        let mut tracker = self.get_tracker(id)?;
        if update.is_empty() {
            return Ok(tracker);
        }

        if let Some(name) = &update.name {
            tracker.name = normalize_name("name", name)?;
        }
        if let Some(color) = &update.color {
            tracker.color = color.trim().to_string();
        }
        if let Some(emoji) = &update.emoji {
            tracker.emoji = emoji.trim().to_string();
        }
        if let Some(schedule) = update.schedule {
            tracker.schedule = validate_schedule(tracker.kind, schedule)?;
        }
        if let Some(category) = &update.category_title {
            tracker.category_title = normalize_category(category.as_deref());
        }
        if let Some(pinned) = update.is_pinned {
            tracker.is_pinned = pinned;
        }

        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            let now = Local::now().to_rfc3339();
            if let Some(title) = &tracker.category_title {
                ensure_category(&tx, title, &now)?;
            }
            let rows = tx.execute(
                "UPDATE trackers
                 SET name = ?1, color = ?2, emoji = ?3, schedule = ?4, category_title = ?5,
                     is_pinned = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    tracker.name,
                    tracker.color,
                    tracker.emoji,
                    tracker.schedule.bits(),
                    tracker.category_title,
                    tracker.is_pinned,
                    now,
                    id.to_string(),
                ],
            )?;
            if rows == 0 {
                return Err(Error::not_found(Entity::Tracker, id));
            }
            tx.commit()?;
        }

        self.publish(Change::Trackers);
        Ok(tracker)
    }

    pub fn set_tracker_pinned(&self, id: Uuid, pinned: bool) -> Result<Tracker> {
        self.update_tracker(
            id,
            &UpdateTracker {
                is_pinned: Some(pinned),
                ..UpdateTracker::default()
            },
        )
    }

    /// Deletes the tracker together with every completion record it owns.
    pub fn delete_tracker(&self, id: Uuid) -> Result<()> {
        let removed_records = {
            let mut conn = self.conn();
            let tx = conn.transaction()?;
            let removed_records = tx.execute(
                "DELETE FROM records WHERE tracker_id = ?1",
                params![id.to_string()],
            )?;
            let rows = tx.execute(
                "DELETE FROM trackers WHERE id = ?1",
                params![id.to_string()],
            )?;
            if rows == 0 {
                return Err(Error::not_found(Entity::Tracker, id));
            }
            tx.commit()?;
            removed_records
        };

        info!(%id, removed_records, "tracker deleted");
        self.publish(Change::Trackers);
        Ok(())
    }
}

pub(super) fn ensure_category(tx: &Transaction, title: &str, now: &str) -> Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO categories (title, created_at) VALUES (?1, ?2)",
        params![title, now],
    )?;
    Ok(())
}
