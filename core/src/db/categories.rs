use chrono::Local;
use rusqlite::{OptionalExtension, params};
use tracing::info;

use super::{Database, TRACKER_COLUMNS};
use crate::error::{Entity, Error, Result};
use crate::feed::Change;
use crate::models::{Tracker, TrackerCategory, normalize_name};

impl Database {
    // --- Categories ---

    pub fn create_category(&self, title: &str) -> Result<TrackerCategory> {
        let title = normalize_name("title", title)?;
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO categories (title, created_at) VALUES (?1, ?2)",
            params![title, Local::now().to_rfc3339()],
        )?;
        if rows == 0 {
            return Err(Error::conflict(Entity::Category, &title));
        }

        info!(%title, "category created");
        self.publish(Change::Categories);
        Ok(TrackerCategory {
            title,
            trackers: Vec::new(),
        })
    }

    pub fn category_exists(&self, title: &str) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM categories WHERE title = ?1",
                params![title],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Removes the category. Its trackers stay and lose their category.
    pub fn delete_category(&self, title: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM categories WHERE title = ?1", params![title])?;
        if rows == 0 {
            return Err(Error::not_found(Entity::Category, title));
        }

        info!(%title, "category deleted");
        self.publish(Change::Categories);
        Ok(())
    }

    /// Every category sorted by title, each with its trackers sorted by name.
    pub fn fetch_all_categories(&self) -> Result<Vec<TrackerCategory>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT title FROM categories ORDER BY title COLLATE NOCASE, title")?;
        let mut categories: Vec<TrackerCategory> = stmt
            .query_map([], |row| {
                Ok(TrackerCategory {
                    title: row.get(0)?,
                    trackers: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {TRACKER_COLUMNS} FROM trackers
             WHERE category_title IS NOT NULL
             ORDER BY name COLLATE NOCASE, id"
        ))?;
        let trackers: Vec<Tracker> = stmt
            .query_map([], Self::tracker_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for tracker in trackers {
            if let Some(category) = categories
                .iter_mut()
                .find(|c| Some(c.title.as_str()) == tracker.category_title.as_deref())
            {
                category.trackers.push(tracker);
            }
        }
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTracker, TrackerKind};
    use crate::schedule::Schedule;

    fn habit(name: &str, category: Option<&str>) -> NewTracker {
        NewTracker {
            name: name.to_string(),
            color: "green".to_string(),
            emoji: "🧘".to_string(),
            schedule: Schedule::EVERY_DAY,
            kind: TrackerKind::Habit,
            category_title: category.map(str::to_string),
            is_pinned: false,
        }
    }

    #[test]
    fn test_create_category_and_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let category = db.create_category("  Health ").unwrap();
        assert_eq!(category.title, "Health");
        assert!(category.trackers.is_empty());

        let err = db.create_category("Health").unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_create_category_rejects_blank_title() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.create_category("  ").unwrap_err(),
            Error::Invalid { field: "title", .. }
        ));
    }

    #[test]
    fn test_fetch_all_categories_groups_trackers() {
        let db = Database::open_in_memory().unwrap();
        db.create_category("work").unwrap();
        db.insert_tracker(&habit("Yoga", Some("Health"))).unwrap();
        db.insert_tracker(&habit("Water", Some("Health"))).unwrap();
        db.insert_tracker(&habit("Loose", None)).unwrap();

        let categories = db.fetch_all_categories().unwrap();
        let titles: Vec<&str> = categories.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Health", "work"]);

        let names: Vec<&str> = categories[0]
            .trackers
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Water", "Yoga"]);
        assert!(categories[1].trackers.is_empty());
    }

    #[test]
    fn test_delete_category_orphans_trackers() {
        let db = Database::open_in_memory().unwrap();
        let tracker = db.insert_tracker(&habit("Yoga", Some("Health"))).unwrap();

        db.delete_category("Health").unwrap();

        assert!(!db.category_exists("Health").unwrap());
        let orphan = db.get_tracker(tracker.id).unwrap();
        assert!(orphan.category_title.is_none());
        assert!(db.delete_category("Health").unwrap_err().is_not_found());
    }
}
