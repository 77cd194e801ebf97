use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use tracing::info;
use uuid::Uuid;

use crate::db::Database;
use crate::engine::{ListenerId, VisibilityEngine};
use crate::error::{Entity, Error, Result};
use crate::models::{
    CompletionToggle, NewTracker, Query, Section, StatusFilter, Tracker, TrackerCard,
    TrackerCategory, TrackerStats, UpdateTracker,
};
use crate::notifier::ChangeNotifier;
use crate::settings::{self, EngineConfig};
use crate::stats;
use crate::store::TrackerStore;

/// Shortest id prefix accepted when resolving a tracker reference.
const MIN_ID_PREFIX: usize = 4;

/// Front door for hosts: persistence, the live sectioned view, and stats.
pub struct TrackerService {
    db: Arc<Database>,
    notifier: ChangeNotifier,
}

impl TrackerService {
    pub fn open(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Self::with_database(Arc::new(db), Local::now().date_naive())
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Self::with_database(Arc::new(db), Local::now().date_naive())
    }

    /// Builds the service with the view initially showing `selected_date`.
    pub fn with_database(db: Arc<Database>, selected_date: NaiveDate) -> Result<Self> {
        let config = EngineConfig::from_settings(&db)?;
        let store: Arc<dyn TrackerStore> = Arc::clone(&db) as Arc<dyn TrackerStore>;
        let engine = VisibilityEngine::new(store, Query::for_date(selected_date), config);
        let notifier = ChangeNotifier::attach(
            Arc::new(parking_lot::Mutex::new(engine)),
            db.feed(),
            config.search_debounce,
        );
        Ok(Self { db, notifier })
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Categories ---

    pub fn create_category(&self, title: &str) -> Result<TrackerCategory> {
        self.db.create_category(title)
    }

    pub fn delete_category(&self, title: &str) -> Result<()> {
        self.db.delete_category(title)
    }

    pub fn list_categories(&self) -> Result<Vec<TrackerCategory>> {
        self.db.fetch_all_categories()
    }

    // --- Trackers ---

    pub fn create_tracker(&self, new: &NewTracker) -> Result<Tracker> {
        self.db.insert_tracker(new)
    }

    pub fn update_tracker(&self, id: Uuid, update: &UpdateTracker) -> Result<Tracker> {
        self.db.update_tracker(id, update)
    }

    pub fn pin(&self, id: Uuid) -> Result<Tracker> {
        self.db.set_tracker_pinned(id, true)
    }

    pub fn unpin(&self, id: Uuid) -> Result<Tracker> {
        self.db.set_tracker_pinned(id, false)
    }

    pub fn delete_tracker(&self, id: Uuid) -> Result<()> {
        self.db.delete_tracker(id)
    }

    pub fn get_tracker(&self, id: Uuid) -> Result<Tracker> {
        self.db.get_tracker(id)
    }

    pub fn list_trackers(&self) -> Result<Vec<Tracker>> {
        self.db.fetch_all_trackers()
    }

    /// Finds a tracker by full id, unique id prefix, or exact name ignoring case.
    pub fn resolve_tracker(&self, reference: &str) -> Result<Tracker> {
        let reference = reference.trim();
        if let Ok(id) = Uuid::parse_str(reference) {
            return self.db.get_tracker(id);
        }

        let trackers = self.db.fetch_all_trackers()?;
        let wanted = reference.to_lowercase();

        let by_name: Vec<&Tracker> = trackers
            .iter()
            .filter(|t| t.name.to_lowercase() == wanted)
            .collect();
        match by_name.as_slice() {
            [one] => return Ok((*one).clone()),
            [] => {}
            _ => {
                return Err(Error::invalid(
                    "tracker",
                    format!("'{reference}' matches several trackers by name; use the id"),
                ));
            }
        }

        if reference.len() >= MIN_ID_PREFIX {
            let by_prefix: Vec<&Tracker> = trackers
                .iter()
                .filter(|t| t.id.to_string().starts_with(&wanted))
                .collect();
            match by_prefix.as_slice() {
                [one] => return Ok((*one).clone()),
                [] => {}
                _ => {
                    return Err(Error::invalid(
                        "tracker",
                        format!("id prefix '{reference}' is ambiguous"),
                    ));
                }
            }
        }

        Err(Error::not_found(Entity::Tracker, reference))
    }

    // --- Completion ---

    /// Marks the tracker done on `day`, or clears it if it already was.
    /// Days after `today` are rejected.
    pub fn toggle_completion(
        &self,
        id: Uuid,
        day: NaiveDate,
        today: NaiveDate,
    ) -> Result<CompletionToggle> {
        if day > today {
            return Err(Error::invalid(
                "date",
                format!("{day} is in the future; completions can only be recorded up to {today}"),
            ));
        }

        let tracker = self.db.get_tracker(id)?;
        let ledger = self.db.ledger();
        let completed = if ledger.exists(id, day)? {
            ledger.remove(id, day)?;
            false
        } else {
            ledger.add(id, day)?;
            true
        };

        info!(tracker = %tracker.name, %day, completed, "completion toggled");
        Ok(CompletionToggle {
            completed,
            total_completions: ledger.count(id)?,
        })
    }

    pub fn tracker_card(&self, id: Uuid, day: NaiveDate) -> Result<TrackerCard> {
        let tracker = self.db.get_tracker(id)?;
        let ledger = self.db.ledger();
        Ok(TrackerCard {
            id: tracker.id,
            schedule: tracker.effective_schedule().summary(),
            completed_on_day: ledger.exists(id, day)?,
            total_completions: ledger.count(id)?,
            name: tracker.name,
            emoji: tracker.emoji,
            color: tracker.color,
        })
    }

    // --- Live view ---

    #[must_use]
    pub fn sections(&self) -> Vec<Section> {
        self.notifier.sections()
    }

    #[must_use]
    pub fn query(&self) -> Query {
        self.notifier.query()
    }

    pub fn set_date(&mut self, date: NaiveDate) -> bool {
        self.notifier.set_date(date)
    }

    pub fn set_filter(&mut self, filter: StatusFilter) -> bool {
        self.notifier.set_filter(filter)
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) -> bool {
        self.notifier.set_search_text(text)
    }

    pub fn set_search_text_at(&mut self, text: impl Into<String>, now: Instant) -> bool {
        self.notifier.set_search_text_at(text, now)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.notifier.next_deadline()
    }

    pub fn poll_at(&mut self, now: Instant) -> bool {
        self.notifier.poll_at(now)
    }

    pub fn flush_search(&mut self) -> bool {
        self.notifier.flush()
    }

    /// Registers a listener that receives the sections whenever they change.
    /// It runs while the engine is locked and must not call back into the service.
    pub fn subscribe_sections<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&[Section]) + Send + 'static,
    {
        self.notifier.engine().lock().subscribe(listener)
    }

    pub fn unsubscribe_sections(&self, id: ListenerId) -> bool {
        self.notifier.engine().lock().unsubscribe(id)
    }

    /// The storage failure that emptied the current view, if any.
    #[must_use]
    pub fn view_error(&self) -> Option<String> {
        self.notifier
            .engine()
            .lock()
            .last_error()
            .map(ToString::to_string)
    }

    // --- Stats ---

    pub fn stats(&self, today: NaiveDate) -> Result<TrackerStats> {
        stats::compute(&self.db, today)
    }

    // --- Settings ---

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.db.get_setting(key)
    }

    pub fn list_settings(&self) -> Result<Vec<(String, String)>> {
        self.db.list_settings()
    }

    /// Validates, stores, and applies an engine setting.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<String> {
        let value = settings::validate_setting(key, value)?;
        self.db.set_setting(key, &value)?;
        self.reload_config()?;
        Ok(value)
    }

    pub fn reset_setting(&mut self, key: &str) -> Result<bool> {
        let removed = self.db.delete_setting(key)?;
        self.reload_config()?;
        Ok(removed)
    }

    fn reload_config(&mut self) -> Result<()> {
        let config = EngineConfig::from_settings(&self.db)?;
        self.notifier.set_debounce(config.search_debounce);
        self.notifier.engine().lock().set_config(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PINNED_SECTION_TITLE, TrackerKind, UNCATEGORIZED_TITLE};
    use crate::schedule::Schedule;
    use chrono::{Duration, Weekday};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // 2024-06-17 is a Monday
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 17).unwrap()
    }

    fn service() -> TrackerService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        TrackerService::with_database(db, monday()).unwrap()
    }

    fn water(pinned: bool) -> NewTracker {
        NewTracker {
            name: "Water".to_string(),
            color: "blue".to_string(),
            emoji: "💧".to_string(),
            schedule: [Weekday::Mon, Weekday::Wed, Weekday::Fri].into_iter().collect(),
            kind: TrackerKind::Habit,
            category_title: Some("Health".to_string()),
            is_pinned: pinned,
        }
    }

    fn yoga() -> NewTracker {
        NewTracker {
            name: "Yoga".to_string(),
            emoji: "🧘".to_string(),
            schedule: Schedule::EVERY_DAY,
            ..water(false)
        }
    }

    fn titles(svc: &TrackerService) -> Vec<(String, Vec<String>)> {
        svc.sections()
            .into_iter()
            .map(|s| (s.title, s.trackers.into_iter().map(|t| t.name).collect()))
            .collect()
    }

    #[test]
    fn test_water_due_monday_hidden_tuesday() {
        let mut svc = service();
        svc.create_tracker(&water(false)).unwrap();

        assert_eq!(
            titles(&svc),
            vec![("Health".to_string(), vec!["Water".to_string()])]
        );

        svc.set_date(monday() + Duration::days(1));
        assert!(svc.sections().is_empty());
    }

    #[test]
    fn test_pinned_water_only_in_pinned_section() {
        let svc = service();
        svc.create_tracker(&water(true)).unwrap();
        svc.create_tracker(&yoga()).unwrap();

        assert_eq!(
            titles(&svc),
            vec![
                (PINNED_SECTION_TITLE.to_string(), vec!["Water".to_string()]),
                ("Health".to_string(), vec!["Yoga".to_string()]),
            ]
        );
    }

    #[test]
    fn test_search_debounced_through_service() {
        let mut svc = service();
        svc.create_tracker(&water(false)).unwrap();
        svc.create_tracker(&yoga()).unwrap();

        let start = Instant::now();
        svc.set_search_text_at("wat", start);
        assert_eq!(svc.sections()[0].trackers.len(), 2);
        let deadline = svc.next_deadline().unwrap();

        assert!(svc.poll_at(deadline));
        assert_eq!(
            titles(&svc),
            vec![("Health".to_string(), vec!["Water".to_string()])]
        );
    }

    #[test]
    fn test_delete_tracker_cascades_completions() {
        let svc = service();
        let tracker = svc.create_tracker(&water(false)).unwrap();
        let days = [monday(), monday() - Duration::days(3)];
        for day in days {
            svc.toggle_completion(tracker.id, day, monday()).unwrap();
        }

        svc.delete_tracker(tracker.id).unwrap();

        let ledger = svc.database().ledger();
        assert_eq!(ledger.count(tracker.id).unwrap(), 0);
        for day in days {
            assert!(!ledger.exists(tracker.id, day).unwrap());
        }
        assert!(svc.sections().is_empty());
    }

    #[test]
    fn test_toggle_completion() {
        let svc = service();
        let tracker = svc.create_tracker(&water(false)).unwrap();

        let first = svc.toggle_completion(tracker.id, monday(), monday()).unwrap();
        assert_eq!(
            first,
            CompletionToggle {
                completed: true,
                total_completions: 1
            }
        );
        let second = svc.toggle_completion(tracker.id, monday(), monday()).unwrap();
        assert!(!second.completed);
        assert_eq!(second.total_completions, 0);
    }

    #[test]
    fn test_toggle_rejects_future_and_unknown() {
        let svc = service();
        let tracker = svc.create_tracker(&water(false)).unwrap();

        let err = svc
            .toggle_completion(tracker.id, monday() + Duration::days(1), monday())
            .unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "date", .. }));

        let err = svc
            .toggle_completion(Uuid::new_v4(), monday(), monday())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_completed_filter_follows_toggles() {
        let mut svc = service();
        let tracker = svc.create_tracker(&water(false)).unwrap();
        svc.create_tracker(&yoga()).unwrap();

        svc.set_filter(StatusFilter::Completed);
        assert!(svc.sections().is_empty());

        svc.toggle_completion(tracker.id, monday(), monday()).unwrap();
        assert_eq!(
            titles(&svc),
            vec![("Health".to_string(), vec!["Water".to_string()])]
        );

        svc.set_filter(StatusFilter::NotCompleted);
        assert_eq!(
            titles(&svc),
            vec![("Health".to_string(), vec!["Yoga".to_string()])]
        );
    }

    #[test]
    fn test_tracker_card() {
        let svc = service();
        let tracker = svc.create_tracker(&water(false)).unwrap();
        svc.toggle_completion(tracker.id, monday(), monday()).unwrap();

        let card = svc.tracker_card(tracker.id, monday()).unwrap();
        assert_eq!(card.name, "Water");
        assert_eq!(card.schedule, "Mon, Wed, Fri");
        assert!(card.completed_on_day);
        assert_eq!(card.total_completions, 1);

        let card = svc.tracker_card(tracker.id, monday() - Duration::days(1)).unwrap();
        assert!(!card.completed_on_day);
    }

    #[test]
    fn test_resolve_tracker() {
        let svc = service();
        let tracker = svc.create_tracker(&water(false)).unwrap();

        assert_eq!(svc.resolve_tracker("water").unwrap().id, tracker.id);
        assert_eq!(
            svc.resolve_tracker(&tracker.id.to_string()).unwrap().id,
            tracker.id
        );
        let prefix = &tracker.id.to_string()[..8];
        assert_eq!(svc.resolve_tracker(prefix).unwrap().id, tracker.id);
        assert!(svc.resolve_tracker("nothing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_resolve_tracker_ambiguous_name() {
        let svc = service();
        svc.create_tracker(&water(false)).unwrap();
        svc.create_tracker(&water(false)).unwrap();
        assert!(matches!(
            svc.resolve_tracker("Water").unwrap_err(),
            Error::Invalid { field: "tracker", .. }
        ));
    }

    #[test]
    fn test_deleting_category_moves_trackers_to_uncategorized() {
        let svc = service();
        svc.create_tracker(&water(false)).unwrap();
        svc.delete_category("Health").unwrap();

        assert_eq!(
            titles(&svc),
            vec![(UNCATEGORIZED_TITLE.to_string(), vec!["Water".to_string()])]
        );
    }

    #[test]
    fn test_pin_unpin_moves_between_sections() {
        let svc = service();
        let tracker = svc.create_tracker(&water(false)).unwrap();

        svc.pin(tracker.id).unwrap();
        assert_eq!(svc.sections()[0].title, PINNED_SECTION_TITLE);
        svc.unpin(tracker.id).unwrap();
        assert_eq!(svc.sections()[0].title, "Health");
        assert!(svc.pin(Uuid::new_v4()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_section_listener_fires_on_change() {
        let svc = service();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = svc.subscribe_sections(move |sections| {
            assert!(!sections.is_empty());
            counter.fetch_add(1, Ordering::SeqCst);
        });

        svc.create_tracker(&water(false)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(svc.unsubscribe_sections(id));
        svc.create_tracker(&yoga()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_setting_changes_apply_to_view() {
        let mut svc = service();
        svc.create_tracker(&water(false)).unwrap();
        svc.set_date(monday() + Duration::days(1));
        svc.set_filter(StatusFilter::NotCompleted);
        assert_eq!(svc.sections().len(), 1);

        svc.set_setting(settings::STATUS_FILTERS_USE_SCHEDULE, "true")
            .unwrap();
        assert!(svc.sections().is_empty());

        svc.set_setting(settings::SEARCH_DEBOUNCE_MS, "0").unwrap();
        svc.reset_setting(settings::STATUS_FILTERS_USE_SCHEDULE)
            .unwrap();
        assert_eq!(svc.sections().len(), 1);

        assert!(svc.set_search_text("zzz"));
        assert!(svc.sections().is_empty());
    }

    #[test]
    fn test_set_setting_rejects_unknown_key() {
        let mut svc = service();
        assert!(svc.set_setting("theme", "dark").is_err());
        assert_eq!(svc.get_setting("theme").unwrap(), None);
    }
}
