//! Visibility engine: turns stored trackers plus a [`Query`] into ordered sections.
//!
//! The engine is pull-based. Every trigger ends in [`VisibilityEngine::recompute`],
//! which re-reads the store and re-runs [`build_sections`]. Nothing is diffed
//! incrementally, so identical inputs always give identical output.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{PINNED_SECTION_TITLE, Query, Section, StatusFilter, Tracker};
use crate::schedule::Schedule;
use crate::settings::EngineConfig;
use crate::store::TrackerStore;

pub type ListenerId = u64;

type Listener = Box<dyn Fn(&[Section]) + Send>;

pub struct VisibilityEngine {
    store: Arc<dyn TrackerStore>,
    config: EngineConfig,
    query: Query,
    sections: Vec<Section>,
    last_error: Option<Error>,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener: ListenerId,
}

impl VisibilityEngine {
    /// Builds the engine and computes the first set of sections straight away.
    pub fn new(store: Arc<dyn TrackerStore>, query: Query, config: EngineConfig) -> Self {
        let mut engine = Self {
            store,
            config,
            query,
            sections: Vec::new(),
            last_error: None,
            listeners: BTreeMap::new(),
            next_listener: 0,
        };
        engine.recompute();
        engine
    }

    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[must_use]
    pub fn current_sections(&self) -> &[Section] {
        &self.sections
    }

    /// The read failure behind the most recent recompute, if it degraded.
    #[must_use]
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn set_query(&mut self, query: Query) -> bool {
        self.query = query;
        self.recompute()
    }

    pub fn set_config(&mut self, config: EngineConfig) -> bool {
        self.config = config;
        self.recompute()
    }

    /// Re-reads the store and rebuilds the sections. Listeners only hear
    /// about it when the result differs from the previous one.
    pub fn recompute(&mut self) -> bool {
        let sections = match self.read_sections() {
            Ok(sections) => {
                self.last_error = None;
                sections
            }
            Err(e) => {
                warn!(error = %e, "tracker read failed, showing no trackers");
                self.last_error = Some(e);
                Vec::new()
            }
        };

        if sections == self.sections {
            debug!(sections = sections.len(), "recompute: unchanged");
            return false;
        }

        debug!(
            sections = sections.len(),
            listeners = self.listeners.len(),
            "recompute: sections changed"
        );
        self.sections = sections;
        for listener in self.listeners.values() {
            listener(self.sections.as_slice());
        }
        true
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: Fn(&[Section]) + Send + 'static,
    {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    fn read_sections(&self) -> crate::Result<Vec<Section>> {
        let trackers = self.store.fetch_all_trackers()?;
        let completed = match self.query.status_filter {
            StatusFilter::Completed | StatusFilter::NotCompleted => {
                self.store.ids_completed_on(self.query.selected_date)?
            }
            StatusFilter::All | StatusFilter::DueToday => HashSet::new(),
        };
        Ok(build_sections(&trackers, &completed, &self.query, &self.config))
    }
}

/// Pure section builder.
///
/// `completed` holds the ids done on `query.selected_date` and is only
/// consulted by the completed and not-completed filters.
#[must_use]
pub fn build_sections(
    trackers: &[Tracker],
    completed: &HashSet<Uuid>,
    query: &Query,
    config: &EngineConfig,
) -> Vec<Section> {
    let day_bit = Schedule::for_date(query.selected_date);
    let use_schedule = config.status_filters_use_schedule || query.status_filter.applies_schedule();
    let needle = query.search_text.to_lowercase();

    let passes = |tracker: &Tracker| {
        if use_schedule && !tracker.effective_schedule().intersects(day_bit) {
            return false;
        }
        if !needle.is_empty() && !tracker.name.to_lowercase().contains(&needle) {
            return false;
        }
        match query.status_filter {
            StatusFilter::All | StatusFilter::DueToday => true,
            StatusFilter::Completed => completed.contains(&tracker.id),
            StatusFilter::NotCompleted => !completed.contains(&tracker.id),
        }
    };

    let mut pinned: Vec<Tracker> = Vec::new();
    let mut by_category: BTreeMap<(String, String), Vec<Tracker>> = BTreeMap::new();
    for tracker in trackers.iter().filter(|&t| passes(t)) {
        if tracker.is_pinned {
            pinned.push(tracker.clone());
        } else {
            let title = tracker.section_title();
            by_category
                .entry((title.to_lowercase(), title.to_string()))
                .or_default()
                .push(tracker.clone());
        }
    }

    let mut sections = Vec::with_capacity(by_category.len() + 1);
    if !pinned.is_empty() {
        sort_trackers(&mut pinned);
        sections.push(Section {
            title: PINNED_SECTION_TITLE.to_string(),
            is_pinned: true,
            trackers: pinned,
        });
    }
    for ((_, title), mut trackers) in by_category {
        sort_trackers(&mut trackers);
        sections.push(Section {
            title,
            is_pinned: false,
            trackers,
        });
    }
    sections
}

fn sort_trackers(trackers: &mut [Tracker]) {
    trackers.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}
