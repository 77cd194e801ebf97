//! Binds the persistence change feed to a visibility engine.
//!
//! Store changes, date changes and filter changes recompute at once. Search
//! text is debounced: the latest text replaces any pending one and is applied
//! once the window has passed, as seen by [`ChangeNotifier::poll_at`]. The
//! host loop decides when to poll using [`ChangeNotifier::next_deadline`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::debug;

use crate::engine::VisibilityEngine;
use crate::feed::{ChangeFeed, SubscriptionId};
use crate::models::{Query, Section, StatusFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSearch {
    text: String,
    due_at: Instant,
}

pub struct ChangeNotifier {
    engine: Arc<Mutex<VisibilityEngine>>,
    feed: Arc<ChangeFeed>,
    subscription: SubscriptionId,
    debounce: Duration,
    pending_search: Option<PendingSearch>,
}

impl ChangeNotifier {
    /// Subscribes the engine to `feed`. The subscription holds the engine
    /// weakly and is removed when the notifier is dropped.
    pub fn attach(
        engine: Arc<Mutex<VisibilityEngine>>,
        feed: Arc<ChangeFeed>,
        debounce: Duration,
    ) -> Self {
        let weak = Arc::downgrade(&engine);
        let subscription = feed.subscribe(move |change| {
            if let Some(engine) = weak.upgrade() {
                debug!(?change, "store changed, recomputing");
                engine.lock().recompute();
            }
        });

        Self {
            engine,
            feed,
            subscription,
            debounce,
            pending_search: None,
        }
    }

    #[must_use]
    pub fn engine(&self) -> Arc<Mutex<VisibilityEngine>> {
        Arc::clone(&self.engine)
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// The query the engine is currently showing. A pending search is not part of it.
    #[must_use]
    pub fn query(&self) -> Query {
        self.engine.lock().query().clone()
    }

    #[must_use]
    pub fn sections(&self) -> Vec<Section> {
        self.engine.lock().current_sections().to_vec()
    }

    pub fn set_date(&mut self, date: NaiveDate) -> bool {
        let mut engine = self.engine.lock();
        let query = engine.query().clone().with_date(date);
        engine.set_query(query)
    }

    pub fn set_filter(&mut self, filter: StatusFilter) -> bool {
        let mut engine = self.engine.lock();
        let query = engine.query().clone().with_filter(filter);
        engine.set_query(query)
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) -> bool {
        self.set_search_text_at(text, Instant::now())
    }

    /// Schedules `text` to apply at `now + debounce`, replacing any pending
    /// text. With a zero window it applies immediately and the return value
    /// says whether the sections changed; otherwise it is `false`.
    pub fn set_search_text_at(&mut self, text: impl Into<String>, now: Instant) -> bool {
        let text = text.into();
        if self.debounce.is_zero() {
            self.pending_search = None;
            return self.apply_search(text);
        }

        let due_at = now + self.debounce;
        if let Some(previous) = self.pending_search.replace(PendingSearch {
            text,
            due_at,
        }) {
            debug!(superseded = %previous.text, "search text replaced before it applied");
        }
        false
    }

    #[must_use]
    pub fn has_pending_search(&self) -> bool {
        self.pending_search.is_some()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_search.as_ref().map(|p| p.due_at)
    }

    /// Applies the pending search once it is due. Returns whether the
    /// sections changed.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        match &self.pending_search {
            Some(pending) if pending.due_at <= now => {}
            _ => return false,
        }
        match self.pending_search.take() {
            Some(pending) => self.apply_search(pending.text),
            None => false,
        }
    }

    /// Applies the pending search without waiting.
    pub fn flush(&mut self) -> bool {
        match self.pending_search.take() {
            Some(pending) => self.apply_search(pending.text),
            None => false,
        }
    }

    fn apply_search(&self, text: String) -> bool {
        let mut engine = self.engine.lock();
        let query = engine.query().clone().with_search(text);
        engine.set_query(query)
    }
}

impl Drop for ChangeNotifier {
    fn drop(&mut self) {
        self.feed.unsubscribe(self.subscription);
    }
}
