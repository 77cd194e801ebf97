use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schedule::Schedule;

pub const PINNED_SECTION_TITLE: &str = "Pinned";
pub const UNCATEGORIZED_TITLE: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    #[default]
    Habit,
    IrregularEvent,
}

impl TrackerKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrackerKind::Habit => "habit",
            TrackerKind::IrregularEvent => "irregular_event",
        }
    }

    /// Unknown values fall back to a habit.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "irregular_event" => TrackerKind::IrregularEvent,
            _ => TrackerKind::Habit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub schedule: Schedule,
    pub kind: TrackerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_title: Option<String>,
    pub is_pinned: bool,
}

impl Tracker {
    /// Irregular events count as due on every day whatever bits are stored.
    #[must_use]
    pub fn effective_schedule(&self) -> Schedule {
        match self.kind {
            TrackerKind::Habit => self.schedule,
            TrackerKind::IrregularEvent => Schedule::EVERY_DAY,
        }
    }

    #[must_use]
    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.effective_schedule()
            .intersects(Schedule::for_date(day))
    }

    /// The section a non-pinned tracker is grouped under.
    #[must_use]
    pub fn section_title(&self) -> &str {
        match self.category_title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => UNCATEGORIZED_TITLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCategory {
    pub title: String,
    pub trackers: Vec<Tracker>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerRecord {
    pub id: Uuid,
    pub tracker_id: Uuid,
    pub day: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewTracker {
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub schedule: Schedule,
    pub kind: TrackerKind,
    pub category_title: Option<String>,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTracker {
    pub name: Option<String>,
    pub color: Option<String>,
    pub emoji: Option<String>,
    pub schedule: Option<Schedule>,
    pub category_title: Option<Option<String>>,
    pub is_pinned: Option<bool>,
}

impl UpdateTracker {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.color.is_none()
            && self.emoji.is_none()
            && self.schedule.is_none()
            && self.category_title.is_none()
            && self.is_pinned.is_none()
    }
}

// --- Visibility query types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    DueToday,
    Completed,
    NotCompleted,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::DueToday,
        StatusFilter::Completed,
        StatusFilter::NotCompleted,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::DueToday => "due-today",
            StatusFilter::Completed => "completed",
            StatusFilter::NotCompleted => "not-completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "due-today" | "due" | "today" => Ok(StatusFilter::DueToday),
            "completed" | "done" => Ok(StatusFilter::Completed),
            "not-completed" | "pending" | "todo" => Ok(StatusFilter::NotCompleted),
            other => Err(Error::invalid(
                "filter",
                format!("'{other}'. Use all, due-today, completed, or not-completed"),
            )),
        }
    }

    /// Whether the weekday schedule narrows the result under the default policy.
    #[must_use]
    pub fn applies_schedule(self) -> bool {
        matches!(self, StatusFilter::All | StatusFilter::DueToday)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub selected_date: NaiveDate,
    pub search_text: String,
    pub status_filter: StatusFilter,
}

impl Query {
    #[must_use]
    pub fn for_date(selected_date: NaiveDate) -> Self {
        Self {
            selected_date,
            search_text: String::new(),
            status_filter: StatusFilter::All,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search_text: impl Into<String>) -> Self {
        self.search_text = search_text.into();
        self
    }

    #[must_use]
    pub fn with_filter(mut self, status_filter: StatusFilter) -> Self {
        self.status_filter = status_filter;
        self
    }

    #[must_use]
    pub fn with_date(mut self, selected_date: NaiveDate) -> Self {
        self.selected_date = selected_date;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub is_pinned: bool,
    pub trackers: Vec<Tracker>,
}

// --- Presentation helpers ---

#[derive(Debug, Clone, Serialize)]
pub struct TrackerCard {
    pub id: Uuid,
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub schedule: String,
    pub completed_on_day: bool,
    pub total_completions: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionToggle {
    pub completed: bool,
    pub total_completions: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    pub best_streak: i64,
    pub perfect_days: i64,
    pub completed_today: i64,
    pub average_completions: i64,
}

// --- Validation ---

pub(crate) fn normalize_name(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Empty or whitespace-only titles mean "no category".
pub(crate) fn normalize_category(title: Option<&str>) -> Option<String> {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub(crate) fn validate_schedule(kind: TrackerKind, schedule: Schedule) -> Result<Schedule> {
    match kind {
        TrackerKind::IrregularEvent => Ok(Schedule::EVERY_DAY),
        TrackerKind::Habit if schedule.is_empty() => Err(Error::invalid(
            "schedule",
            "a habit needs at least one day",
        )),
        TrackerKind::Habit => Ok(schedule),
    }
}
