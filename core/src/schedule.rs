//! Weekly recurrence as a seven-bit set, Monday in bit 0 through Sunday in bit 6.

use std::fmt;
use std::ops::BitOr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ALL_BITS: u8 = 0b111_1111;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const SHORT_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Schedule(u8);

impl Schedule {
    pub const EMPTY: Schedule = Schedule(0);
    pub const EVERY_DAY: Schedule = Schedule(ALL_BITS);
    pub const WEEKDAYS: Schedule = Schedule(0b001_1111);
    pub const WEEKEND: Schedule = Schedule(0b110_0000);

    /// Bits above Sunday are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Schedule(bits & ALL_BITS)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn day(weekday: Weekday) -> Self {
        Schedule(1 << weekday.num_days_from_monday())
    }

    /// Maps a calendar weekday index where 1 is Sunday and 7 is Saturday.
    /// Anything outside 1..=7 yields the empty schedule.
    #[must_use]
    pub fn from_weekday(system_weekday: i64) -> Self {
        match system_weekday {
            1 => Self::day(Weekday::Sun),
            2..=7 => Schedule(1 << (system_weekday - 2)),
            _ => Self::EMPTY,
        }
    }

    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self::from_weekday(i64::from(date.weekday().number_from_sunday()))
    }

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.intersects(Self::day(day))
    }

    #[must_use]
    pub fn intersects(self, other: Schedule) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub fn with(self, day: Weekday) -> Self {
        self | Self::day(day)
    }

    #[must_use]
    pub fn without(self, day: Weekday) -> Self {
        Schedule(self.0 & !Self::day(day).0)
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn is_every_day(self) -> bool {
        self == Self::EVERY_DAY
    }

    #[must_use]
    pub fn is_weekdays(self) -> bool {
        self == Self::WEEKDAYS
    }

    #[must_use]
    pub fn is_weekend(self) -> bool {
        self == Self::WEEKEND
    }

    /// Selected days in Monday to Sunday order.
    #[must_use]
    pub fn selected_days(self) -> Vec<Weekday> {
        WEEK.into_iter().filter(|day| self.contains(*day)).collect()
    }

    #[must_use]
    pub fn summary(self) -> String {
        if self.is_every_day() {
            return "Every day".to_string();
        }
        if self.is_weekdays() {
            return "Weekdays".to_string();
        }
        if self.is_weekend() {
            return "Weekends".to_string();
        }
        if self.is_empty() {
            return "Never".to_string();
        }
        self.selected_days()
            .iter()
            .map(|day| SHORT_NAMES[day.num_days_from_monday() as usize])
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Accepts `every-day`, `weekdays`, `weekends`, or a comma list of day names.
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "every-day" | "everyday" | "daily" | "all" => return Ok(Self::EVERY_DAY),
            "weekdays" => return Ok(Self::WEEKDAYS),
            "weekends" | "weekend" => return Ok(Self::WEEKEND),
            _ => {}
        }

        let mut schedule = Self::EMPTY;
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day: Weekday = part.parse().map_err(|_| {
                Error::invalid(
                    "schedule",
                    format!("unknown day '{part}'. Use mon-sun, weekdays, weekends, or every-day"),
                )
            })?;
            schedule = schedule.with(day);
        }
        if schedule.is_empty() {
            return Err(Error::invalid("schedule", "no days given"));
        }
        Ok(schedule)
    }
}

impl BitOr for Schedule {
    type Output = Schedule;

    fn bitor(self, rhs: Schedule) -> Schedule {
        Schedule(self.0 | rhs.0)
    }
}

impl From<u8> for Schedule {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<Schedule> for u8 {
    fn from(schedule: Schedule) -> Self {
        schedule.0
    }
}

impl FromIterator<Weekday> for Schedule {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Schedule::with)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
