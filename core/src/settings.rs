//! Engine tunables persisted in `user_settings`.

use std::time::Duration;

use tracing::warn;

use crate::db::Database;
use crate::error::{Error, Result};

pub const SEARCH_DEBOUNCE_MS: &str = "search_debounce_ms";
pub const STATUS_FILTERS_USE_SCHEDULE: &str = "status_filters_use_schedule";

pub const KNOWN_SETTINGS: [&str; 2] = [SEARCH_DEBOUNCE_MS, STATUS_FILTERS_USE_SCHEDULE];

const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const MAX_SEARCH_DEBOUNCE_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub search_debounce: Duration,
    /// Apply the weekday clause under the completed and not-completed filters too.
    pub status_filters_use_schedule: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            status_filters_use_schedule: false,
        }
    }
}

impl EngineConfig {
    /// Reads overrides from the database. A stored value that no longer
    /// validates is ignored with a warning.
    pub fn from_settings(db: &Database) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = db.get_setting(SEARCH_DEBOUNCE_MS)? {
            match parse_debounce(&raw) {
                Ok(ms) => config.search_debounce = Duration::from_millis(ms),
                Err(e) => warn!(key = SEARCH_DEBOUNCE_MS, value = %raw, "ignoring setting: {e}"),
            }
        }
        if let Some(raw) = db.get_setting(STATUS_FILTERS_USE_SCHEDULE)? {
            match parse_bool(&raw) {
                Ok(flag) => config.status_filters_use_schedule = flag,
                Err(e) => {
                    warn!(key = STATUS_FILTERS_USE_SCHEDULE, value = %raw, "ignoring setting: {e}");
                }
            }
        }

        Ok(config)
    }
}

/// Checks and canonicalises a value before it is stored.
pub fn validate_setting(key: &str, value: &str) -> Result<String> {
    match key {
        SEARCH_DEBOUNCE_MS => parse_debounce(value).map(|ms| ms.to_string()),
        STATUS_FILTERS_USE_SCHEDULE => parse_bool(value).map(|flag| flag.to_string()),
        _ => Err(Error::invalid(
            "setting",
            format!("unknown key '{key}'. Known: {}", KNOWN_SETTINGS.join(", ")),
        )),
    }
}

fn parse_debounce(value: &str) -> Result<u64> {
    let ms: u64 = value
        .trim()
        .parse()
        .map_err(|_| Error::invalid(SEARCH_DEBOUNCE_MS, format!("'{value}' is not a number")))?;
    if ms > MAX_SEARCH_DEBOUNCE_MS {
        return Err(Error::invalid(
            SEARCH_DEBOUNCE_MS,
            format!("must be at most {MAX_SEARCH_DEBOUNCE_MS}"),
        ));
    }
    Ok(ms)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::invalid(
            STATUS_FILTERS_USE_SCHEDULE,
            format!("'{value}' is not true or false"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let db = Database::open_in_memory().unwrap();
        let config = EngineConfig::from_settings(&db).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.search_debounce, Duration::from_millis(300));
        assert!(!config.status_filters_use_schedule);
    }

    #[test]
    fn test_from_settings_reads_overrides() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting(SEARCH_DEBOUNCE_MS, "0").unwrap();
        db.set_setting(STATUS_FILTERS_USE_SCHEDULE, "true").unwrap();

        let config = EngineConfig::from_settings(&db).unwrap();
        assert_eq!(config.search_debounce, Duration::ZERO);
        assert!(config.status_filters_use_schedule);
    }

    #[test]
    fn test_bad_stored_value_falls_back() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting(SEARCH_DEBOUNCE_MS, "soon").unwrap();
        let config = EngineConfig::from_settings(&db).unwrap();
        assert_eq!(config.search_debounce, Duration::from_millis(300));
    }

    #[test]
    fn test_validate_setting() {
        assert_eq!(validate_setting(SEARCH_DEBOUNCE_MS, " 150 ").unwrap(), "150");
        assert!(validate_setting(SEARCH_DEBOUNCE_MS, "99999").is_err());
        assert_eq!(validate_setting(STATUS_FILTERS_USE_SCHEDULE, "Yes").unwrap(), "true");
        assert!(validate_setting(STATUS_FILTERS_USE_SCHEDULE, "maybe").is_err());
        assert!(validate_setting("theme", "dark").is_err());
    }
}
