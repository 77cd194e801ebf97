use std::fmt;

use thiserror::Error;

/// What kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Tracker,
    Category,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Tracker => "tracker",
            Entity::Category => "category",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },

    #[error("{entity} already exists: {key}")]
    Conflict { entity: Entity, key: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    pub(crate) fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
        Error::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn conflict(entity: Entity, key: impl fmt::Display) -> Self {
        Error::Conflict {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Invalid {
            field,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::not_found(Entity::Category, "Health");
        assert_eq!(err.to_string(), "category not found: Health");
        assert!(err.is_not_found());

        let err = Error::conflict(Entity::Category, "Health");
        assert_eq!(err.to_string(), "category already exists: Health");
        assert!(err.is_conflict());

        let err = Error::invalid("schedule", "a habit needs at least one day");
        assert_eq!(
            err.to_string(),
            "invalid schedule: a habit needs at least one day"
        );
    }

    #[test]
    fn test_storage_error_from_rusqlite() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.is_storage());
        assert!(!err.is_not_found());
    }
}
