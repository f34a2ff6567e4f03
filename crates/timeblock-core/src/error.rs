//! Core error types for timeblock-core.
//!
//! Errors are split by concern: schedule invariants and lookups, calendar
//! provider calls, reconciliation runs, storage and configuration. Each has
//! its own thiserror enum and all of them convert into [`CoreError`].

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Core error type for timeblock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Schedule invariant violations and unknown ids
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Calendar reconciliation errors that stop a whole operation
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the time-block model.
///
/// Invariant violations and not-found lookups are distinct variants so that
/// callers can tell "your input is structurally wrong" from "that id does not
/// exist".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid time range: end_time ({end}) must be greater than start_time ({start})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Block {start}..{end} overlaps existing block {conflicting_id}")]
    Overlap {
        conflicting_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Block {start}..{end} does not fall on {date}")]
    OutsideDay {
        date: NaiveDate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Block {0} already belongs to this schedule")]
    DuplicateBlock(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Block {block_id} cannot go from {from} to {to}")]
    InvalidTransition {
        block_id: String,
        from: &'static str,
        to: &'static str,
    },
}

impl ScheduleError {
    /// Whether this is an invariant violation (as opposed to a lookup miss).
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInterval { .. }
                | Self::Overlap { .. }
                | Self::OutsideDay { .. }
                | Self::DuplicateBlock(_)
                | Self::InvalidTransition { .. }
        )
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BlockNotFound(_))
    }
}

/// Failure of a single call against a calendar provider.
///
/// These are caught per event by the reconciler and folded into the
/// `failed` counter of a sync summary.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Event already exists: {0}")]
    AlreadyExists(String),

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed provider payload: {0}")]
    Decode(String),

    #[error("Invalid provider base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors that abort a whole reconciliation run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Could not obtain a token for user '{user_id}': {message}")]
    Token { user_id: String, message: String },

    #[error("Sync cancelled by caller")]
    Cancelled,

    #[error("No calendar connected")]
    NotConnected,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: &'static str, message: String },

    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Could not determine data directory")]
    NoDataDir,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseBusy
                    || inner.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<ProviderError> for CoreError {
    fn from(err: ProviderError) -> Self {
        CoreError::Sync(SyncError::Provider(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_error_classification() {
        let overlap = ScheduleError::Overlap {
            conflicting_id: "b1".into(),
            start: Utc::now(),
            end: Utc::now(),
        };
        assert!(overlap.is_invariant_violation());
        assert!(!overlap.is_not_found());

        let missing = ScheduleError::BlockNotFound("b2".into());
        assert!(missing.is_not_found());
        assert!(!missing.is_invariant_violation());
    }

    #[test]
    fn test_rusqlite_error_converts_to_query_failed() {
        let err: DatabaseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }

    #[test]
    fn test_core_error_from_schedule_error() {
        let err: CoreError = ScheduleError::BlockNotFound("x".into()).into();
        assert!(err.to_string().contains("Block not found: x"));
    }
}
