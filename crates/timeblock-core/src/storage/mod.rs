//! Persistence: configuration file, SQLite database and the storage seams.
//!
//! The engine talks to storage only through [`ScheduleRepository`],
//! [`AttemptLog`] and [`EventLinkStore`]; [`ScheduleDb`] implements all three.

mod config;
pub mod migrations;
pub mod schedule_db;

pub use config::{Config, ScheduleConfig, SyncConfig};
pub use schedule_db::ScheduleDb;

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::{ConfigError, DatabaseError};
use crate::reschedule::RescheduleAttempt;
use crate::schedule::Schedule;
use crate::sync::ExternalEventLink;

/// Returns `~/.config/timeblock[-dev]/` based on TIMEBLOCK_ENV.
///
/// Set TIMEBLOCK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .ok_or(ConfigError::NoDataDir)?
        .join(".config");

    let env = std::env::var("TIMEBLOCK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timeblock-dev")
    } else {
        base_dir.join("timeblock")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Schedules keyed by (user, date).
pub trait ScheduleRepository {
    fn load_schedule(&self, user_id: &str, date: NaiveDate)
        -> Result<Option<Schedule>, DatabaseError>;

    /// Persist a schedule and its blocks. A schedule without blocks is deleted.
    fn save_schedule(&self, schedule: &Schedule) -> Result<(), DatabaseError>;

    /// Returns whether anything was deleted.
    fn delete_schedule(&self, user_id: &str, date: NaiveDate) -> Result<bool, DatabaseError>;

    /// Ids of every block `user_id` has on any day.
    fn block_ids(&self, user_id: &str) -> Result<HashSet<String>, DatabaseError>;
}

/// Append-only record of reschedule attempts.
pub trait AttemptLog {
    fn record_attempt(&self, user_id: &str, attempt: &RescheduleAttempt)
        -> Result<(), DatabaseError>;

    /// Save `schedules` and append `attempts` in one transaction.
    fn record_repair(
        &self,
        user_id: &str,
        schedules: &[&Schedule],
        attempts: &[RescheduleAttempt],
    ) -> Result<(), DatabaseError>;

    /// Attempts for blocks missed on `date`, oldest first.
    fn list_attempts(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<RescheduleAttempt>, DatabaseError>;
}

/// Block-to-remote-event mappings, one per block per calendar.
pub trait EventLinkStore {
    /// Insert or replace the link for `(user, provider, calendar, block)`.
    fn upsert_link(&self, link: &ExternalEventLink) -> Result<(), DatabaseError>;

    fn get_link(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
        block_id: &str,
    ) -> Result<Option<ExternalEventLink>, DatabaseError>;

    fn list_links(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
    ) -> Result<Vec<ExternalEventLink>, DatabaseError>;

    /// Drop the link of one block on one calendar. Returns whether it existed.
    fn remove_link(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
        block_id: &str,
    ) -> Result<bool, DatabaseError>;

    /// Drop every link of a block, across calendars. Returns the count removed.
    fn remove_block_links(&self, block_id: &str) -> Result<usize, DatabaseError>;

    /// Drop every link of one calendar. Returns the count removed.
    fn remove_calendar_links(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
    ) -> Result<usize, DatabaseError>;
}
