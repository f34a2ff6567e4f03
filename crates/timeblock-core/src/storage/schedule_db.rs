//! SQLite-based storage for schedules, reschedule attempts and event links.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::migrations;
use super::{AttemptLog, EventLinkStore, ScheduleRepository};
use crate::error::{CoreError, DatabaseError};
use crate::reschedule::{AttemptOutcome, RescheduleAttempt};
use crate::schedule::{BlockType, Schedule, TimeBlock};
use crate::sync::ExternalEventLink;

// === Helper Functions ===

fn corrupt(table: &'static str, message: impl Into<String>) -> DatabaseError {
    DatabaseError::CorruptRow {
        table,
        message: message.into(),
    }
}

fn parse_instant(table: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{value}': {e}")))
}

fn parse_optional_instant(
    table: &'static str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    value.map(|v| parse_instant(table, &v)).transpose()
}

fn parse_date(table: &'static str, value: &str) -> Result<NaiveDate, DatabaseError> {
    value
        .parse::<NaiveDate>()
        .map_err(|e| corrupt(table, format!("bad date '{value}': {e}")))
}

/// Raw `time_blocks` row before validation.
struct BlockRow {
    id: String,
    schedule_id: String,
    block_type: String,
    reference_id: Option<String>,
    title: String,
    start_time: String,
    end_time: String,
    completed: bool,
    missed: bool,
}

impl BlockRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            schedule_id: row.get(1)?,
            block_type: row.get(2)?,
            reference_id: row.get(3)?,
            title: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            completed: row.get(7)?,
            missed: row.get(8)?,
        })
    }

    fn into_block(self) -> Result<TimeBlock, DatabaseError> {
        let block_type = BlockType::parse(&self.block_type)
            .ok_or_else(|| corrupt("time_blocks", format!("unknown block type '{}'", self.block_type)))?;
        Ok(TimeBlock {
            start_time: parse_instant("time_blocks", &self.start_time)?,
            end_time: parse_instant("time_blocks", &self.end_time)?,
            id: self.id,
            schedule_id: self.schedule_id,
            block_type,
            reference_id: self.reference_id,
            title: self.title,
            completed: self.completed,
            missed: self.missed,
        })
    }
}

/// Raw `reschedule_attempts` row before validation.
struct AttemptRow {
    block_id: String,
    schedule_date: String,
    attempted_at: String,
    outcome: String,
    new_start: Option<String>,
    new_end: Option<String>,
    detail: Option<String>,
}

impl AttemptRow {
    fn into_attempt(self) -> Result<RescheduleAttempt, DatabaseError> {
        const TABLE: &str = "reschedule_attempts";
        let outcome = AttemptOutcome::parse(&self.outcome)
            .ok_or_else(|| corrupt(TABLE, format!("unknown outcome '{}'", self.outcome)))?;
        Ok(RescheduleAttempt {
            block_id: self.block_id,
            schedule_date: parse_date(TABLE, &self.schedule_date)?,
            attempted_at: parse_instant(TABLE, &self.attempted_at)?,
            outcome,
            new_start: parse_optional_instant(TABLE, self.new_start)?,
            new_end: parse_optional_instant(TABLE, self.new_end)?,
            detail: self.detail,
        })
    }
}

/// Raw `event_links` row before validation.
struct LinkRow {
    user_id: String,
    provider: String,
    calendar_id: String,
    block_id: String,
    remote_event_id: String,
    synced_at: String,
}

impl LinkRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            user_id: row.get(0)?,
            provider: row.get(1)?,
            calendar_id: row.get(2)?,
            block_id: row.get(3)?,
            remote_event_id: row.get(4)?,
            synced_at: row.get(5)?,
        })
    }

    fn into_link(self) -> Result<ExternalEventLink, DatabaseError> {
        Ok(ExternalEventLink {
            synced_at: parse_instant("event_links", &self.synced_at)?,
            user_id: self.user_id,
            provider: self.provider,
            calendar_id: self.calendar_id,
            block_id: self.block_id,
            remote_event_id: self.remote_event_id,
        })
    }
}

/// Replace the stored block set of `schedule`. An empty schedule is deleted.
fn write_schedule(conn: &Connection, schedule: &Schedule) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM time_blocks WHERE schedule_id = ?1",
        params![schedule.id],
    )?;

    if schedule.is_empty() {
        conn.execute("DELETE FROM schedules WHERE id = ?1", params![schedule.id])?;
        return Ok(());
    }

    conn.execute(
        "INSERT INTO schedules (id, user_id, date) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET user_id = excluded.user_id, date = excluded.date",
        params![schedule.id, schedule.user_id, schedule.date.to_string()],
    )?;

    for block in schedule.blocks() {
        // A block that moved here from another day replaces its old row.
        conn.execute(
            "INSERT OR REPLACE INTO time_blocks
             (id, schedule_id, block_type, reference_id, title, start_time, end_time, completed, missed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                block.id,
                schedule.id,
                block.block_type.as_str(),
                block.reference_id,
                block.title,
                block.start_time.to_rfc3339(),
                block.end_time.to_rfc3339(),
                block.completed,
                block.missed,
            ],
        )?;
    }
    Ok(())
}

fn insert_attempt(
    conn: &Connection,
    user_id: &str,
    attempt: &RescheduleAttempt,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO reschedule_attempts
         (user_id, block_id, schedule_date, attempted_at, outcome, new_start, new_end, detail)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user_id,
            attempt.block_id,
            attempt.schedule_date.to_string(),
            attempt.attempted_at.to_rfc3339(),
            attempt.outcome.as_str(),
            attempt.new_start.map(|t| t.to_rfc3339()),
            attempt.new_end.map(|t| t.to_rfc3339()),
            attempt.detail,
        ],
    )?;
    Ok(())
}

/// SQLite database for schedule storage.
///
/// Stores schedules with their blocks, the reschedule attempt log and
/// external event links.
pub struct ScheduleDb {
    conn: Connection,
}

impl ScheduleDb {
    /// Open the schedule database at `~/.config/timeblock/timeblock.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("timeblock.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    fn load_blocks(&self, schedule_id: &str) -> Result<Vec<TimeBlock>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, schedule_id, block_type, reference_id, title, start_time, end_time, completed, missed
             FROM time_blocks WHERE schedule_id = ?1 ORDER BY start_time",
        )?;
        let rows = stmt
            .query_map(params![schedule_id], BlockRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(BlockRow::into_block).collect()
    }

    /// Days on which `user_id` has a schedule, in order.
    pub fn list_schedule_dates(&self, user_id: &str) -> Result<Vec<NaiveDate>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT date FROM schedules WHERE user_id = ?1 ORDER BY date")?;
        let dates = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        dates.iter().map(|d| parse_date("schedules", d)).collect()
    }
}

impl ScheduleRepository for ScheduleDb {
    fn load_schedule(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Schedule>, DatabaseError> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM schedules WHERE user_id = ?1 AND date = ?2",
                params![user_id, date.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(id) = id else {
            return Ok(None);
        };
        let blocks = self.load_blocks(&id)?;
        Schedule::from_parts(id, user_id, date, blocks)
            .map(Some)
            .map_err(|e| corrupt("time_blocks", e.to_string()))
    }

    fn save_schedule(&self, schedule: &Schedule) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        write_schedule(&tx, schedule)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_schedule(&self, user_id: &str, date: NaiveDate) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM time_blocks WHERE schedule_id IN
             (SELECT id FROM schedules WHERE user_id = ?1 AND date = ?2)",
            params![user_id, date.to_string()],
        )?;
        let deleted = tx.execute(
            "DELETE FROM schedules WHERE user_id = ?1 AND date = ?2",
            params![user_id, date.to_string()],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn block_ids(&self, user_id: &str) -> Result<HashSet<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id FROM time_blocks b
             JOIN schedules s ON s.id = b.schedule_id
             WHERE s.user_id = ?1",
        )?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }
}

impl AttemptLog for ScheduleDb {
    fn record_attempt(
        &self,
        user_id: &str,
        attempt: &RescheduleAttempt,
    ) -> Result<(), DatabaseError> {
        insert_attempt(&self.conn, user_id, attempt)
    }

    fn record_repair(
        &self,
        user_id: &str,
        schedules: &[&Schedule],
        attempts: &[RescheduleAttempt],
    ) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        for schedule in schedules {
            write_schedule(&tx, schedule)?;
        }
        for attempt in attempts {
            insert_attempt(&tx, user_id, attempt)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_attempts(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<RescheduleAttempt>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT block_id, schedule_date, attempted_at, outcome, new_start, new_end, detail
             FROM reschedule_attempts
             WHERE user_id = ?1 AND schedule_date = ?2
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![user_id, date.to_string()], |row| {
                Ok(AttemptRow {
                    block_id: row.get(0)?,
                    schedule_date: row.get(1)?,
                    attempted_at: row.get(2)?,
                    outcome: row.get(3)?,
                    new_start: row.get(4)?,
                    new_end: row.get(5)?,
                    detail: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(AttemptRow::into_attempt).collect()
    }
}

impl EventLinkStore for ScheduleDb {
    fn upsert_link(&self, link: &ExternalEventLink) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO event_links (user_id, provider, calendar_id, block_id, remote_event_id, synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, provider, calendar_id, block_id)
             DO UPDATE SET remote_event_id = excluded.remote_event_id, synced_at = excluded.synced_at",
            params![
                link.user_id,
                link.provider,
                link.calendar_id,
                link.block_id,
                link.remote_event_id,
                link.synced_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_link(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
        block_id: &str,
    ) -> Result<Option<ExternalEventLink>, DatabaseError> {
        self.conn
            .query_row(
                "SELECT user_id, provider, calendar_id, block_id, remote_event_id, synced_at
                 FROM event_links
                 WHERE user_id = ?1 AND provider = ?2 AND calendar_id = ?3 AND block_id = ?4",
                params![user_id, provider, calendar_id, block_id],
                LinkRow::from_row,
            )
            .optional()?
            .map(LinkRow::into_link)
            .transpose()
    }

    fn list_links(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
    ) -> Result<Vec<ExternalEventLink>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, provider, calendar_id, block_id, remote_event_id, synced_at
             FROM event_links
             WHERE user_id = ?1 AND provider = ?2 AND calendar_id = ?3
             ORDER BY block_id",
        )?;
        let rows = stmt
            .query_map(params![user_id, provider, calendar_id], LinkRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(LinkRow::into_link).collect()
    }

    fn remove_link(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
        block_id: &str,
    ) -> Result<bool, DatabaseError> {
        let removed = self.conn.execute(
            "DELETE FROM event_links
             WHERE user_id = ?1 AND provider = ?2 AND calendar_id = ?3 AND block_id = ?4",
            params![user_id, provider, calendar_id, block_id],
        )?;
        Ok(removed > 0)
    }

    fn remove_block_links(&self, block_id: &str) -> Result<usize, DatabaseError> {
        Ok(self
            .conn
            .execute("DELETE FROM event_links WHERE block_id = ?1", params![block_id])?)
    }

    fn remove_calendar_links(
        &self,
        user_id: &str,
        provider: &str,
        calendar_id: &str,
    ) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute(
            "DELETE FROM event_links WHERE user_id = ?1 AND provider = ?2 AND calendar_id = ?3",
            params![user_id, provider, calendar_id],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn sample() -> Schedule {
        let mut s = Schedule::new("user-1", day());
        let b = s
            .add_block(BlockType::Task, "Write", at(9, 0), at(10, 0), Some("task-1".into()))
            .unwrap();
        s.add_block(BlockType::Break, "Coffee", at(10, 0), at(10, 15), None)
            .unwrap();
        s.mark_completed(&b.id).unwrap();
        s
    }

    #[test]
    fn test_schedule_roundtrip() {
        let db = ScheduleDb::open_memory().unwrap();
        let schedule = sample();
        db.save_schedule(&schedule).unwrap();

        let loaded = db.load_schedule("user-1", day()).unwrap().unwrap();
        assert_eq!(loaded, schedule);
        assert_eq!(loaded.summary().completed_count, 1);
    }

    #[test]
    fn test_missing_schedule_is_none() {
        let db = ScheduleDb::open_memory().unwrap();
        assert!(db.load_schedule("user-1", day()).unwrap().is_none());
        assert!(!db.delete_schedule("user-1", day()).unwrap());
    }

    #[test]
    fn test_saving_empty_schedule_deletes_it() {
        let db = ScheduleDb::open_memory().unwrap();
        let mut schedule = sample();
        db.save_schedule(&schedule).unwrap();

        let ids: Vec<String> = schedule.blocks().iter().map(|b| b.id.clone()).collect();
        for id in ids {
            schedule.remove_block(&id).unwrap();
        }
        db.save_schedule(&schedule).unwrap();

        assert!(db.load_schedule("user-1", day()).unwrap().is_none());
        assert!(db.list_schedule_dates("user-1").unwrap().is_empty());
    }

    #[test]
    fn test_resave_replaces_block_set() {
        let db = ScheduleDb::open_memory().unwrap();
        let mut schedule = sample();
        db.save_schedule(&schedule).unwrap();

        let coffee = schedule.blocks()[1].id.clone();
        schedule.remove_block(&coffee).unwrap();
        schedule
            .add_block(BlockType::Meeting, "Sync", at(11, 0), at(11, 30), None)
            .unwrap();
        db.save_schedule(&schedule).unwrap();

        let loaded = db.load_schedule("user-1", day()).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(!loaded.contains(&coffee));
    }

    #[test]
    fn test_block_moved_between_days() {
        let db = ScheduleDb::open_memory().unwrap();
        let mut today = sample();
        db.save_schedule(&today).unwrap();

        let next = day().succ_opt().unwrap();
        let mut tomorrow = Schedule::new("user-1", next);
        let coffee = today.blocks()[1].id.clone();
        let mut block = today.remove_block(&coffee).unwrap();
        block.start_time += chrono::Duration::days(1);
        block.end_time += chrono::Duration::days(1);
        let moved_id = block.id.clone();
        tomorrow.insert_block(block).unwrap();

        db.save_schedule(&tomorrow).unwrap();
        db.save_schedule(&today).unwrap();

        assert!(!db.load_schedule("user-1", day()).unwrap().unwrap().contains(&moved_id));
        assert!(db.load_schedule("user-1", next).unwrap().unwrap().contains(&moved_id));
        assert_eq!(db.list_schedule_dates("user-1").unwrap(), vec![day(), next]);
    }

    #[test]
    fn test_block_ids_span_all_days_of_one_user() {
        let db = ScheduleDb::open_memory().unwrap();
        let today = sample();
        let mut tomorrow = Schedule::new("user-1", day().succ_opt().unwrap());
        let day_later = chrono::Duration::days(1);
        let late = tomorrow
            .add_block(BlockType::Task, "Late", at(9, 0) + day_later, at(10, 0) + day_later, None)
            .unwrap();
        let mut other = Schedule::new("user-2", day());
        other
            .add_block(BlockType::Task, "Theirs", at(9, 0), at(10, 0), None)
            .unwrap();
        for s in [&today, &tomorrow, &other] {
            db.save_schedule(s).unwrap();
        }

        let ids = db.block_ids("user-1").unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&late.id));
        assert!(today.blocks().iter().all(|b| ids.contains(&b.id)));
    }

    fn placed_attempt(block_id: &str) -> RescheduleAttempt {
        RescheduleAttempt {
            block_id: block_id.into(),
            schedule_date: day(),
            attempted_at: at(12, 0),
            outcome: AttemptOutcome::Placed,
            new_start: Some(at(14, 0)),
            new_end: Some(at(15, 0)),
            detail: None,
        }
    }

    #[test]
    fn test_record_repair_commits_schedules_with_attempts() {
        let db = ScheduleDb::open_memory().unwrap();
        let schedule = sample();
        let attempt = placed_attempt(&schedule.blocks()[0].id);

        db.record_repair("user-1", &[&schedule], std::slice::from_ref(&attempt))
            .unwrap();

        assert_eq!(db.load_schedule("user-1", day()).unwrap().unwrap(), schedule);
        assert_eq!(db.list_attempts("user-1", day()).unwrap(), vec![attempt]);
    }

    #[test]
    fn test_failed_repair_leaves_nothing_behind() {
        let db = ScheduleDb::open_memory().unwrap();
        let schedule = sample();
        db.conn.execute("DROP TABLE reschedule_attempts", []).unwrap();

        let attempt = placed_attempt(&schedule.blocks()[0].id);
        assert!(db.record_repair("user-1", &[&schedule], &[attempt]).is_err());
        assert!(db.load_schedule("user-1", day()).unwrap().is_none());
    }

    #[test]
    fn test_attempt_log_accumulates() {
        let db = ScheduleDb::open_memory().unwrap();
        let first = RescheduleAttempt {
            block_id: "b1".into(),
            schedule_date: day(),
            attempted_at: at(12, 0),
            outcome: AttemptOutcome::NoSlot,
            new_start: None,
            new_end: None,
            detail: None,
        };
        let second = RescheduleAttempt {
            attempted_at: at(13, 0),
            outcome: AttemptOutcome::Placed,
            new_start: Some(at(14, 0)),
            new_end: Some(at(15, 0)),
            ..first.clone()
        };
        db.record_attempt("user-1", &first).unwrap();
        db.record_attempt("user-1", &second).unwrap();
        db.record_attempt("user-2", &first).unwrap();

        assert_eq!(db.list_attempts("user-1", day()).unwrap(), vec![first, second]);
        assert!(db.list_attempts("user-1", day().succ_opt().unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_event_links() {
        let db = ScheduleDb::open_memory().unwrap();
        let link = ExternalEventLink {
            user_id: "user-1".into(),
            provider: "google".into(),
            calendar_id: "primary".into(),
            block_id: "b1".into(),
            remote_event_id: "b1".into(),
            synced_at: at(9, 0),
        };
        db.upsert_link(&link).unwrap();
        let relinked = ExternalEventLink {
            synced_at: at(10, 0),
            ..link.clone()
        };
        db.upsert_link(&relinked).unwrap();
        db.upsert_link(&ExternalEventLink {
            calendar_id: "work".into(),
            ..link.clone()
        })
        .unwrap();

        assert_eq!(
            db.get_link("user-1", "google", "primary", "b1").unwrap(),
            Some(relinked.clone())
        );
        assert_eq!(db.list_links("user-1", "google", "primary").unwrap(), vec![relinked]);

        assert!(db.remove_link("user-1", "google", "work", "b1").unwrap());
        assert!(!db.remove_link("user-1", "google", "work", "b1").unwrap());
        assert!(db.get_link("user-1", "google", "primary", "b1").unwrap().is_some());
        db.upsert_link(&ExternalEventLink {
            calendar_id: "work".into(),
            ..link.clone()
        })
        .unwrap();

        assert_eq!(db.remove_calendar_links("user-1", "google", "work").unwrap(), 1);
        assert_eq!(db.remove_block_links("b1").unwrap(), 1);
        assert!(db.get_link("user-1", "google", "primary", "b1").unwrap().is_none());
    }

    #[test]
    fn test_open_at_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeblock.db");
        {
            let db = ScheduleDb::open_at(&path).unwrap();
            db.save_schedule(&sample()).unwrap();
        }
        let db = ScheduleDb::open_at(&path).unwrap();
        assert_eq!(db.load_schedule("user-1", day()).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_block_type_is_reported() {
        let db = ScheduleDb::open_memory().unwrap();
        db.save_schedule(&sample()).unwrap();
        db.conn
            .execute("UPDATE time_blocks SET block_type = 'nap'", [])
            .unwrap();

        assert!(matches!(
            db.load_schedule("user-1", day()),
            Err(DatabaseError::CorruptRow { table: "time_blocks", .. })
        ));
    }
}
