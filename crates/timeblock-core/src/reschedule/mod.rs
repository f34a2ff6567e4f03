//! Missed-block repair.
//!
//! A block is missed once its end has passed without completion (or when it
//! was explicitly flagged). Repair moves each missed block into the first free
//! slot of the rest of the day, or of a caller-chosen day, and records one
//! [`RescheduleAttempt`] per block. There is no automatic retry: a block that
//! found no slot stays missed until the caller asks again.
//!
//! ```text
//! scheduled --(end passes)--> missed --attempt--> placed  (scheduled, new time)
//!     |                                      \--> no_slot
//!     \--(complete)--> completed              \--> failed
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ScheduleError;
use crate::schedule::{Schedule, TimeBlock};
use crate::scheduler::first_fit;
use crate::timeline::{SlotFinder, WorkingHours};

/// Terminal result of one repair attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Moved to a new interval
    Placed,
    /// No free slot large enough
    NoSlot,
    /// The model rejected the move
    Failed,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Placed => "placed",
            AttemptOutcome::NoSlot => "no_slot",
            AttemptOutcome::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "placed" => Some(AttemptOutcome::Placed),
            "no_slot" => Some(AttemptOutcome::NoSlot),
            "failed" => Some(AttemptOutcome::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded repair attempt. Attempts only accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleAttempt {
    pub block_id: String,
    /// Day the block was missed on
    pub schedule_date: NaiveDate,
    pub attempted_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
    pub new_start: Option<DateTime<Utc>>,
    pub new_end: Option<DateTime<Utc>>,
    pub detail: Option<String>,
}

impl RescheduleAttempt {
    fn new(block: &TimeBlock, date: NaiveDate, at: DateTime<Utc>, outcome: AttemptOutcome) -> Self {
        Self {
            block_id: block.id.clone(),
            schedule_date: date,
            attempted_at: at,
            outcome,
            new_start: None,
            new_end: None,
            detail: None,
        }
    }
}

/// What happened to one missed block in a repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleOutcome {
    pub title: String,
    /// Day the block lives on after the run
    pub target_date: NaiveDate,
    pub attempt: RescheduleAttempt,
}

impl RescheduleOutcome {
    pub fn is_placed(&self) -> bool {
        self.attempt.outcome == AttemptOutcome::Placed
    }
}

/// Repairs missed blocks inside working hours.
#[derive(Debug, Clone, Default)]
pub struct RescheduleEngine {
    hours: WorkingHours,
}

impl RescheduleEngine {
    pub fn new(hours: WorkingHours) -> Self {
        Self { hours }
    }

    pub fn working_hours(&self) -> &WorkingHours {
        &self.hours
    }

    /// Ids of blocks that a run at `now` would pick up, in start order.
    ///
    /// With `after`, only blocks starting at or after that instant qualify.
    pub fn missed_candidates(
        schedule: &Schedule,
        now: DateTime<Utc>,
        after: Option<DateTime<Utc>>,
    ) -> Vec<String> {
        schedule
            .missed_blocks_at(now)
            .filter(|b| after.map_or(true, |cutoff| b.start_time >= cutoff))
            .map(|b| b.id.clone())
            .collect()
    }

    /// Repair missed blocks of `source`.
    ///
    /// Replacements go into the remainder of the source day, or into `target`
    /// when given (blocks then move there keeping their ids). Blocks are
    /// handled in start order and each placed block occupies its new slot
    /// before the next one is considered.
    pub fn repair(
        &self,
        source: &mut Schedule,
        mut target: Option<&mut Schedule>,
        now: DateTime<Utc>,
        after: Option<DateTime<Utc>>,
    ) -> Vec<RescheduleOutcome> {
        let candidates = Self::missed_candidates(source, now, after);
        let mut outcomes = Vec::with_capacity(candidates.len());

        for block_id in candidates {
            let Some(block) = source.get(&block_id).cloned() else {
                continue;
            };
            let outcome = match target.as_deref_mut() {
                Some(dest) => self.repair_into(source, dest, block, now),
                None => self.repair_in_place(source, block, now),
            };
            info!(
                block_id = %outcome.attempt.block_id,
                outcome = %outcome.attempt.outcome,
                target_date = %outcome.target_date,
                "reschedule attempt"
            );
            outcomes.push(outcome);
        }

        outcomes
    }

    fn repair_in_place(
        &self,
        schedule: &mut Schedule,
        block: TimeBlock,
        now: DateTime<Utc>,
    ) -> RescheduleOutcome {
        let date = schedule.date;
        let mut attempt = RescheduleAttempt::new(&block, date, now, AttemptOutcome::NoSlot);

        if let Some((start, end)) = self.find_slot(schedule, &block, now) {
            match schedule.reschedule(&block.id, start, end) {
                Ok(()) => place(&mut attempt, start, end),
                Err(e) => fail(&mut attempt, &e),
            }
        }

        RescheduleOutcome {
            title: block.title,
            target_date: date,
            attempt,
        }
    }

    fn repair_into(
        &self,
        source: &mut Schedule,
        target: &mut Schedule,
        block: TimeBlock,
        now: DateTime<Utc>,
    ) -> RescheduleOutcome {
        let mut attempt = RescheduleAttempt::new(&block, source.date, now, AttemptOutcome::NoSlot);
        let mut target_date = source.date;

        if let Some((start, end)) = self.find_slot(target, &block, now) {
            match move_block(source, target, &block.id, start, end) {
                Ok(()) => {
                    place(&mut attempt, start, end);
                    target_date = target.date;
                }
                Err(e) => fail(&mut attempt, &e),
            }
        }

        RescheduleOutcome {
            title: block.title,
            target_date,
            attempt,
        }
    }

    /// First free interval of the block's length in what is left of the day.
    fn find_slot(
        &self,
        schedule: &Schedule,
        block: &TimeBlock,
        now: DateTime<Utc>,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let duration = block.duration();
        let window = self
            .hours
            .window_for(schedule.date)
            .and_then(|w| w.remaining_after(now))?;

        let mut slots = SlotFinder::new()
            .with_min_duration(duration)
            .find_around_blocks(
                schedule.blocks().iter().filter(|b| b.id != block.id),
                window.start,
                window.end,
            );
        let found = first_fit(&mut slots, duration);
        if found.is_none() {
            debug!(block_id = %block.id, date = %schedule.date, "no slot for missed block");
        }
        found
    }
}

/// Move a block between schedules. Both are left untouched on error.
fn move_block(
    source: &mut Schedule,
    target: &mut Schedule,
    block_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), ScheduleError> {
    let original = source.remove_block(block_id)?;
    if original.completed {
        let err = ScheduleError::InvalidTransition {
            block_id: original.id.clone(),
            from: "completed",
            to: "scheduled",
        };
        source.insert_block(original)?;
        return Err(err);
    }

    let mut moved = original.clone();
    moved.start_time = start;
    moved.end_time = end;
    moved.missed = false;

    if let Err(e) = target.insert_block(moved) {
        source.insert_block(original)?;
        return Err(e);
    }
    Ok(())
}

fn place(attempt: &mut RescheduleAttempt, start: DateTime<Utc>, end: DateTime<Utc>) {
    attempt.outcome = AttemptOutcome::Placed;
    attempt.new_start = Some(start);
    attempt.new_end = Some(end);
}

fn fail(attempt: &mut RescheduleAttempt, err: &ScheduleError) {
    warn!(block_id = %attempt.block_id, error = %err, "reschedule rejected");
    attempt.outcome = AttemptOutcome::Failed;
    attempt.detail = Some(err.to_string());
}
