//! The schedule-for-a-day aggregate.
//!
//! A [`Schedule`] owns the [`TimeBlock`]s of one user on one calendar day and
//! is the only place blocks are mutated. Every write re-checks two invariants
//! before committing:
//!
//! - each block satisfies `end_time > start_time`
//! - no two blocks overlap under half-open `[start, end)` semantics
//!
//! Blocks are kept ordered by `start_time`, which the slot finder relies on.
//! Counters are always derived from the block list.

mod block;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

pub use block::{BlockStatus, BlockType, TimeBlock};

/// Derived counters for a schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub block_count: usize,
    pub total_scheduled_minutes: i64,
    pub completed_count: usize,
    pub missed_count: usize,
    pub pending_count: usize,
}

/// All time blocks of one user on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    blocks: Vec<TimeBlock>,
}

impl Schedule {
    /// Create an empty schedule with a fresh id.
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            date,
            blocks: Vec::new(),
        }
    }

    /// Rebuild a schedule from stored parts, validating every invariant.
    pub fn from_parts(
        id: impl Into<String>,
        user_id: impl Into<String>,
        date: NaiveDate,
        blocks: Vec<TimeBlock>,
    ) -> Result<Self, ScheduleError> {
        let mut schedule = Self {
            id: id.into(),
            user_id: user_id.into(),
            date,
            blocks: Vec::with_capacity(blocks.len()),
        };
        for block in blocks {
            schedule.insert_block(block)?;
        }
        Ok(schedule)
    }

    /// Blocks ordered by start time.
    pub fn blocks(&self) -> &[TimeBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn get(&self, block_id: &str) -> Option<&TimeBlock> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    pub fn contains(&self, block_id: &str) -> bool {
        self.get(block_id).is_some()
    }

    /// Add a new block.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidInterval`] when `end <= start`,
    /// [`ScheduleError::Overlap`] when the interval intersects an existing block.
    /// The schedule is unchanged on error.
    pub fn add_block(
        &mut self,
        block_type: BlockType,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        reference_id: Option<String>,
    ) -> Result<TimeBlock, ScheduleError> {
        let block = TimeBlock {
            id: TimeBlock::generate_id(),
            schedule_id: self.id.clone(),
            block_type,
            reference_id,
            title: title.into(),
            start_time: start,
            end_time: end,
            completed: false,
            missed: false,
        };
        self.insert_block(block.clone())?;
        Ok(block)
    }

    /// Insert an existing block, taking ownership of it.
    ///
    /// Used when loading from storage and when a block moves to another day.
    /// The block keeps its id; its `schedule_id` is rewritten.
    pub fn insert_block(&mut self, mut block: TimeBlock) -> Result<(), ScheduleError> {
        validate_interval(block.start_time, block.end_time)?;
        if self.contains(&block.id) {
            return Err(ScheduleError::DuplicateBlock(block.id));
        }
        self.check_overlap(block.start_time, block.end_time, None)?;
        block.schedule_id = self.id.clone();
        let at = self.blocks.partition_point(|b| b.start_time <= block.start_time);
        self.blocks.insert(at, block);
        Ok(())
    }

    /// Remove a block and return it.
    pub fn remove_block(&mut self, block_id: &str) -> Result<TimeBlock, ScheduleError> {
        let index = self.index_of(block_id)?;
        Ok(self.blocks.remove(index))
    }

    /// Mark a block completed. Clears a previous missed flag.
    pub fn mark_completed(&mut self, block_id: &str) -> Result<(), ScheduleError> {
        let index = self.index_of(block_id)?;
        let block = &mut self.blocks[index];
        block.completed = true;
        block.missed = false;
        Ok(())
    }

    /// Mark a block missed.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidTransition`] if the block is already completed.
    pub fn mark_missed(&mut self, block_id: &str) -> Result<(), ScheduleError> {
        let index = self.index_of(block_id)?;
        let block = &mut self.blocks[index];
        if block.completed {
            return Err(ScheduleError::InvalidTransition {
                block_id: block.id.clone(),
                from: BlockStatus::Completed.as_str(),
                to: BlockStatus::Missed.as_str(),
            });
        }
        block.missed = true;
        Ok(())
    }

    /// Move a block to a new interval. The block returns to the scheduled state.
    ///
    /// # Errors
    /// Invalid interval, overlap with another block (the moved block itself is
    /// excluded from the check), unknown id, or a completed block.
    pub fn reschedule(
        &mut self,
        block_id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<(), ScheduleError> {
        validate_interval(new_start, new_end)?;
        let index = self.index_of(block_id)?;
        if self.blocks[index].completed {
            return Err(ScheduleError::InvalidTransition {
                block_id: block_id.to_string(),
                from: BlockStatus::Completed.as_str(),
                to: BlockStatus::Scheduled.as_str(),
            });
        }
        self.check_overlap(new_start, new_end, Some(block_id))?;

        let mut block = self.blocks.remove(index);
        block.start_time = new_start;
        block.end_time = new_end;
        block.missed = false;
        let at = self.blocks.partition_point(|b| b.start_time <= new_start);
        self.blocks.insert(at, block);
        Ok(())
    }

    /// Check `[start, end)` against every block except `exclude`.
    pub fn check_overlap(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<&str>,
    ) -> Result<(), ScheduleError> {
        let conflict = self
            .blocks
            .iter()
            .filter(|b| Some(b.id.as_str()) != exclude)
            .find(|b| b.overlaps(start, end));

        match conflict {
            Some(b) => Err(ScheduleError::Overlap {
                conflicting_id: b.id.clone(),
                start,
                end,
            }),
            None => Ok(()),
        }
    }

    /// Blocks classified as missed at `now`, in start order.
    pub fn missed_blocks_at(&self, now: DateTime<Utc>) -> impl Iterator<Item = &TimeBlock> {
        self.blocks
            .iter()
            .filter(move |b| b.status_at(now) == BlockStatus::Missed)
    }

    /// Derived counters from the stored flags only. A block whose end has
    /// passed without being marked counts as pending; use [`Self::summary_at`]
    /// for read-time classification.
    pub fn summary(&self) -> ScheduleSummary {
        self.tally(|b| {
            if b.completed {
                BlockStatus::Completed
            } else if b.missed {
                BlockStatus::Missed
            } else {
                BlockStatus::Scheduled
            }
        })
    }

    /// Derived counters with every block classified by [`TimeBlock::status_at`].
    pub fn summary_at(&self, now: DateTime<Utc>) -> ScheduleSummary {
        self.tally(|b| b.status_at(now))
    }

    fn tally(&self, classify: impl Fn(&TimeBlock) -> BlockStatus) -> ScheduleSummary {
        self.blocks.iter().fold(
            ScheduleSummary {
                block_count: self.blocks.len(),
                ..Default::default()
            },
            |mut acc, b| {
                acc.total_scheduled_minutes += b.duration_minutes();
                match classify(b) {
                    BlockStatus::Completed => acc.completed_count += 1,
                    BlockStatus::Missed => acc.missed_count += 1,
                    BlockStatus::Scheduled | BlockStatus::InProgress => acc.pending_count += 1,
                }
                acc
            },
        )
    }

    fn index_of(&self, block_id: &str) -> Result<usize, ScheduleError> {
        self.blocks
            .iter()
            .position(|b| b.id == block_id)
            .ok_or_else(|| ScheduleError::BlockNotFound(block_id.to_string()))
    }
}

fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ScheduleError> {
    if end <= start {
        return Err(ScheduleError::InvalidInterval { start, end });
    }
    Ok(())
}
