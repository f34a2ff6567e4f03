//! A single scheduled interval on a user's day.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Type of time block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Work on a task
    Task,
    /// A recurring habit
    Habit,
    /// A recurring meeting
    Meeting,
    /// Unattached deep-work block
    Focus,
    /// Rest
    Break,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Task => "task",
            BlockType::Habit => "habit",
            BlockType::Meeting => "meeting",
            BlockType::Focus => "focus",
            BlockType::Break => "break",
        }
    }

    /// Parse the storage representation. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "task" => Some(BlockType::Task),
            "habit" => Some(BlockType::Habit),
            "meeting" => Some(BlockType::Meeting),
            "focus" => Some(BlockType::Focus),
            "break" => Some(BlockType::Break),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-time classification of a block.
///
/// Missed detection is not driven by a timer: a block whose end has passed
/// without completion is classified as missed whenever it is looked at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Scheduled,
    InProgress,
    Completed,
    Missed,
}

impl BlockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockStatus::Scheduled => "scheduled",
            BlockStatus::InProgress => "in_progress",
            BlockStatus::Completed => "completed",
            BlockStatus::Missed => "missed",
        }
    }
}

/// One scheduled interval, owned by exactly one [`Schedule`](super::Schedule).
///
/// The interval is half-open: `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: String,
    pub schedule_id: String,
    pub block_type: BlockType,
    pub reference_id: Option<String>,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub completed: bool,
    pub missed: bool,
}

impl TimeBlock {
    /// Generate a fresh block id.
    ///
    /// Ids are 32 lowercase hex characters, which calendar providers accept
    /// as client-chosen event keys.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Get duration of the block.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    /// Neither completed nor missed.
    pub fn is_pending(&self) -> bool {
        !self.completed && !self.missed
    }

    /// Classify the block as seen at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> BlockStatus {
        if self.completed {
            BlockStatus::Completed
        } else if self.missed || self.end_time <= now {
            BlockStatus::Missed
        } else if self.start_time <= now {
            BlockStatus::InProgress
        } else {
            BlockStatus::Scheduled
        }
    }
}
