//! Greedy auto-scheduler.
//!
//! Places ranked items into free slots, first fit:
//! - Items are visited by ascending `priority` rank; ties keep input order
//! - Each item goes into the earliest slot with enough remaining capacity
//! - A placement consumes the slot from the front
//! - Items that fit nowhere are reported as failed, never dropped
//!
//! This is not a bin-packing solver. Results are deterministic and each
//! placement can be explained by the rank order alone.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::schedule::{BlockType, Schedule};
use crate::timeline::Slot;

/// Kind of schedulable work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Task,
    Habit,
    Meeting,
}

impl ItemType {
    /// Block type used when the item is placed.
    pub fn block_type(&self) -> BlockType {
        match self {
            ItemType::Task => BlockType::Task,
            ItemType::Habit => BlockType::Habit,
            ItemType::Meeting => BlockType::Meeting,
        }
    }
}

/// A candidate for placement. Built per run by the caller, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulableItem {
    pub id: String,
    pub item_type: ItemType,
    pub title: String,
    /// Rank; lower is more urgent
    pub priority: i32,
    pub duration_minutes: i64,
    pub due_date: Option<DateTime<Utc>>,
}

impl SchedulableItem {
    pub fn new(
        id: impl Into<String>,
        item_type: ItemType,
        title: impl Into<String>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            id: id.into(),
            item_type,
            title: title.into(),
            priority: 0,
            duration_minutes,
            due_date: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes)
    }
}

/// Where the planner put one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub item_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Pure placement plan, before anything touches a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementPlan {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<String>,
    /// Slots left over after all placements
    pub remaining: Vec<Slot>,
}

/// Outcome of an auto-schedule run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScheduleResult {
    pub scheduled_count: usize,
    pub failed_count: usize,
    pub placed_block_ids: Vec<String>,
    pub failed_item_ids: Vec<String>,
}

/// Greedy first-fit scheduler.
#[derive(Debug, Clone, Default)]
pub struct AutoScheduler;

impl AutoScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Assign items to slots without mutating anything.
    ///
    /// `slots` must be in chronological order (as the slot finder returns them).
    pub fn plan(&self, items: &[SchedulableItem], slots: &[Slot]) -> PlacementPlan {
        let mut order: Vec<&SchedulableItem> = items.iter().collect();
        // sort_by_key is stable, so equal ranks keep input order
        order.sort_by_key(|item| item.priority);

        let mut remaining: Vec<Slot> = slots.to_vec();
        let mut plan = PlacementPlan::default();

        for item in order {
            let duration = item.duration();
            if duration <= Duration::zero() {
                plan.unplaced.push(item.id.clone());
                continue;
            }

            match first_fit(&mut remaining, duration) {
                Some((start, end)) => plan.placements.push(Placement {
                    item_id: item.id.clone(),
                    start_time: start,
                    end_time: end,
                }),
                None => plan.unplaced.push(item.id.clone()),
            }
        }

        remaining.retain(|slot| slot.end_time > slot.start_time);
        plan.remaining = remaining;
        plan
    }

    /// Plan and commit placements into `schedule`.
    ///
    /// Each placement goes through [`Schedule::add_block`], so invariants are
    /// re-checked; a rejected placement counts as failed.
    pub fn schedule_into(
        &self,
        schedule: &mut Schedule,
        items: &[SchedulableItem],
        slots: &[Slot],
    ) -> AutoScheduleResult {
        let plan = self.plan(items, slots);
        let mut result = AutoScheduleResult::default();

        for placement in plan.placements {
            let Some(item) = items.iter().find(|i| i.id == placement.item_id) else {
                continue;
            };
            match schedule.add_block(
                item.item_type.block_type(),
                item.title.clone(),
                placement.start_time,
                placement.end_time,
                Some(item.id.clone()),
            ) {
                Ok(block) => {
                    debug!(
                        item_id = %item.id,
                        block_id = %block.id,
                        start = %block.start_time,
                        end = %block.end_time,
                        "placed item"
                    );
                    result.placed_block_ids.push(block.id);
                }
                Err(e) => {
                    debug!(item_id = %item.id, error = %e, "placement rejected by schedule");
                    result.failed_item_ids.push(item.id.clone());
                }
            }
        }

        for item_id in plan.unplaced {
            debug!(item_id = %item_id, "no slot fits item");
            result.failed_item_ids.push(item_id);
        }

        result.scheduled_count = result.placed_block_ids.len();
        result.failed_count = result.failed_item_ids.len();
        info!(
            user_id = %schedule.user_id,
            date = %schedule.date,
            scheduled = result.scheduled_count,
            failed = result.failed_count,
            "auto-schedule finished"
        );
        result
    }
}

/// Take `duration` from the front of the first slot that can hold it.
pub(crate) fn first_fit(
    slots: &mut [Slot],
    duration: Duration,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let slot = slots.iter_mut().find(|slot| slot.can_fit(duration))?;
    let start = slot.start_time;
    let end = start + duration;
    slot.start_time = end;
    Some((start, end))
}
