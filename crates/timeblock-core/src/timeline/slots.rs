//! Free-slot detection within a working window.
//!
//! Existing blocks are treated as busy intervals. The finder walks the
//! window left to right and emits every gap long enough to be useful.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::{Schedule, TimeBlock};

/// A free interval `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Slot {
    /// Create a slot. Returns `None` for an empty or inverted interval.
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Option<Self> {
        (end_time > start_time).then_some(Self {
            start_time,
            end_time,
        })
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Get duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Check if this slot can hold an item of the given length
    pub fn can_fit(&self, duration: Duration) -> bool {
        self.duration() >= duration
    }
}

/// Finds free slots between busy intervals.
#[derive(Debug, Clone)]
pub struct SlotFinder {
    min_duration: Duration,
}

impl SlotFinder {
    /// Create a finder that reports every non-empty gap.
    pub fn new() -> Self {
        Self {
            min_duration: Duration::zero(),
        }
    }

    /// Only report gaps at least this long.
    pub fn with_min_duration(mut self, min_duration: Duration) -> Self {
        self.min_duration = min_duration.max(Duration::zero());
        self
    }

    /// Find gaps in `[day_start, day_end)` around `busy` intervals.
    ///
    /// `busy` must be ordered by start time. Intervals are clipped to the
    /// window; ones fully outside it are ignored. Runs in one pass.
    pub fn find_gaps<I>(&self, busy: I, day_start: DateTime<Utc>, day_end: DateTime<Utc>) -> Vec<Slot>
    where
        I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
    {
        let mut slots = Vec::new();
        if day_end <= day_start {
            return slots;
        }

        let mut cursor = day_start;
        for (start, end) in busy {
            let start = start.max(day_start);
            let end = end.min(day_end);

            if start >= day_end {
                break;
            }
            if end <= cursor {
                continue;
            }
            if start > cursor {
                self.push_gap(&mut slots, cursor, start);
            }
            cursor = cursor.max(end);
        }

        if cursor < day_end {
            self.push_gap(&mut slots, cursor, day_end);
        }

        slots
    }

    /// Find gaps around a sequence of blocks (already in start order).
    pub fn find_around_blocks<'a, I>(
        &self,
        blocks: I,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Vec<Slot>
    where
        I: IntoIterator<Item = &'a TimeBlock>,
    {
        self.find_gaps(
            blocks.into_iter().map(|b| (b.start_time, b.end_time)),
            day_start,
            day_end,
        )
    }

    /// Find gaps in a schedule.
    pub fn find_in_schedule(
        &self,
        schedule: &Schedule,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Vec<Slot> {
        self.find_around_blocks(schedule.blocks(), day_start, day_end)
    }

    fn push_gap(&self, slots: &mut Vec<Slot>, start: DateTime<Utc>, end: DateTime<Utc>) {
        if let Some(slot) = Slot::new(start, end) {
            if slot.can_fit(self.min_duration) {
                slots.push(slot);
            }
        }
    }
}

impl Default for SlotFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function: free slots of at least `min_duration` in a schedule.
pub fn find_available_slots(
    schedule: &Schedule,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    min_duration: Duration,
) -> Vec<Slot> {
    SlotFinder::new()
        .with_min_duration(min_duration)
        .find_in_schedule(schedule, day_start, day_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::BlockType;
    use chrono::{NaiveDate, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn schedule() -> Schedule {
        Schedule::new("user-1", NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    }

    #[test]
    fn test_single_meeting_splits_day() {
        let mut s = schedule();
        s.add_block(BlockType::Meeting, "sync", at(10, 0), at(11, 0), None)
            .unwrap();

        let slots = find_available_slots(&s, at(8, 0), at(18, 0), Duration::minutes(30));
        assert_eq!(slots.len(), 2);
        assert_eq!((slots[0].start_time, slots[0].end_time), (at(8, 0), at(10, 0)));
        assert_eq!(slots[0].duration_minutes(), 120);
        assert_eq!((slots[1].start_time, slots[1].end_time), (at(11, 0), at(18, 0)));
        assert_eq!(slots[1].duration_minutes(), 420);
    }

    #[test]
    fn test_short_gaps_filtered_by_minimum() {
        let mut s = schedule();
        s.add_block(BlockType::Task, "a", at(8, 0), at(9, 0), None).unwrap();
        s.add_block(BlockType::Task, "b", at(9, 20), at(12, 0), None).unwrap();

        let slots = find_available_slots(&s, at(8, 0), at(12, 0), Duration::minutes(30));
        assert!(slots.is_empty());

        let slots = find_available_slots(&s, at(8, 0), at(12, 0), Duration::minutes(15));
        assert_eq!(slots, vec![Slot::new(at(9, 0), at(9, 20)).unwrap()]);
    }

    #[test]
    fn test_blocks_clipped_to_window() {
        let mut s = schedule();
        s.add_block(BlockType::Task, "early", at(6, 0), at(9, 0), None).unwrap();
        s.add_block(BlockType::Task, "late", at(17, 0), at(20, 0), None).unwrap();

        let slots = find_available_slots(&s, at(8, 0), at(18, 0), Duration::zero());
        assert_eq!(slots, vec![Slot::new(at(9, 0), at(17, 0)).unwrap()]);
    }

    #[test]
    fn test_fully_booked_window_is_empty_list() {
        let mut s = schedule();
        s.add_block(BlockType::Focus, "all day", at(7, 0), at(19, 0), None).unwrap();

        let slots = find_available_slots(&s, at(8, 0), at(18, 0), Duration::zero());
        assert!(slots.is_empty());
    }

    #[test]
    fn test_empty_schedule_is_whole_window() {
        let slots = find_available_slots(&schedule(), at(8, 0), at(18, 0), Duration::minutes(30));
        assert_eq!(slots, vec![Slot::new(at(8, 0), at(18, 0)).unwrap()]);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let slots = find_available_slots(&schedule(), at(18, 0), at(8, 0), Duration::zero());
        assert!(slots.is_empty());
    }

    #[test]
    fn test_slot_rejects_empty_interval() {
        assert!(Slot::new(at(9, 0), at(9, 0)).is_none());
        assert!(Slot::new(at(9, 0), at(8, 0)).is_none());
    }
}
