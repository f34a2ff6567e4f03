//! Property tests for the scheduling invariants.
//!
//! Times are generated as minute offsets from 08:00 UTC on a fixed day so
//! that shrunk counterexamples stay readable.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use timeblock_core::timeline::{PriorityLabel, PrioritySignals};
use timeblock_core::{
    AutoScheduler, BlockType, ItemType, PriorityScorer, SchedulableItem, Schedule, Slot,
    SlotFinder,
};

const WINDOW_MINUTES: i64 = 600;

fn day_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
}

fn at(minutes: i64) -> DateTime<Utc> {
    day_start() + Duration::minutes(minutes)
}

fn empty_schedule() -> Schedule {
    Schedule::new("prop-user", NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
}

/// Try to add every interval; rejected ones are simply skipped.
fn build_schedule(intervals: &[(i64, i64)]) -> Schedule {
    let mut schedule = empty_schedule();
    for (i, (offset, len)) in intervals.iter().enumerate() {
        let _ = schedule.add_block(
            BlockType::Task,
            format!("block {i}"),
            at(*offset),
            at(offset + len),
            None,
        );
    }
    schedule
}

fn intervals() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((-60i64..WINDOW_MINUTES + 60, 1i64..180), 0..24)
}

fn label() -> impl Strategy<Value = Option<PriorityLabel>> {
    prop_oneof![
        Just(None),
        Just(Some(PriorityLabel::Unprioritized)),
        Just(Some(PriorityLabel::Low)),
        Just(Some(PriorityLabel::Medium)),
        Just(Some(PriorityLabel::High)),
        Just(Some(PriorityLabel::Urgent)),
    ]
}

fn label_rank(label: Option<PriorityLabel>) -> u8 {
    match label {
        None => 0,
        Some(PriorityLabel::Unprioritized) => 1,
        Some(PriorityLabel::Low) => 2,
        Some(PriorityLabel::Medium) => 3,
        Some(PriorityLabel::High) => 4,
        Some(PriorityLabel::Urgent) => 5,
    }
}

proptest! {
    #[test]
    fn prop_blocks_never_overlap_and_stay_ordered(input in intervals()) {
        let schedule = build_schedule(&input);
        let blocks = schedule.blocks();

        for pair in blocks.windows(2) {
            prop_assert!(pair[0].start_time <= pair[1].start_time);
        }
        for (i, a) in blocks.iter().enumerate() {
            prop_assert!(a.end_time > a.start_time);
            for b in &blocks[i + 1..] {
                prop_assert!(!a.overlaps(b.start_time, b.end_time));
            }
        }
    }

    #[test]
    fn prop_slots_and_blocks_partition_the_window(input in intervals()) {
        let schedule = build_schedule(&input);
        let (start, end) = (at(0), at(WINDOW_MINUTES));
        let slots = SlotFinder::new().find_in_schedule(&schedule, start, end);

        let free: i64 = slots.iter().map(|s| s.duration_minutes()).sum();
        let busy: i64 = schedule
            .blocks()
            .iter()
            .map(|b| (b.end_time.min(end) - b.start_time.max(start)).num_minutes().max(0))
            .sum();
        prop_assert_eq!(free + busy, WINDOW_MINUTES);

        for slot in &slots {
            prop_assert!(slot.start_time >= start && slot.end_time <= end);
            for block in schedule.blocks() {
                prop_assert!(!block.overlaps(slot.start_time, slot.end_time));
            }
        }
    }

    #[test]
    fn prop_min_duration_filters_short_gaps(input in intervals(), min in 0i64..120) {
        let schedule = build_schedule(&input);
        let slots = SlotFinder::new()
            .with_min_duration(Duration::minutes(min))
            .find_in_schedule(&schedule, at(0), at(WINDOW_MINUTES));
        for slot in slots {
            prop_assert!(slot.duration_minutes() >= min);
        }
    }

    #[test]
    fn prop_higher_label_never_scores_lower(
        a in label(),
        b in label(),
        minutes in 0i64..600,
    ) {
        let scorer = PriorityScorer::new(day_start());
        let (low, high) = if label_rank(a) <= label_rank(b) { (a, b) } else { (b, a) };
        let low_score = scorer.score(&PrioritySignals::new(low, minutes)).score;
        let high_score = scorer.score(&PrioritySignals::new(high, minutes)).score;
        prop_assert!(high_score >= low_score);
    }

    #[test]
    fn prop_closer_due_date_never_scores_lower(near in 0i64..30 * 24, far in 0i64..30 * 24) {
        let scorer = PriorityScorer::new(day_start());
        let (near, far) = (near.min(far), near.max(far));
        let signals = |hours: i64| {
            PrioritySignals::new(Some(PriorityLabel::Medium), 60)
                .with_due_date(day_start() + Duration::hours(hours))
        };
        prop_assert!(scorer.score(&signals(near)).score >= scorer.score(&signals(far)).score);
    }

    #[test]
    fn prop_shorter_items_never_score_lower(short in 0i64..1000, long in 0i64..1000) {
        let scorer = PriorityScorer::new(day_start());
        let (short, long) = (short.min(long), short.max(long));
        let score = |m: i64| scorer.score(&PrioritySignals::new(None, m)).score;
        prop_assert!(score(short) >= score(long));
    }

    #[test]
    fn prop_scores_stay_in_unit_range(
        label in label(),
        minutes in -1000i64..10_000,
        due_hours in prop::option::of(-1000i64..1000),
        streak in prop::num::f64::ANY,
        cadence in prop::num::f64::ANY,
    ) {
        let scorer = PriorityScorer::new(day_start());
        let mut signals = PrioritySignals::new(label, minutes)
            .with_streak_risk(streak)
            .with_meeting_cadence(cadence);
        if let Some(h) = due_hours {
            signals = signals.with_due_date(day_start() + Duration::hours(h));
        }
        let score = scorer.score(&signals).score;
        prop_assert!(score.is_finite());
        prop_assert!((0.0..=1.0 + 1e-9).contains(&score));
    }

    #[test]
    fn prop_every_item_is_placed_or_reported(
        input in intervals(),
        items in prop::collection::vec((0i64..240, 0i32..5), 0..12),
    ) {
        let mut schedule = build_schedule(&input);
        let slots = SlotFinder::new().find_in_schedule(&schedule, at(0), at(WINDOW_MINUTES));
        let items: Vec<SchedulableItem> = items
            .iter()
            .enumerate()
            .map(|(i, (minutes, rank))| {
                SchedulableItem::new(format!("item-{i}"), ItemType::Task, format!("item {i}"), *minutes)
                    .with_priority(*rank)
            })
            .collect();
        let before = schedule.len();

        let result = AutoScheduler::new().schedule_into(&mut schedule, &items, &slots);

        prop_assert_eq!(result.scheduled_count + result.failed_count, items.len());
        prop_assert_eq!(schedule.len(), before + result.scheduled_count);
        for block_id in &result.placed_block_ids {
            let block = schedule.get(block_id).unwrap();
            prop_assert!(block.start_time >= at(0) && block.end_time <= at(WINDOW_MINUTES));
        }
    }
}

#[test]
fn worked_example_meeting_splits_working_day() {
    let mut schedule = empty_schedule();
    schedule
        .add_block(BlockType::Meeting, "standup", at(120), at(180), None)
        .unwrap();

    let slots = SlotFinder::new().find_in_schedule(&schedule, at(0), at(WINDOW_MINUTES));
    let spans: Vec<_> = slots.iter().map(|s| (s.start_time, s.end_time)).collect();
    assert_eq!(spans, vec![(at(0), at(120)), (at(180), at(600))]);
}

#[test]
fn worked_example_urgent_item_goes_first() {
    let mut schedule = empty_schedule();
    let slots = vec![
        Slot::new(at(0), at(60)).unwrap(),
        Slot::new(at(60), at(120)).unwrap(),
    ];
    let items = vec![
        SchedulableItem::new("low", ItemType::Task, "Low", 60).with_priority(2),
        SchedulableItem::new("urgent", ItemType::Task, "Urgent", 30).with_priority(1),
    ];

    let result = AutoScheduler::new().schedule_into(&mut schedule, &items, &slots);
    assert_eq!(result.scheduled_count, 2);
    assert_eq!(result.failed_count, 0);

    let placed: Vec<_> = schedule
        .blocks()
        .iter()
        .map(|b| (b.reference_id.clone().unwrap(), b.start_time, b.end_time))
        .collect();
    assert_eq!(
        placed,
        vec![
            ("urgent".to_string(), at(0), at(30)),
            ("low".to_string(), at(60), at(120)),
        ]
    );
}
