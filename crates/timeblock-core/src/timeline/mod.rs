//! Timeline analysis: free slots, working-day windows and priority scoring.
//!
//! Everything here is a pure function of its inputs and needs no locking.

mod priority;
mod slots;
mod window;

pub use priority::{
    clamp01, Candidate, PriorityLabel, PriorityScore, PriorityScorer, PrioritySignals,
    PriorityWeights, RankedItem, ScoreBreakdown, DUE_HORIZON_DAYS, EFFORT_HORIZON_HOURS,
};
pub use slots::{find_available_slots, Slot, SlotFinder};
pub use window::{parse_hhmm, DayWindow, WorkingHours};
