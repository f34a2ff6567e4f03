//! # Timeblock Core Library
//!
//! Scheduling engine for per-user, per-day time blocks. It keeps each day
//! free of overlaps, finds free time, ranks work, places it greedily,
//! repairs missed blocks and mirrors the result to an external calendar.
//!
//! ## Architecture
//!
//! - **Schedule**: The per-day aggregate that owns its blocks and enforces
//!   the no-overlap invariant on every write
//! - **Timeline**: Free-slot detection, working-day windows and priority scoring
//! - **Scheduler**: Greedy first-fit placement of ranked items into free slots
//! - **Reschedule**: Repair of missed blocks with an append-only attempt log
//! - **Sync**: Calendar reconciliation through a provider trait (Google Calendar)
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`Planner`]: Caller-facing service over all of the above
//! - [`Schedule`]: One user-day of blocks
//! - [`SlotFinder`]: Gap detection inside a window
//! - [`PriorityScorer`]: Weighted, explainable ranking
//! - [`CalendarReconciler`]: Push, pull and conflict checks against a calendar

pub mod error;
pub mod reschedule;
pub mod schedule;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod sync;
pub mod timeline;

pub use error::{ConfigError, CoreError, DatabaseError, ProviderError, ScheduleError, SyncError};
pub use reschedule::{AttemptOutcome, RescheduleAttempt, RescheduleEngine, RescheduleOutcome};
pub use schedule::{BlockStatus, BlockType, Schedule, ScheduleSummary, TimeBlock};
pub use scheduler::{AutoScheduleResult, AutoScheduler, ItemType, SchedulableItem};
pub use service::{Planner, PlannerStore};
pub use storage::{Config, ScheduleDb};
pub use sync::{CalendarEvent, CalendarProvider, CalendarReconciler, EventFilter, SyncSummary};
pub use timeline::{DayWindow, PriorityScorer, Slot, SlotFinder, WorkingHours};
