//! Planner: the caller-facing service.
//!
//! Wires the schedule model, slot finder, scorer, auto-scheduler, reschedule
//! engine and calendar reconciler to a store. Schedules are loaded per call
//! and written back after every successful mutation; a schedule that ends up
//! without blocks is deleted by the store.
//!
//! Mutating methods take `&mut self`, so one planner serializes its writes.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, CoreError, Result, ScheduleError, SyncError};
use crate::reschedule::{RescheduleAttempt, RescheduleEngine, RescheduleOutcome};
use crate::schedule::{BlockType, Schedule, TimeBlock};
use crate::scheduler::{AutoScheduleResult, AutoScheduler, SchedulableItem};
use crate::storage::{AttemptLog, Config, EventLinkStore, ScheduleDb, ScheduleRepository};
use crate::sync::{
    CalendarEvent, CalendarReconciler, EventFilter, GoogleCalendarProvider, PruneScope,
    SyncSummary, TokenSource,
};
use crate::timeline::{Candidate, DayWindow, PriorityScorer, RankedItem, Slot, SlotFinder, WorkingHours};

/// Storage the planner needs: schedules, the attempt log and event links.
pub trait PlannerStore: ScheduleRepository + AttemptLog + EventLinkStore {}

impl<T: ScheduleRepository + AttemptLog + EventLinkStore> PlannerStore for T {}

/// Scheduling service for one store and one optional calendar.
pub struct Planner<S: PlannerStore = ScheduleDb> {
    store: S,
    config: Config,
    hours: WorkingHours,
    reconciler: Option<CalendarReconciler>,
}

impl Planner<ScheduleDb> {
    /// Open the default database with the configuration from disk.
    pub fn open() -> Result<Self> {
        let config = Config::load_or_default();
        let db = ScheduleDb::open()?;
        Self::new(db, config)
    }
}

impl<S: PlannerStore> Planner<S> {
    /// # Errors
    /// [`ConfigError::InvalidValue`] when the working hours do not resolve.
    pub fn new(store: S, config: Config) -> Result<Self> {
        let hours = config.schedule.working_hours()?;
        Ok(Self {
            store,
            config,
            hours,
            reconciler: None,
        })
    }

    /// Attach a calendar reconciler.
    pub fn with_reconciler(mut self, reconciler: CalendarReconciler) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Connect Google Calendar using the `[sync]` configuration.
    pub fn connect_google(&mut self, tokens: Arc<dyn TokenSource>) -> Result<()> {
        let provider = GoogleCalendarProvider::with_base_url(&self.config.sync.api_base_url)?;
        let reconciler =
            CalendarReconciler::new(Arc::new(provider), tokens, self.config.sync.reconciler_config());
        info!(
            calendar_id = %reconciler.config().calendar_id,
            "calendar connected"
        );
        self.reconciler = Some(reconciler);
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_connected(&self) -> bool {
        self.reconciler.is_some()
    }

    /// Working window of `date` from the configured hours.
    pub fn day_window(&self, date: NaiveDate) -> Result<DayWindow> {
        self.hours.window_for(date).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "schedule".to_string(),
                message: format!("working hours do not resolve on {date}"),
            }
            .into()
        })
    }

    /// Local day of `date`, stretched over working hours that run past midnight.
    pub fn day_span(&self, date: NaiveDate) -> Result<DayWindow> {
        self.hours.day_span(date).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "schedule.utc_offset_minutes".to_string(),
                message: format!("midnight does not resolve on {date}"),
            }
            .into()
        })
    }

    fn ensure_on_day(
        &self,
        date: NaiveDate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        let span = self.day_span(date)?;
        if start < span.end && end > span.start {
            return Ok(());
        }
        Err(ScheduleError::OutsideDay { date, start, end }.into())
    }

    /// The schedule of a day. Days never written to come back empty.
    pub fn get_schedule(&self, user_id: &str, date: NaiveDate) -> Result<Schedule> {
        Ok(self
            .store
            .load_schedule(user_id, date)?
            .unwrap_or_else(|| Schedule::new(user_id, date)))
    }

    /// Free slots of at least `min_duration` inside `[day_start, day_end)`.
    pub fn find_available_slots(
        &self,
        user_id: &str,
        date: NaiveDate,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        min_duration: Duration,
    ) -> Result<Vec<Slot>> {
        let schedule = self.get_schedule(user_id, date)?;
        Ok(SlotFinder::new()
            .with_min_duration(min_duration)
            .find_in_schedule(&schedule, day_start, day_end))
    }

    /// Free slots in the working window using the configured minimum length.
    pub fn free_slots(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Slot>> {
        let window = self.day_window(date)?;
        self.find_available_slots(
            user_id,
            date,
            window.start,
            window.end,
            self.config.schedule.min_slot(),
        )
    }

    pub fn add_block(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        block_type: BlockType,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        reference_id: Option<String>,
    ) -> Result<TimeBlock> {
        self.ensure_on_day(date, start, end)?;
        let mut schedule = self.get_schedule(user_id, date)?;
        let block = schedule.add_block(block_type, title, start, end, reference_id)?;
        self.store.save_schedule(&schedule)?;
        debug!(user_id, block_id = %block.id, "block added");
        Ok(block)
    }

    /// Remove a block together with its calendar links. Its attempt trail stays.
    pub fn remove_block(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        block_id: &str,
    ) -> Result<TimeBlock> {
        let mut schedule = self.get_schedule(user_id, date)?;
        let block = schedule.remove_block(block_id)?;
        self.store.save_schedule(&schedule)?;
        let links = self.store.remove_block_links(block_id)?;
        debug!(user_id, block_id, links, "block removed");
        Ok(block)
    }

    pub fn complete_block(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        block_id: &str,
    ) -> Result<TimeBlock> {
        self.update_block(user_id, date, block_id, |s| s.mark_completed(block_id))
    }

    pub fn mark_block_missed(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        block_id: &str,
    ) -> Result<TimeBlock> {
        self.update_block(user_id, date, block_id, |s| s.mark_missed(block_id))
    }

    pub fn reschedule_block(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        block_id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<TimeBlock> {
        self.ensure_on_day(date, new_start, new_end)?;
        self.update_block(user_id, date, block_id, |s| {
            s.reschedule(block_id, new_start, new_end)
        })
    }

    fn update_block<F>(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        block_id: &str,
        apply: F,
    ) -> Result<TimeBlock>
    where
        F: FnOnce(&mut Schedule) -> std::result::Result<(), ScheduleError>,
    {
        let mut schedule = self.get_schedule(user_id, date)?;
        apply(&mut schedule)?;
        let block = schedule
            .get(block_id)
            .cloned()
            .ok_or_else(|| ScheduleError::BlockNotFound(block_id.to_string()))?;
        self.store.save_schedule(&schedule)?;
        Ok(block)
    }

    /// Place items into the free part of the working window after `now`.
    ///
    /// Slots shorter than the configured minimum are ignored. Items that fit
    /// nowhere are reported in the result, not as an error.
    pub fn auto_schedule(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        items: &[SchedulableItem],
        now: DateTime<Utc>,
    ) -> Result<AutoScheduleResult> {
        let mut schedule = self.get_schedule(user_id, date)?;
        let slots = match self.day_window(date)?.remaining_after(now) {
            Some(window) => SlotFinder::new()
                .with_min_duration(self.config.schedule.min_slot())
                .find_in_schedule(&schedule, window.start, window.end),
            None => Vec::new(),
        };

        let result = AutoScheduler::new().schedule_into(&mut schedule, items, &slots);
        if result.scheduled_count > 0 {
            self.store.save_schedule(&schedule)?;
        }
        Ok(result)
    }

    /// Rank candidates with the configured weights, then auto-schedule them.
    pub fn rank_and_schedule(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        candidates: Vec<Candidate>,
        now: DateTime<Utc>,
    ) -> Result<(Vec<RankedItem>, AutoScheduleResult)> {
        let ranked = PriorityScorer::with_weights(self.config.priority, now).rank(candidates);
        let items: Vec<SchedulableItem> = ranked.iter().map(|r| r.item.clone()).collect();
        let result = self.auto_schedule(user_id, date, &items, now)?;
        Ok((ranked, result))
    }

    /// Repair the missed blocks of a day.
    ///
    /// Replacements go into the rest of `date`, or into `target_date` when
    /// given. Every attempt is appended to the attempt log.
    pub fn auto_reschedule(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
        after: Option<DateTime<Utc>>,
        target_date: Option<NaiveDate>,
    ) -> Result<Vec<RescheduleOutcome>> {
        let engine = RescheduleEngine::new(self.hours);
        let mut source = self.get_schedule(user_id, date)?;
        let mut target = match target_date.filter(|d| *d != date) {
            Some(target_date) => Some(self.get_schedule(user_id, target_date)?),
            None => None,
        };

        let outcomes = engine.repair(&mut source, target.as_mut(), now, after);
        let attempts: Vec<RescheduleAttempt> =
            outcomes.iter().map(|o| o.attempt.clone()).collect();

        // Placed moves and their attempts land together or not at all.
        let mut touched: Vec<&Schedule> = Vec::new();
        if outcomes.iter().any(RescheduleOutcome::is_placed) {
            touched.extend(target.as_ref());
            touched.push(&source);
        }
        self.store.record_repair(user_id, &touched, &attempts)?;

        info!(
            user_id,
            %date,
            attempts = outcomes.len(),
            placed = outcomes.iter().filter(|o| o.is_placed()).count(),
            "auto reschedule finished"
        );
        Ok(outcomes)
    }

    pub fn list_reschedule_attempts(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<RescheduleAttempt>> {
        Ok(self.store.list_attempts(user_id, date)?)
    }

    /// Mirror a day's blocks to the connected calendar.
    ///
    /// With `sync.prune_missing`, owned events of that day whose block no
    /// longer exists on any day are deleted as well.
    pub async fn sync(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        let schedule = self.get_schedule(user_id, date)?;
        let prune = if self.config.sync.prune_missing {
            let span = self.day_span(date)?;
            // Blocks filed under other days can sit in this range too.
            let keep = self.store.block_ids(user_id)?;
            Some(PruneScope::new(span.start, span.end).keeping(keep))
        } else {
            None
        };
        self.push(user_id, schedule.blocks(), prune.as_ref(), cancel)
            .await
    }

    /// Push arbitrary blocks to the connected calendar without pruning.
    pub async fn sync_blocks(
        &mut self,
        user_id: &str,
        blocks: &[TimeBlock],
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        self.push(user_id, blocks, None, cancel).await
    }

    async fn push(
        &mut self,
        user_id: &str,
        blocks: &[TimeBlock],
        prune: Option<&PruneScope>,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        let reconciler = self.reconciler()?;
        let report = reconciler.push(user_id, blocks, prune, cancel).await?;

        let provider = reconciler.provider_name();
        let calendar_id = reconciler.config().calendar_id.as_str();
        for link in &report.links {
            self.store.upsert_link(link)?;
        }
        for block_id in &report.pruned_block_ids {
            self.store
                .remove_link(user_id, provider, calendar_id, block_id)?;
        }
        Ok(report.summary)
    }

    /// Remote events in `[start, end)`.
    pub async fn list_events(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: EventFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<CalendarEvent>> {
        let reconciler = self.reconciler()?;
        Ok(reconciler.pull(user_id, start, end, filter, cancel).await?)
    }

    /// Remote events colliding with `[start, end)`.
    pub async fn check_conflicts(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CalendarEvent>> {
        let reconciler = self.reconciler()?;
        Ok(reconciler
            .check_conflicts(user_id, start, end, cancel)
            .await?)
    }

    /// Forget every link to `calendar_id`. Disconnects the reconciler when it
    /// targets that calendar. Returns the number of links dropped.
    pub fn disconnect_calendar(&mut self, user_id: &str, calendar_id: &str) -> Result<usize> {
        let reconciler = self.reconciler()?;
        let provider = reconciler.provider_name().to_string();
        let targets_calendar = reconciler.config().calendar_id == calendar_id;

        let removed = self
            .store
            .remove_calendar_links(user_id, &provider, calendar_id)?;
        if targets_calendar {
            self.reconciler = None;
        } else {
            warn!(calendar_id, "disconnected calendar is not the active one");
        }
        info!(user_id, provider = %provider, calendar_id, removed, "calendar disconnected");
        Ok(removed)
    }

    fn reconciler(&self) -> Result<CalendarReconciler> {
        self.reconciler
            .clone()
            .ok_or(CoreError::Sync(SyncError::NotConnected))
    }
}
