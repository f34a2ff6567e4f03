//! Calendar reconciler: push blocks out, pull events in, detect conflicts.
//!
//! Every provider call is bounded by a timeout and can be aborted through a
//! [`CancellationToken`]. A failing call only affects its own event; the
//! whole operation fails only when no call can be made at all (no token) or
//! when the caller cancels.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event_codec::block_to_payload;
use super::provider::{CalendarProvider, TokenSource};
use super::types::{
    BearerToken, CalendarEvent, EventFilter, ExternalEventLink, ProviderEvent, SyncSummary,
};
use crate::error::{ProviderError, SyncError};
use crate::schedule::TimeBlock;

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default token expiry warning window in seconds.
pub const DEFAULT_TOKEN_EXPIRY_WARNING_SECS: i64 = 300;

/// Configuration for a reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Remote calendar to write to and read from.
    pub calendar_id: String,
    /// Upper bound for each provider call.
    pub timeout: StdDuration,
    /// Warn when the token expires within this window.
    pub token_expiry_warning: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            timeout: StdDuration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_expiry_warning: Duration::seconds(DEFAULT_TOKEN_EXPIRY_WARNING_SECS),
        }
    }
}

impl ReconcilerConfig {
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = calendar_id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token_expiry_warning(mut self, window: Duration) -> Self {
        self.token_expiry_warning = window;
        self
    }
}

/// Result of a push run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub summary: SyncSummary,
    /// One link per block that reached the remote side
    pub links: Vec<ExternalEventLink>,
    /// Blocks whose remote events were pruned
    pub pruned_block_ids: Vec<String>,
}

/// Which owned events a push may delete.
///
/// Owned events in `[start, end)` are deleted unless their block was pushed
/// in the same run or is listed in `keep`. Blocks that still exist on other
/// days belong in `keep`, since their events can fall inside the range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneScope {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub keep: HashSet<String>,
}

impl PruneScope {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            keep: HashSet::new(),
        }
    }

    pub fn keeping<I, S>(mut self, block_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keep.extend(block_ids.into_iter().map(Into::into));
        self
    }
}

/// Reconciles local blocks with one remote calendar.
#[derive(Clone)]
pub struct CalendarReconciler {
    provider: Arc<dyn CalendarProvider>,
    tokens: Arc<dyn TokenSource>,
    config: ReconcilerConfig,
}

impl CalendarReconciler {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        tokens: Arc<dyn TokenSource>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            provider,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Push blocks as keyed events.
    ///
    /// Each block is inserted; an "already exists" answer turns into an update
    /// of the same key, so pushing twice never duplicates events. With a
    /// [`PruneScope`], stale owned events inside it are deleted.
    pub async fn push(
        &self,
        user_id: &str,
        blocks: &[TimeBlock],
        prune: Option<&PruneScope>,
        cancel: &CancellationToken,
    ) -> Result<PushReport, SyncError> {
        let token = self.bearer(user_id, cancel).await?;
        let calendar_id = self.config.calendar_id.as_str();
        let mut report = PushReport::default();

        for block in blocks {
            let payload = block_to_payload(block);
            let inserted = self
                .call(cancel, self.provider.insert_event(&token, calendar_id, &payload))
                .await?;

            let remote_id = match inserted {
                Ok(id) => {
                    report.summary.created += 1;
                    id
                }
                Err(ProviderError::AlreadyExists(_)) => {
                    let updated = self
                        .call(cancel, self.provider.update_event(&token, calendar_id, &payload))
                        .await?;
                    match updated {
                        Ok(id) => {
                            report.summary.updated += 1;
                            id
                        }
                        Err(e) => {
                            warn!(block_id = %block.id, error = %e, "event update failed");
                            report.summary.failed += 1;
                            continue;
                        }
                    }
                }
                Err(e) => {
                    warn!(block_id = %block.id, error = %e, "event insert failed");
                    report.summary.failed += 1;
                    continue;
                }
            };

            report.links.push(ExternalEventLink {
                user_id: user_id.to_string(),
                provider: self.provider.name().to_string(),
                calendar_id: calendar_id.to_string(),
                block_id: block.id.clone(),
                remote_event_id: remote_id,
                synced_at: Utc::now(),
            });
        }

        if let Some(scope) = prune {
            let mut keep: HashSet<&str> = scope.keep.iter().map(String::as_str).collect();
            keep.extend(blocks.iter().map(|b| b.id.as_str()));
            self.prune(&token, &keep, scope.start, scope.end, cancel, &mut report)
                .await?;
        }

        info!(
            user_id,
            provider = self.provider.name(),
            created = report.summary.created,
            updated = report.summary.updated,
            deleted = report.summary.deleted,
            failed = report.summary.failed,
            "push finished"
        );
        Ok(report)
    }

    async fn prune(
        &self,
        token: &BearerToken,
        keep: &HashSet<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
        report: &mut PushReport,
    ) -> Result<(), SyncError> {
        let calendar_id = self.config.calendar_id.as_str();
        let listed = self
            .call(
                cancel,
                self.provider
                    .list_events(token, calendar_id, start, end, true),
            )
            .await?;
        let events = match listed {
            Ok(events) => decode_events(events, EventFilter::OwnedOnly),
            Err(e) => {
                warn!(error = %e, "could not list owned events; skipping prune");
                report.summary.failed += 1;
                return Ok(());
            }
        };

        for event in events {
            if event.is_cancelled() {
                continue;
            }
            let block_id = event.block_id.clone().unwrap_or_else(|| event.id.clone());
            if keep.contains(block_id.as_str()) {
                continue;
            }

            let deleted = self
                .call(cancel, self.provider.delete_event(token, calendar_id, &event.id))
                .await?;
            match deleted {
                Ok(()) | Err(ProviderError::NotFound(_)) => {
                    debug!(event_id = %event.id, "pruned stale event");
                    report.summary.deleted += 1;
                    report.pruned_block_ids.push(block_id);
                }
                Err(e) => {
                    warn!(event_id = %event.id, error = %e, "event delete failed");
                    report.summary.failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Pull events intersecting `[start, end)`.
    ///
    /// Events the codec cannot read are skipped with a warning.
    pub async fn pull(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filter: EventFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<CalendarEvent>, SyncError> {
        let token = self.bearer(user_id, cancel).await?;
        let owned_only = filter == EventFilter::OwnedOnly;
        let events = self
            .call(
                cancel,
                self.provider.list_events(
                    &token,
                    &self.config.calendar_id,
                    start,
                    end,
                    owned_only,
                ),
            )
            .await??;

        let events = decode_events(events, filter);
        debug!(user_id, count = events.len(), "pulled events");
        Ok(events)
    }

    /// Remote events that collide with `[start, end)`. Cancelled events never collide.
    pub async fn check_conflicts(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<CalendarEvent>, SyncError> {
        let events = self
            .pull(user_id, start, end, EventFilter::All, cancel)
            .await?;
        Ok(find_conflicts(&events, start, end))
    }

    async fn bearer(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Result<BearerToken, SyncError> {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            fetched = tokio::time::timeout(self.config.timeout, self.tokens.token(user_id)) => fetched,
        };

        let token = match fetched {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => {
                return Err(SyncError::Token {
                    user_id: user_id.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(SyncError::Token {
                    user_id: user_id.to_string(),
                    message: format!("timed out after {}s", self.config.timeout.as_secs()),
                })
            }
        };

        if token.expires_within(Utc::now(), self.config.token_expiry_warning) {
            warn!(user_id, expires_at = ?token.expires_at, "access token is about to expire");
        }
        Ok(token)
    }

    /// Run one provider call under the timeout, racing the cancellation token.
    async fn call<T, F>(
        &self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<Result<T, ProviderError>, SyncError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            result = tokio::time::timeout(self.config.timeout, fut) => {
                Ok(result.unwrap_or_else(|_| {
                    Err(ProviderError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    })
                }))
            }
        }
    }
}

fn decode_events(events: Vec<ProviderEvent>, filter: EventFilter) -> Vec<CalendarEvent> {
    events
        .into_iter()
        .filter_map(|raw| match CalendarEvent::try_from(raw) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "skipping unreadable event");
                None
            }
        })
        .filter(|event| filter.keeps(event))
        .collect()
}

/// Events that overlap `[start, end)`, excluding cancelled ones.
pub fn find_conflicts(
    events: &[CalendarEvent],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|e| !e.is_cancelled() && e.overlaps(start, end))
        .cloned()
        .collect()
}
