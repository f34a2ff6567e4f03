//! Core types for calendar reconciliation.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::google::GoogleEvent;
use crate::schedule::BlockType;

/// Provider event payload, tagged by provider.
///
/// Providers hand back their own wire shape; it is converted to a
/// [`CalendarEvent`] at the boundary (see `event_codec`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", content = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    Google(GoogleEvent),
}

/// Lifecycle status of a remote event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    /// Parse a provider status. Unknown values count as confirmed.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("cancelled") => EventStatus::Cancelled,
            Some("tentative") => EventStatus::Tentative,
            _ => EventStatus::Confirmed,
        }
    }
}

/// When an event happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventTiming {
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Whole days; `end_date` is exclusive.
    AllDay {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

impl EventTiming {
    /// Occupied interval as UTC instants. All-day events span midnight to midnight UTC.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            EventTiming::Timed { start, end } => (start, end),
            EventTiming::AllDay {
                start_date,
                end_date,
            } => {
                let start = start_date.and_time(chrono::NaiveTime::MIN).and_utc();
                let end = if end_date > start_date {
                    end_date.and_time(chrono::NaiveTime::MIN).and_utc()
                } else {
                    start + Duration::days(1)
                };
                (start, end)
            }
        }
    }
}

/// A pulled calendar event in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Remote event id
    pub id: String,
    pub title: String,
    pub timing: EventTiming,
    pub status: EventStatus,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Created by this system
    pub owned_by_us: bool,
    /// Originating block, for owned events
    pub block_id: Option<String>,
}

impl CalendarEvent {
    pub fn is_all_day(&self) -> bool {
        matches!(self.timing, EventTiming::AllDay { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let (s, e) = self.timing.bounds();
        s < end && e > start
    }
}

/// Outgoing event for one block, keyed by the block id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Client-chosen remote key (the block id)
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub block_type: BlockType,
}

/// Counters of one push run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted + self.failed
    }
}

/// Mapping from a local block to its remote event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEventLink {
    pub user_id: String,
    pub provider: String,
    pub calendar_id: String,
    pub block_id: String,
    pub remote_event_id: String,
    pub synced_at: DateTime<Utc>,
}

/// Which pulled events to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
    #[default]
    All,
    /// Only events created by this system
    OwnedOnly,
    /// Drop events created by this system, so they are not imported twice
    ExcludeOwned,
}

impl EventFilter {
    pub fn keeps(&self, event: &CalendarEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::OwnedOnly => event.owned_by_us,
            EventFilter::ExcludeOwned => !event.owned_by_us,
        }
    }
}

/// Access token handed out by a [`TokenSource`](super::TokenSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Token expires within `window` of `now` (or already has).
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.expires_at {
            Some(exp) => exp - now <= window,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, 0, 0).unwrap()
    }

    fn event(timing: EventTiming) -> CalendarEvent {
        CalendarEvent {
            id: "ev".into(),
            title: "Event".into(),
            timing,
            status: EventStatus::Confirmed,
            location: None,
            description: None,
            owned_by_us: false,
            block_id: None,
        }
    }

    #[test]
    fn test_timed_event_overlap_is_half_open() {
        let e = event(EventTiming::Timed {
            start: at(10),
            end: at(11),
        });
        assert!(e.overlaps(at(9), at(11)));
        assert!(!e.overlaps(at(11), at(12)));
        assert!(!e.overlaps(at(8), at(10)));
    }

    #[test]
    fn test_all_day_event_covers_whole_day() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let e = event(EventTiming::AllDay {
            start_date: d,
            end_date: d.succ_opt().unwrap(),
        });
        assert!(e.is_all_day());
        assert!(e.overlaps(at(23), at(23) + Duration::minutes(30)));
        assert!(!e.overlaps(at(0) + Duration::days(1), at(1) + Duration::days(1)));
    }

    #[test]
    fn test_all_day_without_end_lasts_one_day() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let (s, e) = EventTiming::AllDay {
            start_date: d,
            end_date: d,
        }
        .bounds();
        assert_eq!(e - s, Duration::days(1));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(EventStatus::parse(Some("cancelled")), EventStatus::Cancelled);
        assert_eq!(EventStatus::parse(Some("tentative")), EventStatus::Tentative);
        assert_eq!(EventStatus::parse(None), EventStatus::Confirmed);
    }

    #[test]
    fn test_filter() {
        let mut owned = event(EventTiming::Timed {
            start: at(9),
            end: at(10),
        });
        owned.owned_by_us = true;
        assert!(EventFilter::OwnedOnly.keeps(&owned));
        assert!(!EventFilter::ExcludeOwned.keeps(&owned));
        assert!(EventFilter::All.keeps(&owned));
    }

    #[test]
    fn test_token_expiry_window() {
        let now = at(12);
        let token = BearerToken::new("t").with_expiry(now + Duration::seconds(120));
        assert!(token.expires_within(now, Duration::seconds(300)));
        assert!(!token.expires_within(now, Duration::seconds(60)));
        assert!(!BearerToken::new("t").expires_within(now, Duration::seconds(300)));
    }
}
