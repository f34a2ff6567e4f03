//! Encoding/decoding between time blocks and provider events.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use super::google::{GoogleEvent, GoogleEventTime};
use super::types::{CalendarEvent, EventPayload, EventStatus, EventTiming, ProviderEvent};
use crate::error::ProviderError;
use crate::schedule::TimeBlock;

/// Private extended property holding the originating block id.
pub const PROP_BLOCK_ID: &str = "timeblock_id";
/// Private extended property marking events created by this system.
pub const PROP_OWNED: &str = "timeblock_owned";
/// Private extended property holding the block type.
pub const PROP_BLOCK_TYPE: &str = "timeblock_type";

// ============================================================================
// Outgoing
// ============================================================================

/// Build the outgoing payload for a block.
pub fn block_to_payload(block: &TimeBlock) -> EventPayload {
    EventPayload {
        key: block.id.clone(),
        title: block.title.clone(),
        description: Some(format!("Time block ({})", block.block_type)),
        start: block.start_time,
        end: block.end_time,
        block_type: block.block_type,
    }
}

/// Convert a payload to a Google Calendar event body.
pub fn google_event_body(payload: &EventPayload) -> serde_json::Value {
    json!({
        "id": payload.key,
        "summary": payload.title,
        "description": payload.description,
        "start": {"dateTime": payload.start.to_rfc3339()},
        "end": {"dateTime": payload.end.to_rfc3339()},
        "extendedProperties": {
            "private": {
                PROP_BLOCK_ID: payload.key,
                PROP_OWNED: "true",
                PROP_BLOCK_TYPE: payload.block_type.as_str(),
            }
        }
    })
}

/// `privateExtendedProperty` filter value selecting owned events.
pub fn owned_filter() -> String {
    format!("{PROP_OWNED}=true")
}

// ============================================================================
// Incoming
// ============================================================================

impl TryFrom<ProviderEvent> for CalendarEvent {
    type Error = ProviderError;

    fn try_from(event: ProviderEvent) -> Result<Self, Self::Error> {
        match event {
            ProviderEvent::Google(event) => decode_google_event(event),
        }
    }
}

/// Convert a Google Calendar event to canonical form.
pub fn decode_google_event(event: GoogleEvent) -> Result<CalendarEvent, ProviderError> {
    let timing = decode_timing(&event.id, event.start.as_ref(), event.end.as_ref())?;
    let private = event
        .extended_properties
        .map(|p| p.private)
        .unwrap_or_default();
    let (owned_by_us, block_id) = ownership(&private);

    Ok(CalendarEvent {
        title: event.summary.unwrap_or_default(),
        status: EventStatus::parse(event.status.as_deref()),
        location: event.location,
        description: event.description,
        owned_by_us,
        block_id,
        timing,
        id: event.id,
    })
}

fn ownership(private: &BTreeMap<String, String>) -> (bool, Option<String>) {
    let block_id = private.get(PROP_BLOCK_ID).cloned();
    let owned = private.get(PROP_OWNED).map(String::as_str) == Some("true") || block_id.is_some();
    (owned, block_id)
}

fn decode_timing(
    id: &str,
    start: Option<&GoogleEventTime>,
    end: Option<&GoogleEventTime>,
) -> Result<EventTiming, ProviderError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ProviderError::Decode(format!("event {id} has no start or end")));
    };

    match (&start.date_time, &end.date_time) {
        (Some(s), Some(e)) => Ok(EventTiming::Timed {
            start: parse_instant(id, s)?,
            end: parse_instant(id, e)?,
        }),
        _ => match (&start.date, &end.date) {
            (Some(s), Some(e)) => Ok(EventTiming::AllDay {
                start_date: parse_date(id, s)?,
                end_date: parse_date(id, e)?,
            }),
            _ => Err(ProviderError::Decode(format!(
                "event {id} mixes timed and all-day bounds"
            ))),
        },
    }
}

fn parse_instant(id: &str, value: &str) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ProviderError::Decode(format!("event {id}: bad dateTime '{value}': {e}")))
}

fn parse_date(id: &str, value: &str) -> Result<NaiveDate, ProviderError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ProviderError::Decode(format!("event {id}: bad date '{value}': {e}")))
}
