//! Google Calendar v3 provider.
//!
//! Events are created with client-chosen ids (the block id), so a second
//! insert of the same block answers 409 and the reconciler falls back to an
//! update. Owned events carry private extended properties, which also makes
//! them filterable server-side.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::event_codec::{google_event_body, owned_filter};
use super::provider::CalendarProvider;
use super::types::{BearerToken, EventPayload, ProviderEvent};
use crate::error::ProviderError;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Event resource as returned by the Google Calendar API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<GoogleEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<GoogleEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
}

/// Start or end of a Google event. Timed events set `date_time`, all-day ones `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedProperties {
    #[serde(default)]
    pub private: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_page_token: Option<String>,
}

/// Google Calendar client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarProvider {
    http: Client,
    base_url: String,
}

impl GoogleCalendarProvider {
    /// Client against the public Google endpoint.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    /// Client against another endpoint (tests, proxies).
    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            http: Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url, ProviderError> {
        let mut url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );
        if let Some(event_id) = event_id {
            url.push('/');
            url.push_str(&urlencoding::encode(event_id));
        }
        Ok(Url::parse(&url)?)
    }

    async fn decode_event(response: Response) -> Result<GoogleEvent, ProviderError> {
        response
            .json::<GoogleEvent>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

/// Map a non-success response to a provider error.
async fn check_status(response: Response, key: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), key, "google calendar request failed");
    Err(match status.as_u16() {
        409 => ProviderError::AlreadyExists(key.to_string()),
        404 | 410 => ProviderError::NotFound(key.to_string()),
        401 | 403 => ProviderError::Unauthorized(message),
        429 => ProviderError::RateLimited,
        code => ProviderError::Http {
            status: code,
            message,
        },
    })
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn insert_event(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<String, ProviderError> {
        let url = self.events_url(calendar_id, None)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&token.access_token)
            .json(&google_event_body(payload))
            .send()
            .await?;
        let response = check_status(response, &payload.key).await?;
        Ok(Self::decode_event(response).await?.id)
    }

    async fn update_event(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<String, ProviderError> {
        let url = self.events_url(calendar_id, Some(&payload.key))?;
        let response = self
            .http
            .put(url)
            .bearer_auth(&token.access_token)
            .json(&google_event_body(payload))
            .send()
            .await?;
        let response = check_status(response, &payload.key).await?;
        Ok(Self::decode_event(response).await?.id)
    }

    async fn delete_event(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), ProviderError> {
        let url = self.events_url(calendar_id, Some(event_id))?;
        let response = self
            .http
            .delete(url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        check_status(response, event_id).await?;
        Ok(())
    }

    async fn list_events(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        owned_only: bool,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.events_url(calendar_id, None)?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &start.to_rfc3339())
                    .append_pair("timeMax", &end.to_rfc3339())
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime");
                if owned_only {
                    query.append_pair("privateExtendedProperty", &owned_filter());
                }
                if let Some(ref page) = page_token {
                    query.append_pair("pageToken", page);
                }
            }

            let response = self
                .http
                .get(url)
                .bearer_auth(&token.access_token)
                .send()
                .await?;
            let response = check_status(response, calendar_id).await?;
            let page: EventList = response
                .json()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))?;

            events.extend(page.items.into_iter().map(ProviderEvent::Google));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(events)
    }
}
