//! Seams to the outside world: the calendar provider and the token source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{BearerToken, EventPayload, ProviderEvent};
use crate::error::ProviderError;

/// A remote calendar that supports client-keyed events.
///
/// Implementations make one remote call per method and never retry; the
/// reconciler decides what a failure means.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Unique identifier (e.g. "google").
    fn name(&self) -> &str;

    /// Create an event keyed by `payload.key`. Returns the remote id.
    ///
    /// Fails with [`ProviderError::AlreadyExists`] when the key is taken.
    async fn insert_event(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<String, ProviderError>;

    /// Overwrite the event keyed by `payload.key`. Returns the remote id.
    async fn update_event(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<String, ProviderError>;

    async fn delete_event(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), ProviderError>;

    /// Events intersecting `[start, end)`. With `owned_only`, the provider may
    /// filter server-side to events created by this system.
    async fn list_events(
        &self,
        token: &BearerToken,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        owned_only: bool,
    ) -> Result<Vec<ProviderEvent>, ProviderError>;
}

/// Supplies bearer tokens per user. Refresh and storage live behind this.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(
        &self,
        user_id: &str,
    ) -> Result<BearerToken, Box<dyn std::error::Error + Send + Sync>>;
}

/// Hands out the same token for every user.
#[derive(Debug, Clone)]
pub struct StaticTokenSource(pub BearerToken);

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(
        &self,
        _user_id: &str,
    ) -> Result<BearerToken, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.0.clone())
    }
}
