//! Calendar synchronization layer.
//!
//! Pushes time blocks to an external calendar as keyed events and pulls
//! events back for conflict checks and import. Provider wire formats stay
//! inside their provider module and are converted by `event_codec`.

pub mod event_codec;
pub mod google;
pub mod provider;
pub mod reconciler;
pub mod types;


pub use google::{GoogleCalendarProvider, GoogleEvent, DEFAULT_API_BASE};
pub use provider::{CalendarProvider, StaticTokenSource, TokenSource};
pub use reconciler::{
    find_conflicts, CalendarReconciler, PruneScope, PushReport, ReconcilerConfig,
};
pub use types::{
    BearerToken, CalendarEvent, EventFilter, EventPayload, EventStatus, EventTiming,
    ExternalEventLink, ProviderEvent, SyncSummary,
};
