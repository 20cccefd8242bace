//! Nylas v3 API client.
//!
//! The rest of the service consumes two narrow seams: `NotetakerApi` for
//! bot lifecycle and media, `CalendarApi` for events and grant checks.
//! Error kinds are explicit so callers decide retry/terminate from the
//! variant, not from string matching.

pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpNylasClient;
pub use types::{
    Conferencing, ConferencingDetails, CreateEventRequest, Event, EventNotetaker,
    EventNotetakerRequest, EventWhen, EventWhenRequest, Grant, InviteNotetakerRequest, MediaFile,
    MeetingSettings, Notetaker, NotetakerMedia, NotetakerState,
};

/// Failure kinds for remote calls.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The addressed resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Recoverable by retrying later: network failures, timeouts,
    /// rate limits, server errors.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// The request itself was rejected (other 4xx); retrying the same
    /// call will not help.
    #[error("request rejected: {0}")]
    Rejected(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Notetaker bot operations.
#[async_trait]
pub trait NotetakerApi: Send + Sync {
    /// Current state of a deployed bot.
    async fn find_notetaker(&self, notetaker_id: &str) -> RemoteResult<Notetaker>;

    /// Media artifacts once the bot reports them available.
    async fn get_media(&self, notetaker_id: &str) -> RemoteResult<NotetakerMedia>;

    /// Invite a bot directly to a meeting link. Returns the new bot's id.
    async fn invite_notetaker(&self, request: &InviteNotetakerRequest) -> RemoteResult<String>;
}

/// Calendar operations.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn create_event(
        &self,
        calendar_id: &str,
        request: &CreateEventRequest,
    ) -> RemoteResult<Event>;

    async fn find_event(&self, event_id: &str, calendar_id: &str) -> RemoteResult<Event>;

    async fn list_events(
        &self,
        calendar_id: &str,
        start: i64,
        end: i64,
    ) -> RemoteResult<Vec<Event>>;

    async fn destroy_event(&self, event_id: &str, calendar_id: &str) -> RemoteResult<()>;

    /// Verify the configured grant is valid.
    async fn find_grant(&self) -> RemoteResult<Grant>;
}
