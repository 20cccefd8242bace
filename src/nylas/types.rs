//! Wire types for the Nylas v3 API surface this service touches.

use serde::{Deserialize, Serialize};

/// Lifecycle state reported for a notetaker bot. The service documents
/// exactly four states; anything newer is carried as `Unknown` and treated
/// as "no status change" by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotetakerState {
    Connecting,
    Attending,
    MediaProcessing,
    MediaAvailable,
    #[serde(other)]
    Unknown,
}

/// A deployed notetaker bot.
#[derive(Debug, Clone, Deserialize)]
pub struct Notetaker {
    pub id: String,
    pub state: NotetakerState,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
}

/// A media artifact reference (transcript or recording).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaFile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Media artifacts for a bot session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotetakerMedia {
    #[serde(default)]
    pub transcript: Option<MediaFile>,
    #[serde(default)]
    pub recording: Option<MediaFile>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl NotetakerMedia {
    /// Transcript download URL, when one was advertised.
    pub fn transcript_url(&self) -> Option<&str> {
        self.transcript
            .as_ref()
            .and_then(|t| t.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Recording/transcription options for a bot.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingSettings {
    pub video_recording: bool,
    pub audio_recording: bool,
    pub transcription: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diarization: Option<bool>,
}

impl Default for MeetingSettings {
    fn default() -> Self {
        Self {
            video_recording: true,
            audio_recording: true,
            transcription: true,
            summary: None,
            diarization: None,
        }
    }
}

/// Body for inviting a bot directly to a meeting.
#[derive(Debug, Clone, Serialize)]
pub struct InviteNotetakerRequest {
    pub meeting_link: String,
    pub name: String,
    pub meeting_settings: MeetingSettings,
}

/// Notetaker block embedded in an event creation request.
#[derive(Debug, Clone, Serialize)]
pub struct EventNotetakerRequest {
    pub name: String,
    pub meeting_settings: MeetingSettings,
}

/// Event time span (unix seconds).
#[derive(Debug, Clone, Serialize)]
pub struct EventWhenRequest {
    pub start_time: i64,
    pub end_time: i64,
    pub start_timezone: String,
    pub end_timezone: String,
}

/// Conferencing details attached to an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConferencingDetails {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conferencing {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub details: Option<ConferencingDetails>,
}

/// Body for creating a calendar event.
#[derive(Debug, Clone, Serialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub when: EventWhenRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conferencing: Option<Conferencing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notetaker: Option<EventNotetakerRequest>,
}

/// Event time span as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventWhen {
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
}

/// Notetaker reference embedded in an event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventNotetaker {
    #[serde(default)]
    pub id: Option<String>,
}

/// A calendar event.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub when: Option<EventWhen>,
    #[serde(default)]
    pub conferencing: Option<Conferencing>,
    #[serde(default)]
    pub notetaker: Option<EventNotetaker>,
}

impl Event {
    pub fn meeting_link(&self) -> Option<&str> {
        self.conferencing
            .as_ref()
            .and_then(|c| c.details.as_ref())
            .and_then(|d| d.url.as_deref())
            .filter(|u| !u.is_empty())
    }

    pub fn notetaker_id(&self) -> Option<&str> {
        self.notetaker
            .as_ref()
            .and_then(|n| n.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Grant details used for the auth check.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grant {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub grant_status: Option<String>,
}
