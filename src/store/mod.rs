//! Tracking record persistence.
//!
//! One record per bot session, keyed by the session id the notetaker
//! service assigns. The poller owns all writes after insertion; the HTTP
//! layer only reads and deletes.

pub mod sqlite;

use crate::normalizer::TranscriptSegment;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteTrackingStore;

/// Lifecycle status of a tracked bot session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    Scheduled,
    Joining,
    Recording,
    Processing,
    Ready,
    Failed,
    Timeout,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Joining => "joining",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "joining" => Ok(Self::Joining),
            "recording" => Ok(Self::Recording),
            "processing" => Ok(Self::Processing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            "timeout" => Ok(Self::Timeout),
            _ => anyhow::bail!("Invalid tracking status: {}", s),
        }
    }

    /// Label shown to users, mirroring the notetaker service's vocabulary.
    pub fn display(&self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Joining => "Joining",
            Self::Recording => "Attending",
            Self::Processing => "Processing",
            Self::Ready => "Media Available",
            Self::Failed => "Failed",
            Self::Timeout => "Timeout",
        }
    }

    /// No further transition occurs from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Timeout)
    }
}

/// A tracking record as stored.
#[derive(Debug, Clone)]
pub struct TrackingRecord {
    pub id: String,
    pub status: TrackingStatus,
    pub transcript: Option<Vec<TranscriptSegment>>,
    pub failure_reason: Option<String>,
    pub event_id: Option<String>,
    pub created_at: String,
}

/// Partial update with merge semantics: absent fields keep their stored
/// value.
#[derive(Debug, Clone, Default)]
pub struct TrackingUpdate {
    pub status: Option<TrackingStatus>,
    pub transcript: Option<Vec<TranscriptSegment>>,
    pub failure_reason: Option<String>,
}

impl TrackingUpdate {
    pub fn status(status: TrackingStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn ready(transcript: Vec<TranscriptSegment>) -> Self {
        Self {
            status: Some(TrackingStatus::Ready),
            transcript: Some(transcript),
            ..Self::default()
        }
    }

    pub fn terminal_failure(status: TrackingStatus, reason: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            failure_reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Async persistence seam consumed by the poller and the HTTP layer.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Insert a new record. Fails if the session id already exists.
    async fn insert(
        &self,
        id: &str,
        status: TrackingStatus,
        event_id: Option<&str>,
    ) -> Result<()>;

    /// Merge the given fields into an existing record.
    async fn update_fields(&self, id: &str, update: TrackingUpdate) -> Result<()>;

    async fn find(&self, id: &str) -> Result<Option<TrackingRecord>>;

    /// Returns true when a record was deleted.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete all records correlated with a calendar event. Returns the
    /// number deleted.
    async fn delete_by_event(&self, event_id: &str) -> Result<usize>;

    /// All records, newest first.
    async fn list_all(&self) -> Result<Vec<TrackingRecord>>;
}
