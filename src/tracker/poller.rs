//! Polling state machine for a tracked bot session.
//!
//! One poller owns one tracking record. It maps the remote bot lifecycle
//! onto persisted statuses, retrieves the transcript when media becomes
//! available, and always leaves the record in a terminal state before its
//! polling budget runs out. Every error is converted into a persisted
//! status; nothing propagates (the task has no caller by the time it runs).

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::PollerSettings;
use crate::normalizer::{self, TranscriptSegment};
use crate::nylas::{NotetakerApi, NotetakerMedia, NotetakerState, RemoteError};
use crate::store::{TrackingStatus, TrackingStore, TrackingUpdate};

use super::cache::TranscriptCache;
use super::fetch::TranscriptFetcher;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Status checks before the session is declared timed out.
    pub max_checks: u32,
    /// Pause between checks.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        // 120 checks x 30s: roughly one hour of tracking.
        Self {
            max_checks: 120,
            interval: Duration::from_secs(30),
        }
    }
}

impl From<&PollerSettings> for PollerConfig {
    fn from(settings: &PollerSettings) -> Self {
        Self {
            max_checks: settings.max_checks,
            interval: Duration::from_secs(settings.interval_seconds),
        }
    }
}

pub struct TranscriptPoller {
    client: Arc<dyn NotetakerApi>,
    store: Arc<dyn TrackingStore>,
    fetcher: Arc<dyn TranscriptFetcher>,
    cache: TranscriptCache,
    config: PollerConfig,
}

impl TranscriptPoller {
    pub fn new(
        client: Arc<dyn NotetakerApi>,
        store: Arc<dyn TrackingStore>,
        fetcher: Arc<dyn TranscriptFetcher>,
        cache: TranscriptCache,
        config: PollerConfig,
    ) -> Self {
        Self {
            client,
            store,
            fetcher,
            cache,
            config,
        }
    }

    /// Track one session to a terminal status.
    pub async fn run(&self, session_id: &str) {
        info!(
            "Monitoring notetaker {} (budget: {} checks x {:?})",
            session_id, self.config.max_checks, self.config.interval
        );

        let mut last_state: Option<NotetakerState> = None;

        for check in 1..=self.config.max_checks {
            match self.client.find_notetaker(session_id).await {
                Ok(bot) => {
                    if last_state != Some(bot.state) {
                        info!(
                            "Notetaker {} state: {:?} (check {})",
                            session_id, bot.state, check
                        );
                        last_state = Some(bot.state);
                    }

                    match bot.state {
                        NotetakerState::Connecting => {
                            self.persist_status(session_id, TrackingStatus::Joining).await;
                        }
                        NotetakerState::Attending => {
                            self.persist_status(session_id, TrackingStatus::Recording)
                                .await;
                        }
                        NotetakerState::MediaProcessing => {
                            self.persist_status(session_id, TrackingStatus::Processing)
                                .await;
                        }
                        NotetakerState::MediaAvailable => {
                            // Visited at most once: retrieval terminates the
                            // run whether it succeeds or not.
                            self.retrieve_transcript(session_id).await;
                            return;
                        }
                        NotetakerState::Unknown => {}
                    }
                }
                Err(RemoteError::NotFound(detail)) => {
                    // The service may not surface a freshly created bot for
                    // a while. Keep polling against the timeout budget.
                    warn!("Notetaker {} not visible yet: {}", session_id, detail);
                }
                Err(err) => {
                    warn!(
                        "Status check {}/{} for {} failed: {}",
                        check, self.config.max_checks, session_id, err
                    );
                    if check == self.config.max_checks {
                        self.finalize(
                            session_id,
                            TrackingStatus::Failed,
                            format!("max retries reached: {}", err),
                        )
                        .await;
                        return;
                    }
                }
            }

            if check < self.config.max_checks {
                sleep(self.config.interval).await;
            }
        }

        self.finalize(
            session_id,
            TrackingStatus::Timeout,
            "did not complete within expected time".to_string(),
        )
        .await;
    }

    /// Single-shot transcript retrieval after the first media_available
    /// observation. Fetch failures are not retried.
    async fn retrieve_transcript(&self, session_id: &str) {
        let media = match self.client.get_media(session_id).await {
            Ok(media) => media,
            Err(err) => {
                self.finalize(
                    session_id,
                    TrackingStatus::Failed,
                    format!("media available but lookup failed: {}", err),
                )
                .await;
                return;
            }
        };

        match media.transcript_url() {
            Some(url) => match self.fetcher.fetch(url).await {
                Ok(body) => {
                    let segments = normalizer::normalize_raw(&body);
                    if segments.is_empty() {
                        // A valid payload with nothing usable in it is not
                        // a failure; an empty meeting happens.
                        self.finish_ready(
                            session_id,
                            vec![TranscriptSegment::system(empty_transcript_note(session_id))],
                        )
                        .await;
                    } else {
                        self.finish_ready(session_id, segments).await;
                    }
                }
                Err(err) => {
                    self.finalize(
                        session_id,
                        TrackingStatus::Failed,
                        format!("transcript fetch failed: {}", err),
                    )
                    .await;
                }
            },
            None => {
                let segment = fallback_segment(&media, session_id);
                self.finish_ready(session_id, vec![segment]).await;
            }
        }
    }

    async fn finish_ready(&self, session_id: &str, segments: Vec<TranscriptSegment>) {
        self.cache
            .put(session_id, normalizer::combined_text(&segments))
            .await;

        info!(
            "Transcript ready for {} ({} segments)",
            session_id,
            segments.len()
        );
        self.persist(session_id, TrackingUpdate::ready(segments)).await;
    }

    async fn finalize(&self, session_id: &str, status: TrackingStatus, reason: String) {
        warn!(
            "Notetaker {} finished {}: {}",
            session_id,
            status.as_str(),
            reason
        );
        self.persist(session_id, TrackingUpdate::terminal_failure(status, reason))
            .await;
    }

    async fn persist_status(&self, session_id: &str, status: TrackingStatus) {
        self.persist(session_id, TrackingUpdate::status(status)).await;
    }

    async fn persist(&self, session_id: &str, update: TrackingUpdate) {
        if let Err(err) = self.store.update_fields(session_id, update).await {
            warn!("Failed to persist update for {}: {}", session_id, err);
        }
    }
}

/// Best available substitute when no transcript URL was advertised.
fn fallback_segment(media: &NotetakerMedia, session_id: &str) -> TranscriptSegment {
    if let Some(summary) = media.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        return TranscriptSegment::system(format!("Meeting summary: {}", summary));
    }
    if let Some(title) = media.title.as_deref().filter(|t| !t.trim().is_empty()) {
        return TranscriptSegment::system(format!("Meeting title: {}", title));
    }
    TranscriptSegment::system(format!(
        "Meeting recorded but transcript unavailable. Session ID: {}",
        session_id
    ))
}

fn empty_transcript_note(session_id: &str) -> String {
    format!(
        "Meeting recorded (session {}) but the transcript contained no usable content. \
         The meeting may have been too short or silent, or transcription may not be \
         supported for this platform.",
        session_id
    )
}
