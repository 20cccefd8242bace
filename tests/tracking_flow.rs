//! End-to-end tracking lifecycle: scheduled record in a real SQLite store,
//! poller driven by a scripted remote client, terminal record surfaced
//! through the store and the fallback cache.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use meetscribe::nylas::{
    InviteNotetakerRequest, MediaFile, Notetaker, NotetakerApi, NotetakerMedia, NotetakerState,
    RemoteResult,
};
use meetscribe::store::{SqliteTrackingStore, TrackingStatus, TrackingStore};
use meetscribe::tracker::{
    FetchError, PollerConfig, PollerSet, TranscriptCache, TranscriptFetcher,
};

/// Replays a scripted sequence of bot states, repeating the last entry.
struct ScriptedClient {
    states: Vec<NotetakerState>,
    cursor: AtomicUsize,
    media: NotetakerMedia,
}

impl ScriptedClient {
    fn new(states: Vec<NotetakerState>, media: NotetakerMedia) -> Self {
        Self {
            states,
            cursor: AtomicUsize::new(0),
            media,
        }
    }
}

#[async_trait]
impl NotetakerApi for ScriptedClient {
    async fn find_notetaker(&self, notetaker_id: &str) -> RemoteResult<Notetaker> {
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let state = *self
            .states
            .get(idx)
            .or_else(|| self.states.last())
            .expect("scripted client needs at least one state");

        Ok(Notetaker {
            id: notetaker_id.to_string(),
            state,
            name: None,
            meeting_link: None,
        })
    }

    async fn get_media(&self, _notetaker_id: &str) -> RemoteResult<NotetakerMedia> {
        Ok(self.media.clone())
    }

    async fn invite_notetaker(&self, _request: &InviteNotetakerRequest) -> RemoteResult<String> {
        unreachable!("the poller never invites")
    }
}

struct StaticFetcher(Result<String, FetchError>);

#[async_trait]
impl TranscriptFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.0.clone()
    }
}

fn media_with_url() -> NotetakerMedia {
    NotetakerMedia {
        transcript: Some(MediaFile {
            url: Some("https://media.example/transcript.json".to_string()),
            size: Some(128),
        }),
        recording: None,
        summary: None,
        title: None,
    }
}

fn fast_config(max_checks: u32) -> PollerConfig {
    PollerConfig {
        max_checks,
        interval: Duration::from_millis(5),
    }
}

async fn wait_for_terminal(store: &SqliteTrackingStore, id: &str) -> meetscribe::store::TrackingRecord {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(record) = store.find(id).await.unwrap() {
                if record.status.is_terminal() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("poller did not reach a terminal status in time")
}

#[tokio::test]
async fn test_full_flow_to_ready_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteTrackingStore::open(dir.path().join("t.db")).unwrap());
    let cache = TranscriptCache::default();

    let client = Arc::new(ScriptedClient::new(
        vec![
            NotetakerState::Connecting,
            NotetakerState::Attending,
            NotetakerState::MediaProcessing,
            NotetakerState::MediaAvailable,
        ],
        media_with_url(),
    ));

    let payload = r#"{"object":"transcript","transcript":[
        {"speaker":"Alice","text":"Hello"},
        {"speaker":"Bob","text":"Hi Alice"},
        {"speaker":"Bob","text":"   "}
    ]}"#;

    let pollers = PollerSet::new(
        client,
        store.clone(),
        Arc::new(StaticFetcher(Ok(payload.to_string()))),
        cache.clone(),
        fast_config(50),
    );

    store
        .insert("bot-1", TrackingStatus::Scheduled, Some("evt-1"))
        .await
        .unwrap();
    assert!(pollers.spawn("bot-1".to_string()).await);

    let record = wait_for_terminal(&store, "bot-1").await;
    assert_eq!(record.status, TrackingStatus::Ready);
    assert!(record.failure_reason.is_none());

    let transcript = record.transcript.unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].speaker, "Alice");
    assert_eq!(transcript[0].text, "Hello");
    assert_eq!(transcript[1].speaker, "Bob");

    // Success mirrors the combined text into the cache.
    assert_eq!(
        cache.get("bot-1").await.as_deref(),
        Some("Hello\n\nHi Alice")
    );

    // The record keeps its event correlation after the terminal write.
    assert_eq!(record.event_id.as_deref(), Some("evt-1"));
}

#[tokio::test]
async fn test_stuck_session_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteTrackingStore::open(dir.path().join("t.db")).unwrap());
    let cache = TranscriptCache::default();

    let client = Arc::new(ScriptedClient::new(
        vec![NotetakerState::Connecting],
        NotetakerMedia::default(),
    ));

    let pollers = PollerSet::new(
        client,
        store.clone(),
        Arc::new(StaticFetcher(Ok(String::new()))),
        cache.clone(),
        fast_config(5),
    );

    store
        .insert("bot-2", TrackingStatus::Scheduled, None)
        .await
        .unwrap();
    pollers.spawn("bot-2".to_string()).await;

    let record = wait_for_terminal(&store, "bot-2").await;
    assert_eq!(record.status, TrackingStatus::Timeout);
    assert_eq!(
        record.failure_reason.as_deref(),
        Some("did not complete within expected time")
    );
    assert!(record.transcript.is_none());
    assert!(cache.get("bot-2").await.is_none());
}

#[tokio::test]
async fn test_fetch_failure_is_failed_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteTrackingStore::open(dir.path().join("t.db")).unwrap());

    let client = Arc::new(ScriptedClient::new(
        vec![NotetakerState::MediaAvailable],
        media_with_url(),
    ));

    let pollers = PollerSet::new(
        client,
        store.clone(),
        Arc::new(StaticFetcher(Err(FetchError::Status(404)))),
        TranscriptCache::default(),
        fast_config(5),
    );

    store
        .insert("bot-3", TrackingStatus::Scheduled, None)
        .await
        .unwrap();
    pollers.spawn("bot-3".to_string()).await;

    let record = wait_for_terminal(&store, "bot-3").await;
    assert_eq!(record.status, TrackingStatus::Failed);
    assert!(record.failure_reason.unwrap().contains("404"));
}

#[tokio::test]
async fn test_concurrent_sessions_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteTrackingStore::open(dir.path().join("t.db")).unwrap());
    let cache = TranscriptCache::default();

    let ready_client = Arc::new(ScriptedClient::new(
        vec![NotetakerState::MediaAvailable],
        media_with_url(),
    ));
    let stuck_client = Arc::new(ScriptedClient::new(
        vec![NotetakerState::Connecting],
        NotetakerMedia::default(),
    ));

    let ready_pollers = PollerSet::new(
        ready_client,
        store.clone(),
        Arc::new(StaticFetcher(Ok(
            r#"[{"speaker":"Alice","text":"Hi"}]"#.to_string()
        ))),
        cache.clone(),
        fast_config(50),
    );
    let stuck_pollers = PollerSet::new(
        stuck_client,
        store.clone(),
        Arc::new(StaticFetcher(Ok(String::new()))),
        cache.clone(),
        fast_config(3),
    );

    store
        .insert("bot-a", TrackingStatus::Scheduled, None)
        .await
        .unwrap();
    store
        .insert("bot-b", TrackingStatus::Scheduled, None)
        .await
        .unwrap();

    ready_pollers.spawn("bot-a".to_string()).await;
    stuck_pollers.spawn("bot-b".to_string()).await;

    let record_a = wait_for_terminal(&store, "bot-a").await;
    let record_b = wait_for_terminal(&store, "bot-b").await;

    assert_eq!(record_a.status, TrackingStatus::Ready);
    assert_eq!(record_b.status, TrackingStatus::Timeout);
}
