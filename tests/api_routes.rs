//! Router tests with mocked remote services and a real SQLite store.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use meetscribe::api::{ApiServer, ApiState};
use meetscribe::config::NylasConfig;
use meetscribe::normalizer::TranscriptSegment;
use meetscribe::nylas::{
    CalendarApi, Conferencing, ConferencingDetails, CreateEventRequest, Event, EventNotetaker,
    Grant, InviteNotetakerRequest, Notetaker, NotetakerApi, NotetakerMedia, NotetakerState,
    RemoteError, RemoteResult,
};
use meetscribe::store::{SqliteTrackingStore, TrackingStatus, TrackingStore, TrackingUpdate};
use meetscribe::tracker::{
    FetchError, PollerConfig, PollerSet, TranscriptCache, TranscriptFetcher,
};

struct MockCalendar {
    /// Event returned by find_event; None means remote 404.
    event: Option<Event>,
    /// Notetaker id embedded in events returned by create_event.
    embedded_notetaker: Option<String>,
}

fn event_with_link(id: &str, link: Option<&str>, notetaker: Option<&str>) -> Event {
    Event {
        id: id.to_string(),
        title: Some("Planning sync".to_string()),
        status: Some("confirmed".to_string()),
        when: None,
        conferencing: link.map(|url| Conferencing {
            provider: Some("Google Meet".to_string()),
            details: Some(ConferencingDetails {
                url: Some(url.to_string()),
            }),
        }),
        notetaker: notetaker.map(|id| EventNotetaker {
            id: Some(id.to_string()),
        }),
    }
}

#[async_trait]
impl CalendarApi for MockCalendar {
    async fn create_event(
        &self,
        _calendar_id: &str,
        request: &CreateEventRequest,
    ) -> RemoteResult<Event> {
        Ok(Event {
            id: "evt-created".to_string(),
            title: Some(request.title.clone()),
            status: Some("confirmed".to_string()),
            when: None,
            conferencing: request.conferencing.clone(),
            notetaker: self.embedded_notetaker.as_ref().map(|id| EventNotetaker {
                id: Some(id.clone()),
            }),
        })
    }

    async fn find_event(&self, event_id: &str, _calendar_id: &str) -> RemoteResult<Event> {
        self.event
            .clone()
            .ok_or_else(|| RemoteError::NotFound(format!("event {}", event_id)))
    }

    async fn list_events(
        &self,
        _calendar_id: &str,
        _start: i64,
        _end: i64,
    ) -> RemoteResult<Vec<Event>> {
        Ok(self.event.clone().into_iter().collect())
    }

    async fn destroy_event(&self, event_id: &str, _calendar_id: &str) -> RemoteResult<()> {
        if self.event.is_some() {
            Ok(())
        } else {
            Err(RemoteError::NotFound(format!("event {}", event_id)))
        }
    }

    async fn find_grant(&self) -> RemoteResult<Grant> {
        Ok(Grant {
            email: Some("user@example.com".to_string()),
            provider: Some("google".to_string()),
            grant_status: Some("valid".to_string()),
        })
    }
}

struct MockNotetakers;

#[async_trait]
impl NotetakerApi for MockNotetakers {
    async fn find_notetaker(&self, notetaker_id: &str) -> RemoteResult<Notetaker> {
        Ok(Notetaker {
            id: notetaker_id.to_string(),
            state: NotetakerState::Connecting,
            name: None,
            meeting_link: None,
        })
    }

    async fn get_media(&self, _notetaker_id: &str) -> RemoteResult<NotetakerMedia> {
        Ok(NotetakerMedia::default())
    }

    async fn invite_notetaker(&self, _request: &InviteNotetakerRequest) -> RemoteResult<String> {
        Ok("bot-invited".to_string())
    }
}

struct NullFetcher;

#[async_trait]
impl TranscriptFetcher for NullFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        Ok(String::new())
    }
}

struct TestApp {
    router: Router,
    store: Arc<SqliteTrackingStore>,
    cache: TranscriptCache,
    _dir: tempfile::TempDir,
}

fn test_app(calendar: MockCalendar) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteTrackingStore::open(dir.path().join("api.db")).unwrap());
    let cache = TranscriptCache::default();
    let notetakers = Arc::new(MockNotetakers);

    let pollers = PollerSet::new(
        notetakers.clone() as Arc<dyn NotetakerApi>,
        store.clone() as Arc<dyn TrackingStore>,
        Arc::new(NullFetcher),
        cache.clone(),
        PollerConfig {
            max_checks: 2,
            interval: Duration::from_millis(1),
        },
    );

    let state = ApiState {
        store: store.clone() as Arc<dyn TrackingStore>,
        calendar: Arc::new(calendar),
        notetakers: notetakers as Arc<dyn NotetakerApi>,
        cache: cache.clone(),
        pollers,
        nylas_config: NylasConfig {
            grant_id: "grant-test".to_string(),
            ..NylasConfig::default()
        },
    };

    TestApp {
        router: ApiServer::router(state),
        store,
        cache,
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_service_info() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, body) = send(&app.router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "meetscribe");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_auth_status() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, body) = send(&app.router, get("/auth/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["grant_id"], "grant-test");
    assert_eq!(body["email"], "user@example.com");
}

#[tokio::test]
async fn test_transcript_status_not_found() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, body) = send(&app.router, get("/transcripts/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_transcript_status_renders_dialogue() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    app.store
        .insert("bot-1", TrackingStatus::Processing, None)
        .await
        .unwrap();
    app.store
        .update_fields(
            "bot-1",
            TrackingUpdate::ready(vec![
                TranscriptSegment::new("Alice", "Hello"),
                TranscriptSegment::new("Bob", "Hi"),
            ]),
        )
        .await
        .unwrap();

    let (status, body) = send(&app.router, get("/transcripts/bot-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["display_status"], "Media Available");
    assert_eq!(body["transcript_text"], "Alice: Hello\n\nBob: Hi");
}

#[tokio::test]
async fn test_transcript_status_failure_reason_surfaced() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    app.store
        .insert("bot-1", TrackingStatus::Scheduled, None)
        .await
        .unwrap();
    app.store
        .update_fields(
            "bot-1",
            TrackingUpdate::terminal_failure(
                TrackingStatus::Failed,
                "transcript fetch failed: HTTP status 404",
            ),
        )
        .await
        .unwrap();

    let (status, body) = send(&app.router, get("/transcripts/bot-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert!(body["failure_reason"]
        .as_str()
        .unwrap()
        .contains("404"));
}

#[tokio::test]
async fn test_transcript_status_falls_back_to_cache() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    app.cache.put("lost-bot", "Hello from cache".to_string()).await;

    let (status, body) = send(&app.router, get("/transcripts/lost-bot")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["transcript_text"], "Hello from cache");
}

#[tokio::test]
async fn test_list_recordings() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    app.store
        .insert("bot-1", TrackingStatus::Recording, None)
        .await
        .unwrap();
    app.store
        .insert("bot-2", TrackingStatus::Scheduled, None)
        .await
        .unwrap();

    let (status, body) = send(&app.router, get("/recordings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["recordings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_recording() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    app.store
        .insert("bot-1", TrackingStatus::Ready, None)
        .await
        .unwrap();
    app.cache.put("bot-1", "cached".to_string()).await;

    let (status, body) = send(&app.router, delete("/recordings/bot-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(app.store.find("bot-1").await.unwrap().is_none());
    assert!(app.cache.get("bot-1").await.is_none());

    let (status, _) = send(&app.router, delete("/recordings/bot-1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_schedule_meeting_deploys_by_invite() {
    // The created event carries no embedded notetaker, so the handler
    // falls back to a direct invitation.
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, body) = send(
        &app.router,
        post_json(
            "/schedule-meeting",
            json!({
                "title": "Roadmap review",
                "meeting_link": "https://meet.google.com/abc-defg-hij",
                "start_time": "2025-10-07 10:46 AM"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["provider"], "Google Meet");
    assert_eq!(body["notetaker_id"], "bot-invited");
    assert_eq!(body["event_id"], "evt-created");

    let record = app.store.find("bot-invited").await.unwrap().unwrap();
    assert_eq!(record.event_id.as_deref(), Some("evt-created"));
}

#[tokio::test]
async fn test_schedule_meeting_uses_embedded_notetaker() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: Some("bot-embedded".to_string()),
    });

    let (status, body) = send(
        &app.router,
        post_json(
            "/schedule-meeting",
            json!({
                "title": "Standup",
                "meeting_link": "https://meet.google.com/abc-defg-hij",
                "start_time": "2025-10-07 09:00 AM"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notetaker_id"], "bot-embedded");
    assert!(app.store.find("bot-embedded").await.unwrap().is_some());
}

#[tokio::test]
async fn test_schedule_meeting_rejects_bad_zoom_link() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, body) = send(
        &app.router,
        post_json(
            "/schedule-meeting",
            json!({
                "title": "1:1",
                "meeting_link": "https://zoom.us/wc/123/join",
                "start_time": "2025-10-07 10:00 AM"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Zoom"));
}

#[tokio::test]
async fn test_schedule_meeting_rejects_bad_time() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, _) = send(
        &app.router,
        post_json(
            "/schedule-meeting",
            json!({
                "title": "1:1",
                "meeting_link": "https://meet.google.com/abc-defg-hij",
                "start_time": "next tuesday"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auto_deploy_bot() {
    let app = test_app(MockCalendar {
        event: Some(event_with_link(
            "evt-9",
            Some("https://meet.google.com/xyz-1234"),
            None,
        )),
        embedded_notetaker: None,
    });

    let (status, body) = send(
        &app.router,
        post_json("/auto-deploy-bot", json!({"event_id": "evt-9"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notetaker_id"], "bot-invited");
    assert_eq!(body["event_id"], "evt-9");
    assert!(app.store.find("bot-invited").await.unwrap().is_some());
}

#[tokio::test]
async fn test_auto_deploy_bot_without_link_rejected() {
    let app = test_app(MockCalendar {
        event: Some(event_with_link("evt-9", None, None)),
        embedded_notetaker: None,
    });

    let (status, body) = send(
        &app.router,
        post_json("/auto-deploy-bot", json!({"event_id": "evt-9"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("meeting link"));
}

#[tokio::test]
async fn test_auto_deploy_bot_missing_event() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, _) = send(
        &app.router,
        post_json("/auto-deploy-bot", json!({"event_id": "evt-404"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_calendar_event_cascades() {
    let app = test_app(MockCalendar {
        event: Some(event_with_link(
            "evt-9",
            Some("https://meet.google.com/xyz-1234"),
            None,
        )),
        embedded_notetaker: None,
    });

    app.store
        .insert("bot-1", TrackingStatus::Ready, Some("evt-9"))
        .await
        .unwrap();
    app.store
        .insert("bot-2", TrackingStatus::Failed, Some("evt-9"))
        .await
        .unwrap();

    let (status, body) = send(&app.router, delete("/calendar-events/evt-9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["calendar_deletion"], true);
    assert_eq!(body["recordings_deleted"], 2);
    assert!(app.store.find("bot-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_calendar_event_records_only() {
    // Event already gone remotely; local tracking records still clean up.
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    app.store
        .insert("bot-1", TrackingStatus::Timeout, Some("evt-9"))
        .await
        .unwrap();

    let (status, body) = send(&app.router, delete("/calendar-events/evt-9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calendar_deletion"], false);
    assert_eq!(body["recordings_deleted"], 1);
}

#[tokio::test]
async fn test_delete_calendar_event_nothing_found() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, _) = send(&app.router, delete("/calendar-events/evt-gone")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fetch_calendar_events() {
    let app = test_app(MockCalendar {
        event: Some(event_with_link(
            "evt-9",
            Some("https://meet.google.com/xyz-1234"),
            None,
        )),
        embedded_notetaker: None,
    });

    let (status, body) = send(
        &app.router,
        post_json("/fetch-calendar-events", json!({"start_date": "2025-10-07"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_events"], 1);
    assert_eq!(
        body["events"][0]["meeting_link"],
        "https://meet.google.com/xyz-1234"
    );
    assert_eq!(body["events"][0]["conferencing_provider"], "Google Meet");
}

#[tokio::test]
async fn test_fetch_calendar_events_bad_date() {
    let app = test_app(MockCalendar {
        event: None,
        embedded_notetaker: None,
    });

    let (status, _) = send(
        &app.router,
        post_json("/fetch-calendar-events", json!({"start_date": "07-10-2025"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
