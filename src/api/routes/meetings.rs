//! Scheduling and calendar endpoints.
//!
//! These handlers talk to the calendar service, insert the tracking
//! record, and hand the session id to the poller supervisor. The polling
//! itself runs long after the response has gone out.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::meeting::{self, ConferencingProvider};
use crate::nylas::{
    Conferencing, ConferencingDetails, CreateEventRequest, EventNotetakerRequest,
    EventWhenRequest, InviteNotetakerRequest, MeetingSettings, RemoteError,
};
use crate::store::TrackingStatus;

const EVENT_TIMEZONE: &str = "Asia/Kolkata";

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/schedule-meeting", post(schedule_meeting))
        .route("/fetch-calendar-events", post(fetch_calendar_events))
        .route("/auto-deploy-bot", post(auto_deploy_bot))
        .route("/calendar-events/:id", delete(delete_calendar_event))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleMeetingRequest {
    pub title: String,
    /// Google Meet, Zoom, Microsoft Teams, or Skype URL.
    pub meeting_link: String,
    /// IST wall-clock, `"YYYY-MM-DD HH:MM AM/PM"`.
    pub start_time: String,
}

/// POST /schedule-meeting - Create a calendar event and deploy the bot.
async fn schedule_meeting(
    State(state): State<ApiState>,
    Json(request): Json<ScheduleMeetingRequest>,
) -> ApiResult<Json<Value>> {
    let provider = meeting::detect_provider(&request.meeting_link)?;
    let window = meeting::parse_meeting_start(&request.start_time)?;

    let mut event_request = CreateEventRequest {
        title: request.title.clone(),
        when: EventWhenRequest {
            start_time: window.start_timestamp(),
            end_time: window.end_timestamp(),
            start_timezone: EVENT_TIMEZONE.to_string(),
            end_timezone: EVENT_TIMEZONE.to_string(),
        },
        conferencing: Some(Conferencing {
            provider: Some(provider.as_str().to_string()),
            details: Some(ConferencingDetails {
                url: Some(request.meeting_link.clone()),
            }),
        }),
        notetaker: None,
    };

    // Zoom bots join more reliably via direct invitation, so the event is
    // created bare for Zoom and the bot invited afterwards.
    if !provider.deploys_by_invite() {
        event_request.notetaker = Some(EventNotetakerRequest {
            name: state.nylas_config.bot_name.clone(),
            meeting_settings: MeetingSettings {
                summary: Some(true),
                ..MeetingSettings::default()
            },
        });
    }

    info!(
        "Creating calendar event '{}' with provider {}",
        request.title,
        provider.as_str()
    );
    let event = state
        .calendar
        .create_event(&state.nylas_config.calendar_id, &event_request)
        .await?;

    let mut notetaker_id = event.notetaker_id().map(str::to_string);
    let mut bot_error: Option<String> = None;

    if notetaker_id.is_none() || provider.deploys_by_invite() {
        match invite_bot(&state, &request.meeting_link, provider).await {
            Ok(id) => notetaker_id = Some(id),
            Err(err) => {
                warn!(
                    "Failed to deploy bot to {} meeting: {}",
                    provider.as_str(),
                    err
                );
                bot_error = Some(err.to_string());
            }
        }
    }

    if let Some(id) = &notetaker_id {
        state
            .store
            .insert(id, TrackingStatus::Scheduled, Some(&event.id))
            .await?;
        state.pollers.spawn(id.clone()).await;
        info!(
            "Meeting scheduled: '{}' at {}, notetaker {}",
            request.title,
            window.display_start(),
            id
        );
    } else {
        warn!("Calendar event {} created but bot deployment failed", event.id);
    }

    let bot_status = match (&notetaker_id, &bot_error) {
        (Some(_), _) => "Configured to join at the scheduled time".to_string(),
        (None, Some(err)) => format!("Failed to configure bot: {}", err),
        (None, None) => "Failed to configure bot".to_string(),
    };

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Meeting scheduled with {} as conferencing provider.",
            provider.as_str()
        ),
        "event_id": event.id,
        "title": request.title,
        "start_time": window.display_start(),
        "meeting_link": request.meeting_link,
        "provider": provider.as_str(),
        "calendar_link": format!("https://calendar.google.com/calendar/event?eid={}", event.id),
        "notetaker_id": notetaker_id,
        "bot_status": bot_status,
    })))
}

async fn invite_bot(
    state: &ApiState,
    meeting_link: &str,
    provider: ConferencingProvider,
) -> Result<String, RemoteError> {
    info!("Inviting bot to {} meeting: {}", provider.as_str(), meeting_link);
    let request = InviteNotetakerRequest {
        meeting_link: meeting_link.to_string(),
        name: state.nylas_config.bot_name.clone(),
        meeting_settings: MeetingSettings {
            diarization: Some(true),
            ..MeetingSettings::default()
        },
    };
    state.notetakers.invite_notetaker(&request).await
}

#[derive(Debug, Deserialize)]
pub struct FetchEventsRequest {
    /// IST date, `"YYYY-MM-DD"`.
    pub start_date: String,
    pub end_date: Option<String>,
    pub calendar_id: Option<String>,
}

/// POST /fetch-calendar-events - List events with their meeting links.
async fn fetch_calendar_events(
    State(state): State<ApiState>,
    Json(request): Json<FetchEventsRequest>,
) -> ApiResult<Json<Value>> {
    let (start, end) = meeting::parse_date_range(&request.start_date, request.end_date.as_deref())?;
    let calendar_id = request
        .calendar_id
        .unwrap_or_else(|| state.nylas_config.calendar_id.clone());

    let events = state
        .calendar
        .list_events(&calendar_id, start.timestamp(), end.timestamp())
        .await?;

    let events: Vec<Value> = events
        .iter()
        .map(|event| {
            let when = event.when.as_ref();
            json!({
                "event_id": event.id,
                "title": event.title.as_deref().unwrap_or("Untitled"),
                "status": event.status.as_deref().unwrap_or("unknown"),
                "start_time": when
                    .and_then(|w| w.start_time)
                    .and_then(meeting::format_timestamp),
                "end_time": when
                    .and_then(|w| w.end_time)
                    .and_then(meeting::format_timestamp),
                "meeting_link": event.meeting_link(),
                "conferencing_provider": event
                    .conferencing
                    .as_ref()
                    .and_then(|c| c.provider.as_deref()),
            })
        })
        .collect();

    Ok(Json(json!({
        "total_events": events.len(),
        "date_range": {
            "start": format!("{} IST", start.format("%Y-%m-%d %I:%M %p")),
            "end": format!("{} IST", end.format("%Y-%m-%d %I:%M %p")),
        },
        "events": events,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AutoDeployBotRequest {
    pub event_id: String,
    pub calendar_id: Option<String>,
}

/// POST /auto-deploy-bot - Deploy the bot to an existing calendar event.
async fn auto_deploy_bot(
    State(state): State<ApiState>,
    Json(request): Json<AutoDeployBotRequest>,
) -> ApiResult<Json<Value>> {
    let calendar_id = request
        .calendar_id
        .unwrap_or_else(|| state.nylas_config.calendar_id.clone());

    let event = state
        .calendar
        .find_event(&request.event_id, &calendar_id)
        .await?;

    let meeting_link = event.meeting_link().ok_or_else(|| {
        ApiError::bad_request(
            "No meeting link found in the calendar event. \
             Ensure the event has a conferencing URL.",
        )
    })?;

    let invite = InviteNotetakerRequest {
        meeting_link: meeting_link.to_string(),
        name: state.nylas_config.bot_name.clone(),
        meeting_settings: MeetingSettings::default(),
    };
    let notetaker_id = state.notetakers.invite_notetaker(&invite).await?;

    // The meeting may already be underway, so tracking starts at
    // processing rather than scheduled.
    state
        .store
        .insert(&notetaker_id, TrackingStatus::Processing, Some(&event.id))
        .await?;
    state.pollers.spawn(notetaker_id.clone()).await;

    info!(
        "Bot {} deployed to existing event {}",
        notetaker_id, event.id
    );

    Ok(Json(json!({
        "message": "Bot successfully deployed to the meeting.",
        "notetaker_id": notetaker_id,
        "event_id": event.id,
        "event_title": event.title.as_deref().unwrap_or("Untitled"),
        "meeting_link": meeting_link,
        "status": "Bot will join the meeting and start recording",
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteEventParams {
    pub calendar_id: Option<String>,
}

/// DELETE /calendar-events/:id - Delete an event and cascade to its
/// tracking records.
async fn delete_calendar_event(
    Path(event_id): Path<String>,
    Query(params): Query<DeleteEventParams>,
    State(state): State<ApiState>,
) -> ApiResult<Json<Value>> {
    let calendar_id = params
        .calendar_id
        .unwrap_or_else(|| state.nylas_config.calendar_id.clone());

    // The event may be gone remotely while tracking records remain, so
    // remote not-found does not abort the cleanup.
    let (event_title, calendar_deleted, deletion_error) =
        match state.calendar.find_event(&event_id, &calendar_id).await {
            Ok(event) => {
                let title = event.title.unwrap_or_else(|| "Untitled".to_string());
                match state.calendar.destroy_event(&event_id, &calendar_id).await {
                    Ok(()) => (title, true, None),
                    Err(RemoteError::NotFound(_)) => (title, false, None),
                    Err(err) => {
                        warn!("Calendar deletion failed for {}: {}", event_id, err);
                        (title, false, Some(err.to_string()))
                    }
                }
            }
            Err(RemoteError::NotFound(_)) => ("Unknown".to_string(), false, None),
            Err(err) => {
                warn!("Could not look up event {}: {}", event_id, err);
                ("Unknown".to_string(), false, Some(err.to_string()))
            }
        };

    let recordings_deleted = state.store.delete_by_event(&event_id).await?;
    if recordings_deleted > 0 {
        info!(
            "Deleted {} recording(s) associated with event {}",
            recordings_deleted, event_id
        );
    }

    if !calendar_deleted && recordings_deleted == 0 {
        return Err(ApiError::not_found(format!(
            "Event '{}' not found in calendar or database. It may have been already deleted.",
            event_id
        )));
    }

    let mut body = json!({
        "success": true,
        "deleted_event_id": event_id,
        "event_title": event_title,
        "calendar_deletion": calendar_deleted,
        "recordings_deleted": recordings_deleted,
        "message": "Event deleted successfully.",
    });
    if let Some(err) = deletion_error {
        body["warning"] = json!(format!("Calendar deletion had issues: {}", err));
    }

    Ok(Json(body))
}
