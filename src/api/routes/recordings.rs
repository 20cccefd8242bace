//! Recording and transcript endpoints.
//!
//! Everything here reads from the tracking store; the only mutation is
//! explicit deletion. The in-memory transcript cache acts as a secondary
//! source when the store lookup misses.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get},
    Router,
};
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::normalizer;
use crate::store::{TrackingRecord, TrackingStatus};

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/transcripts/:id", get(transcript_status))
        .route("/recordings", get(list_recordings))
        .route("/recordings/:id", delete(delete_recording))
}

/// Human-readable explanation attached to every status read.
fn status_message(status: TrackingStatus) -> &'static str {
    match status {
        TrackingStatus::Scheduled => {
            "Meeting has not started yet. The bot will join at the scheduled time."
        }
        TrackingStatus::Joining => "Bot is joining the meeting.",
        TrackingStatus::Recording => "Bot is in the meeting, recording and transcribing.",
        TrackingStatus::Processing => "Meeting ended. Generating the transcript.",
        TrackingStatus::Ready => "Transcript is ready.",
        TrackingStatus::Failed => "Transcription failed.",
        TrackingStatus::Timeout => "Transcription timed out.",
    }
}

fn record_body(record: &TrackingRecord) -> Value {
    let mut body = json!({
        "notetaker_id": record.id,
        "status": record.status.as_str(),
        "display_status": record.status.display(),
        "message": status_message(record.status),
    });

    if let Some(transcript) = &record.transcript {
        body["transcript_text"] = json!(normalizer::render_dialogue(transcript));
    }
    if let Some(reason) = &record.failure_reason {
        body["failure_reason"] = json!(reason);
    }

    body
}

/// GET /transcripts/:id - Tracking status and transcript for one session.
async fn transcript_status(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> ApiResult<Json<Value>> {
    if let Some(record) = state.store.find(&id).await? {
        return Ok(Json(record_body(&record)));
    }

    // Secondary source: the process-wide cache may still hold a transcript
    // whose record was lost.
    if let Some(text) = state.cache.get(&id).await {
        return Ok(Json(json!({
            "notetaker_id": id,
            "status": TrackingStatus::Ready.as_str(),
            "display_status": TrackingStatus::Ready.display(),
            "message": status_message(TrackingStatus::Ready),
            "transcript_text": text,
        })));
    }

    Err(ApiError::not_found(
        "Transcription job not found. Check the notetaker ID.",
    ))
}

/// GET /recordings - All tracking records.
async fn list_recordings(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let records = state.store.list_all().await?;

    let recordings: Vec<Value> = records.iter().map(record_body).collect();

    Ok(Json(json!({
        "total": recordings.len(),
        "recordings": recordings,
    })))
}

/// DELETE /recordings/:id - Delete one tracking record.
async fn delete_recording(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> ApiResult<Json<Value>> {
    let deleted = state.store.delete(&id).await?;
    if !deleted {
        return Err(ApiError::not_found(format!(
            "Recording with notetaker ID '{}' not found.",
            id
        )));
    }

    state.cache.remove(&id).await;

    Ok(Json(json!({
        "success": true,
        "message": format!("Recording '{}' deleted successfully.", id),
        "deleted_notetaker_id": id,
    })))
}
