//! REST API server for meetscribe.
//!
//! Provides HTTP endpoints for:
//! - Scheduling meetings with a notetaker bot (POST /schedule-meeting)
//! - Listing calendar events (POST /fetch-calendar-events)
//! - Deploying a bot to an existing event (POST /auto-deploy-bot)
//! - Transcript status and retrieval (GET /transcripts/:id)
//! - Listing and deleting recordings (GET /recordings, DELETE /recordings/:id)
//! - Deleting calendar events with cascade (DELETE /calendar-events/:id)
//! - Grant verification (GET /auth/status)

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use crate::config::NylasConfig;
use crate::nylas::{CalendarApi, NotetakerApi};
use crate::store::TrackingStore;
use crate::tracker::{PollerSet, TranscriptCache};

/// Shared state for all routes.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn TrackingStore>,
    pub calendar: Arc<dyn CalendarApi>,
    pub notetakers: Arc<dyn NotetakerApi>,
    pub cache: TranscriptCache,
    pub pollers: PollerSet,
    pub nylas_config: NylasConfig,
}

pub struct ApiServer {
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(state: ApiState, port: u16) -> Self {
        Self { port, state }
    }

    /// Build the full application router. Split out so tests can drive it
    /// without binding a socket.
    pub fn router(state: ApiState) -> Router {
        Router::new()
            .route("/", get(service_info))
            .route("/auth/status", get(auth_status))
            .merge(routes::meetings::router())
            .merge(routes::recordings::router())
            .with_state(state)
            .layer(ServiceBuilder::new())
    }

    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.state);

        let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", self.port)).await?;

        info!("API server listening on http://0.0.0.0:{}", self.port);
        info!("Endpoints:");
        info!("  GET    /                      - Service info");
        info!("  GET    /auth/status           - Verify calendar grant");
        info!("  POST   /schedule-meeting      - Schedule meeting with bot");
        info!("  POST   /fetch-calendar-events - List calendar events");
        info!("  POST   /auto-deploy-bot       - Deploy bot to existing event");
        info!("  GET    /transcripts/:id       - Transcript status");
        info!("  GET    /recordings            - List all recordings");
        info!("  DELETE /recordings/:id        - Delete a recording");
        info!("  DELETE /calendar-events/:id   - Delete event and recordings");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "meetscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Verify the configured grant against the calendar service. Reports
/// rather than fails: an unauthenticated deployment still answers.
async fn auth_status(State(state): State<ApiState>) -> Json<Value> {
    match state.calendar.find_grant().await {
        Ok(grant) => Json(json!({
            "authenticated": true,
            "message": "Successfully authenticated with the calendar service",
            "grant_id": state.nylas_config.grant_id,
            "email": grant.email,
            "provider": grant.provider,
            "status": grant.grant_status,
        })),
        Err(err) => Json(json!({
            "authenticated": false,
            "message": format!("Authentication check failed: {}", err),
            "grant_id": state.nylas_config.grant_id,
        })),
    }
}
