use crate::api::{ApiServer, ApiState};
use crate::config::Config;
use crate::nylas::{CalendarApi, HttpNylasClient, NotetakerApi};
use crate::store::{SqliteTrackingStore, TrackingStore};
use crate::tracker::{HttpTranscriptFetcher, PollerConfig, PollerSet, TranscriptCache, TranscriptFetcher};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting meetscribe service");

    let config = Config::load()?;

    if config.nylas.api_key.is_empty() || config.nylas.grant_id.is_empty() {
        warn!(
            "Nylas credentials are not configured. Set NYLAS_API_KEY and NYLAS_GRANT_ID \
             or edit the config file; remote calls will fail until then."
        );
    }

    let store = Arc::new(SqliteTrackingStore::open_default()?);
    let client = Arc::new(HttpNylasClient::new(&config.nylas));
    let cache = TranscriptCache::default();
    let fetcher = Arc::new(HttpTranscriptFetcher::new(Duration::from_secs(
        config.poller.fetch_timeout_seconds,
    )));

    let pollers = PollerSet::new(
        client.clone() as Arc<dyn NotetakerApi>,
        store.clone() as Arc<dyn TrackingStore>,
        fetcher as Arc<dyn TranscriptFetcher>,
        cache.clone(),
        PollerConfig::from(&config.poller),
    );

    // Records left non-terminal by an earlier shutdown stay that way:
    // there is no reconciliation pass yet. PollerSet is the seam for one.

    let state = ApiState {
        store: store as Arc<dyn TrackingStore>,
        calendar: client.clone() as Arc<dyn CalendarApi>,
        notetakers: client as Arc<dyn NotetakerApi>,
        cache,
        pollers,
        nylas_config: config.nylas.clone(),
    };

    let api_server = ApiServer::new(state, config.server.port);
    api_server.start().await
}
