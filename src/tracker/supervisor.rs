//! Supervised set of poller tasks.
//!
//! Tasks are fire-and-forget, but every spawned poller is registered here
//! keyed by session id. That keeps the one-task-per-session invariant
//! enforceable and gives later extensions (cancellation, restart,
//! reconciliation after a crash) a single place to hook into.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::nylas::NotetakerApi;
use crate::store::TrackingStore;

use super::cache::TranscriptCache;
use super::fetch::TranscriptFetcher;
use super::poller::{PollerConfig, TranscriptPoller};

#[derive(Clone)]
pub struct PollerSet {
    client: Arc<dyn NotetakerApi>,
    store: Arc<dyn TrackingStore>,
    fetcher: Arc<dyn TranscriptFetcher>,
    cache: TranscriptCache,
    config: PollerConfig,
    tasks: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl PollerSet {
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
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawn a poller for a session. Returns false when one is already
    /// running for that id (a single task owns each tracking record).
    pub async fn spawn(&self, session_id: String) -> bool {
        let mut tasks = self.tasks.lock().await;
        Self::prune(&mut tasks);

        if tasks.contains_key(&session_id) {
            warn!("Poller already running for {}, not spawning another", session_id);
            return false;
        }

        let poller = TranscriptPoller::new(
            self.client.clone(),
            self.store.clone(),
            self.fetcher.clone(),
            self.cache.clone(),
            self.config.clone(),
        );

        let id = session_id.clone();
        let handle = tokio::spawn(async move {
            poller.run(&id).await;
        });

        info!("Spawned poller for {}", session_id);
        tasks.insert(session_id, handle);
        true
    }

    pub async fn is_active(&self, session_id: &str) -> bool {
        let mut tasks = self.tasks.lock().await;
        Self::prune(&mut tasks);
        tasks.contains_key(session_id)
    }

    pub async fn active_count(&self) -> usize {
        let mut tasks = self.tasks.lock().await;
        Self::prune(&mut tasks);
        tasks.len()
    }

    fn prune(tasks: &mut HashMap<String, JoinHandle<()>>) {
        tasks.retain(|_, handle| !handle.is_finished());
    }
}
