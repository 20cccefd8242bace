//! Process-wide fallback transcript cache.
//!
//! Maps session id to the combined plain text of a finished transcript.
//! Populated only on success, consulted when the store lookup misses.
//! Best-effort: no eviction, empty after restart. Not a source of truth.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct TranscriptCache {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl TranscriptCache {
    pub async fn put(&self, session_id: &str, text: String) {
        self.inner.lock().await.insert(session_id.to_string(), text);
    }

    pub async fn get(&self, session_id: &str) -> Option<String> {
        self.inner.lock().await.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &str) {
        self.inner.lock().await.remove(session_id);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
