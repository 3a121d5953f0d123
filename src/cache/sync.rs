use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::{KeyValueStore, StoreError};

use super::fetch::{Fetch, FetchRequest};

/// Sync tag for queued question/collection mutations
pub const QUIZ_DATA_SYNC: &str = "quiz-data-sync";

/// Sync tag for queued quiz result submissions
pub const QUIZ_RESULTS_SYNC: &str = "quiz-results-sync";

/// Store key for the pending queue. Lives in the data store, not in a cache
/// generation, so activate-time cache eviction never drops queued work.
const SYNC_QUEUE_KEY: &str = "sync_queue";

/// One mutating request captured while offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub id: String,
    pub tag: String,
    pub request: FetchRequest,
    #[serde(rename = "queuedAt")]
    pub queued_at: DateTime<Utc>,
}

/// Persisted queue of offline mutations, replayed per tag when connectivity
/// returns.
///
/// Delivery is at-least-once: entries whose replay fails are re-queued, so
/// the receiving API must tolerate duplicates.
pub struct SyncQueue {
    store: Arc<KeyValueStore>,
    fetcher: Arc<dyn Fetch>,
}

impl SyncQueue {
    pub fn new(store: Arc<KeyValueStore>, fetcher: Arc<dyn Fetch>) -> Self {
        Self { store, fetcher }
    }

    fn load(&self) -> Vec<SyncEntry> {
        self.store.get(SYNC_QUEUE_KEY, Vec::new())
    }

    fn persist(&self, queue: &[SyncEntry]) -> Result<(), StoreError> {
        self.store.set(SYNC_QUEUE_KEY, &queue)
    }

    /// Queue a mutating request for deferred replay under the given tag
    pub fn enqueue(&self, tag: &str, request: FetchRequest) -> Result<String, StoreError> {
        let entry = SyncEntry {
            id: Uuid::new_v4().to_string(),
            tag: tag.to_string(),
            request,
            queued_at: Utc::now(),
        };
        let id = entry.id.clone();

        let mut queue = self.load();
        queue.push(entry);
        self.persist(&queue)?;
        debug!(tag = tag, id = %id, pending = queue.len(), "Queued offline mutation");
        Ok(id)
    }

    /// Pending entries, optionally narrowed to one tag
    pub fn pending(&self, tag: Option<&str>) -> Vec<SyncEntry> {
        self.load()
            .into_iter()
            .filter(|e| tag.map_or(true, |t| e.tag == t))
            .collect()
    }

    /// Distinct tags with pending entries
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for entry in self.load() {
            if !tags.contains(&entry.tag) {
                tags.push(entry.tag);
            }
        }
        tags
    }

    /// Replay the queue for one tag against the network, in queue order.
    ///
    /// Entries that fail with a network error go back on the queue. A server
    /// response of any status counts as delivered; retrying a request the
    /// server already rejected would loop forever.
    ///
    /// Returns the number of entries delivered.
    pub async fn drain(&self, tag: &str) -> Result<usize, StoreError> {
        let queue = self.load();
        let (to_replay, mut remaining): (Vec<SyncEntry>, Vec<SyncEntry>) =
            queue.into_iter().partition(|e| e.tag == tag);

        if to_replay.is_empty() {
            return Ok(0);
        }
        info!(tag = tag, pending = to_replay.len(), "Draining sync queue");

        let mut delivered = 0;
        for entry in to_replay {
            match self.fetcher.fetch(&entry.request).await {
                Ok(response) => {
                    debug!(id = %entry.id, status = response.status, "Replayed queued request");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "Replay failed, re-queueing");
                    remaining.push(entry);
                }
            }
        }

        self.persist(&remaining)?;
        Ok(delivered)
    }

    /// Replay everything; called when connectivity is restored
    pub async fn drain_all(&self) -> Result<usize, StoreError> {
        let mut delivered = 0;
        for tag in self.tags() {
            delivered += self.drain(&tag).await?;
        }
        Ok(delivered)
    }
}
