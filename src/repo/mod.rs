// Allow dead code: repositories are the data API for the quiz UI; the CLI
// binary exercises a subset.
#![allow(dead_code)]

//! Repositories over the key-value store.
//!
//! Each repository owns the decoded view of its records for the duration of
//! a single call only: every operation re-reads from the store, so the store
//! stays the single source of truth across processes.
//!
//! Writes share a quota-recovery path: on `QuotaExceeded` the oldest history
//! and the import log are evicted and the write retried once.

pub mod collections;
pub mod history;
pub mod questions;

pub use collections::CollectionRepository;
pub use history::{HistoryLedger, HistoryStats};
pub use questions::{QuestionRepository, SearchFilters};

use serde::Serialize;
use tracing::warn;

use crate::models::QuizResult;
use crate::store::{KeyValueStore, StoreError};

/// History entries kept after quota-driven eviction.
/// Half the normal cap; trimming by one entry rarely frees enough space.
const RECLAIM_HISTORY_KEEP: usize = 50;

/// Free space by evicting the oldest quiz history beyond half the cap and
/// dropping the import log. Called when a write hits the storage quota.
pub(crate) fn reclaim_space(store: &KeyValueStore) {
    let mut history: Vec<QuizResult> = store.get(history::HISTORY_KEY, Vec::new());
    if history.len() > RECLAIM_HISTORY_KEEP {
        history.truncate(RECLAIM_HISTORY_KEEP);
        if let Err(e) = store.set(history::HISTORY_KEY, &history) {
            warn!(error = %e, "Failed to trim history during space reclamation");
        }
    }
    store.remove(crate::import_export::IMPORT_LOG_KEY);
}

/// Write a value, reclaiming space and retrying once on quota exhaustion
pub(crate) fn write_with_reclaim<T: Serialize>(
    store: &KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    match store.set(key, value) {
        Ok(()) => Ok(()),
        Err(e) if e.is_quota_exceeded() => {
            warn!(key = key, "Storage quota exceeded, evicting old data and retrying");
            reclaim_space(store);
            store.set(key, value)
        }
        Err(e) => Err(e),
    }
}
