//! Application context wiring.
//!
//! `AppContext` is the explicitly constructed object holding the store and
//! every component built on it. Components never reach for globals; anything
//! needing data access receives this context (or a piece of it) at
//! construction time.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tracing::debug;

use crate::config::Config;
use crate::import_export::ImportExportEngine;
use crate::repo::{
    history::DEFAULT_RETENTION_DAYS, CollectionRepository, HistoryLedger, QuestionRepository,
};
use crate::store::KeyValueStore;

pub struct AppContext {
    pub store: Arc<KeyValueStore>,
    pub questions: QuestionRepository,
    pub history: HistoryLedger,
    pub collections: CollectionRepository,
    pub engine: ImportExportEngine,
}

impl AppContext {
    /// Build the context and run the schema migration
    pub fn new(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        debug!(data_dir = %data_dir.display(), "Opening key-value store");

        let store = Arc::new(
            KeyValueStore::new(data_dir).context("Failed to open key-value store")?,
        );
        store.migrate().context("Schema migration failed")?;

        Ok(Self {
            questions: QuestionRepository::new(store.clone()),
            history: HistoryLedger::new(store.clone()),
            collections: CollectionRepository::new(store.clone()),
            engine: ImportExportEngine::new(store.clone()),
            store,
        })
    }

    /// Startup maintenance: evict quiz history past the retention window.
    /// Idempotent, runs on every launch. Returns the evicted count.
    pub fn run_startup_eviction(&self) -> Result<usize> {
        let evicted = self
            .history
            .evict_stale(Duration::days(DEFAULT_RETENTION_DAYS))
            .context("Stale history eviction failed")?;
        Ok(evicted)
    }
}
