//! Local persistence module.
//!
//! This module provides the `KeyValueStore`, the single owner of all
//! serialized application data. Every record collection (questions, history,
//! collections, import log, sync queue) lives under its own key as a JSON
//! file in the platform data directory.
//!
//! Repositories re-read from the store on every call; nothing above this
//! layer holds a cached copy across operations.

pub mod error;
pub mod kv;

pub use error::StoreError;
pub use kv::{KeyValueStore, StorageUsage};
