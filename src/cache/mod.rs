// Allow dead code: the message protocol and fetch interception run in the
// worker context; the CLI binary only installs and syncs.
#![allow(dead_code)]

//! Offline caching layer.
//!
//! This module intercepts outbound fetches and applies a caching strategy
//! per URL classification, manages versioned cache generation
//! lifecycle (install, activate, eviction), and keeps a persisted queue of
//! mutating requests made while offline for later replay.
//!
//! The network sits behind the `Fetch` trait so strategies can be tested
//! against a scripted fake.

pub mod controller;
pub mod fetch;
pub mod messages;
pub mod store;
pub mod sync;

pub use controller::{CacheConfig, CacheController, Strategy};
pub use fetch::{Fetch, FetchError, FetchRequest, FetchResponse, HttpFetcher};
pub use messages::{ClientMessage, WorkerMessage};
pub use store::{CacheGeneration, CacheStorage};
pub use sync::{SyncEntry, SyncQueue, QUIZ_DATA_SYNC, QUIZ_RESULTS_SYNC};
