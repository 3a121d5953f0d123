use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::StoreError;

/// Current schema version for persisted data.
/// Bump when a key's record layout changes and add a migration arm below.
pub const SCHEMA_VERSION: u32 = 1;

/// Reserved key holding the schema version
const VERSION_KEY: &str = "schema_version";

/// Thin wrapper over a directory of JSON files, one file per key.
///
/// `get` never fails: missing files and undecodable contents both yield the
/// caller-supplied default. `set` distinguishes quota exhaustion from other
/// write failures so callers can reclaim space and retry.
pub struct KeyValueStore {
    data_dir: PathBuf,
}

/// Snapshot of on-disk usage, per key and in total
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StorageUsage {
    #[serde(rename = "totalBytes")]
    pub total_bytes: u64,
    pub entries: Vec<(String, u64)>,
}

impl KeyValueStore {
    pub fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| StoreError::from_io("data_dir", e))?;
        Ok(Self { data_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    /// Read and decode the value under `key`, falling back to `default` on
    /// any failure. Decode failures are logged but never surfaced.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let path = self.key_path(key);
        if !path.exists() {
            return default;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read store file, using default");
                return default;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to parse store file, using default");
                default
            }
        }
    }

    /// Serialize and write the value under `key`.
    /// Quota exhaustion surfaces as `StoreError::QuotaExceeded`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let contents = serde_json::to_string(value).map_err(|e| StoreError::Serialize {
            key: key.to_string(),
            source: e,
        })?;
        std::fs::write(self.key_path(key), contents)
            .map_err(|e| StoreError::from_io(key, e))?;
        debug!(key = key, "Wrote store key");
        Ok(())
    }

    /// Remove the value under `key`. Returns true iff a file was deleted.
    pub fn remove(&self, key: &str) -> bool {
        let path = self.key_path(key);
        if !path.exists() {
            return false;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to remove store file");
                false
            }
        }
    }

    /// Per-key byte sizes, for the backup metadata snapshot and stats display
    pub fn usage(&self) -> StorageUsage {
        let mut usage = StorageUsage::default();

        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to read data directory for usage snapshot");
                return usage;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(key) = name.strip_suffix(".json") else {
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            usage.total_bytes += size;
            usage.entries.push((key.to_string(), size));
        }

        usage.entries.sort_by(|a, b| a.0.cmp(&b.0));
        usage
    }

    // ===== Schema Versioning =====

    pub fn schema_version(&self) -> u32 {
        self.get(VERSION_KEY, 0u32)
    }

    /// Run the startup migration. Idempotent; safe to call on every launch.
    ///
    /// A store newer than this build is left untouched and read as-is, with
    /// a warning, rather than risking a destructive downgrade.
    pub fn migrate(&self) -> Result<u32, StoreError> {
        let stored = self.schema_version();
        if stored == SCHEMA_VERSION {
            return Ok(stored);
        }
        if stored > SCHEMA_VERSION {
            warn!(
                stored = stored,
                supported = SCHEMA_VERSION,
                "Store schema is newer than this build, reading as-is"
            );
            return Ok(stored);
        }

        // stored < SCHEMA_VERSION: apply migrations in order. Version 1 is
        // the first schema, so a fresh or v0 store only needs stamping.
        debug!(from = stored, to = SCHEMA_VERSION, "Migrating store schema");
        self.set(VERSION_KEY, &SCHEMA_VERSION)?;
        Ok(SCHEMA_VERSION)
    }
}
