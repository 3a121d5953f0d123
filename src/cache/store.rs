use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::fetch::FetchResponse;

/// One cached response with its provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedEntry {
    url: String,
    #[serde(rename = "cachedAt")]
    cached_at: DateTime<Utc>,
    response: FetchResponse,
}

/// Named, versioned containers of cached responses on disk.
/// Each generation is a directory of JSON entry files under the root.
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root).context("Failed to create cache root")?;
        Ok(Self { root })
    }

    pub fn open(&self, name: &str) -> Result<CacheGeneration> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache generation '{}'", name))?;
        Ok(CacheGeneration { dir })
    }

    /// Names of all generations currently on disk
    pub fn list(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect()
    }

    /// Delete a whole generation. Missing generations are fine.
    pub fn delete(&self, name: &str) -> Result<()> {
        let dir = self.root.join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to delete cache generation '{}'", name))?;
            debug!(generation = name, "Deleted cache generation");
        }
        Ok(())
    }
}

/// A single open cache generation
pub struct CacheGeneration {
    dir: PathBuf,
}

impl CacheGeneration {
    /// Entry filename derived from the URL by hashing; URLs contain
    /// characters that are not filesystem-safe.
    fn entry_path(&self, url: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        self.dir.join(format!("{:016x}.json", hasher.finish()))
    }

    pub fn get(&self, url: &str) -> Option<FetchResponse> {
        let path = self.entry_path(url);
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CachedEntry>(&contents) {
            Ok(entry) => Some(entry.response),
            Err(e) => {
                warn!(url = url, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entry_path(url).exists()
    }

    pub fn put(&self, url: &str, response: &FetchResponse) -> Result<()> {
        let entry = CachedEntry {
            url: url.to_string(),
            cached_at: Utc::now(),
            response: response.clone(),
        };
        let contents = serde_json::to_string(&entry)?;
        std::fs::write(self.entry_path(url), contents)
            .with_context(|| format!("Failed to write cache entry for {}", url))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, CacheStorage) {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path().to_path_buf()).unwrap();
        (dir, storage)
    }

    fn response(body: &str) -> FetchResponse {
        FetchResponse {
            status: 200,
            content_type: Some("text/plain".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_put_then_get() {
        let (_dir, storage) = storage();
        let cache = storage.open("static-v1").unwrap();
        cache.put("/app.js", &response("console.log(1)")).unwrap();

        let hit = cache.get("/app.js").unwrap();
        assert_eq!(hit.body, b"console.log(1)");
        assert!(cache.get("/missing.js").is_none());
    }

    #[test]
    fn test_generations_are_isolated() {
        let (_dir, storage) = storage();
        let old = storage.open("static-v1").unwrap();
        let new = storage.open("static-v2").unwrap();
        old.put("/app.js", &response("old")).unwrap();

        assert!(new.get("/app.js").is_none());
    }

    #[test]
    fn test_list_and_delete() {
        let (_dir, storage) = storage();
        storage.open("static-v1").unwrap();
        storage.open("dynamic-v1").unwrap();

        let mut names = storage.list();
        names.sort();
        assert_eq!(names, vec!["dynamic-v1", "static-v1"]);

        storage.delete("static-v1").unwrap();
        assert_eq!(storage.list(), vec!["dynamic-v1"]);

        // Deleting a missing generation is not an error
        storage.delete("static-v1").unwrap();
    }
}
