//! Disk-backed TTL cache shared by the API memoizer and the rating enricher.
//!
//! Entries survive process restarts. Expiry is decided by the reader: the
//! same physical entry can answer different TTL policies from different
//! callers.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::{debug, error, info};

const SAVE_DEBOUNCE_SECONDS: f64 = 1.0;

struct CacheInner {
    entries: HashMap<String, (f64, Value)>,
    dirty: bool,
    last_save_time: f64,
}

/// Thread-safe persistent cache storing `key -> (timestamp, value)` in a
/// single JSON file. One mutex guards both the in-memory map and every disk
/// access; the lock is never held across a network call.
pub struct PersistentTtlCache {
    cache_file: PathBuf,
    inner: Mutex<CacheInner>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub cache_file: PathBuf,
    pub file_exists: bool,
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl PersistentTtlCache {
    /// Open (or create) the cache file `file_name` under `cache_dir`.
    ///
    /// Load is tolerant: malformed entries are skipped and a wholly
    /// unreadable file resets to an empty cache. The file is created eagerly
    /// on first run so its presence is never ambiguous.
    pub fn new(cache_dir: impl AsRef<Path>, file_name: &str) -> Self {
        let cache_dir = cache_dir.as_ref();
        if let Err(e) = fs::create_dir_all(cache_dir) {
            error!("Failed to create cache directory {:?}: {}", cache_dir, e);
        }

        let cache = Self {
            cache_file: cache_dir.join(file_name),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                dirty: false,
                last_save_time: 0.0,
            }),
        };
        cache.load_from_disk();
        info!("PersistentTtlCache initialized: {:?}", cache.cache_file);
        cache
    }

    fn load_from_disk(&self) {
        let mut inner = self.inner.lock().unwrap();
        if self.cache_file.exists() {
            match fs::read_to_string(&self.cache_file) {
                Ok(raw) => match serde_json::from_str::<HashMap<String, Value>>(&raw) {
                    Ok(data) => {
                        for (key, value) in data {
                            // Only `[timestamp, value]` pairs are valid entries.
                            if let Some(pair) = value.as_array() {
                                if pair.len() == 2 {
                                    if let Some(ts) = pair[0].as_f64() {
                                        inner.entries.insert(key, (ts, pair[1].clone()));
                                    }
                                }
                            }
                        }
                        info!(
                            "Loaded {} entries from {:?}",
                            inner.entries.len(),
                            self.cache_file
                        );
                    }
                    Err(e) => {
                        error!("Error loading cache from disk: {}", e);
                        inner.entries.clear();
                    }
                },
                Err(e) => {
                    error!("Error reading cache file {:?}: {}", self.cache_file, e);
                    inner.entries.clear();
                }
            }
        } else {
            Self::save_locked(&self.cache_file, &mut inner, true);
            info!("Created new cache file at {:?}", self.cache_file);
        }
    }

    /// Write the map to disk. Non-forced saves are debounced: within the
    /// debounce window the cache is only marked dirty and the flush deferred.
    fn save_locked(cache_file: &Path, inner: &mut CacheInner, force: bool) {
        let current_time = now_secs();
        if !force && (current_time - inner.last_save_time) < SAVE_DEBOUNCE_SECONDS {
            inner.dirty = true;
            return;
        }

        let serializable: HashMap<&String, (f64, &Value)> = inner
            .entries
            .iter()
            .map(|(k, (ts, v))| (k, (*ts, v)))
            .collect();

        match serde_json::to_string_pretty(&serializable) {
            Ok(json) => match fs::write(cache_file, json) {
                Ok(()) => {
                    inner.last_save_time = current_time;
                    inner.dirty = false;
                    debug!("Saved {} entries to {:?}", inner.entries.len(), cache_file);
                }
                Err(e) => error!("Error saving cache to disk: {}", e),
            },
            Err(e) => error!("Error serializing cache: {}", e),
        }
    }

    /// Return the cached value if present and younger than `ttl`.
    /// An expired entry is evicted as a side effect of the read.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        let mut inner = self.inner.lock().unwrap();
        let cache_time = match inner.entries.get(key) {
            Some((ts, _)) => *ts,
            None => return None,
        };

        if now_secs() - cache_time >= ttl.as_secs_f64() {
            inner.entries.remove(key);
            // Eviction-triggered saves are debounced; only `set`, `clear`
            // and a non-empty sweep force the flush.
            Self::save_locked(&self.cache_file, &mut inner, false);
            return None;
        }

        inner.entries.get(key).map(|(_, value)| value.clone())
    }

    /// Upsert `(now, value)` and flush immediately so short-lived processes
    /// never lose a freshly fetched result.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(key.into(), (now_secs(), value));
        Self::save_locked(&self.cache_file, &mut inner, true);
    }

    /// Remove all entries and force-flush.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        Self::save_locked(&self.cache_file, &mut inner, true);
        info!("Cleared cache: {:?}", self.cache_file);
    }

    /// Sweep every entry older than `ttl`. A sweep that removed entries
    /// always force-flushes; an empty sweep touches neither map nor disk.
    pub fn cleanup_expired(&self, ttl: Duration) {
        let mut inner = self.inner.lock().unwrap();
        let current_time = now_secs();
        let ttl_secs = ttl.as_secs_f64();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, (ts, _))| current_time - ts >= ttl_secs)
            .map(|(k, _)| k.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        for key in &expired {
            inner.entries.remove(key);
        }
        Self::save_locked(&self.cache_file, &mut inner, true);
        info!(
            "Cleaned up {} expired entries from {:?}",
            expired.len(),
            self.cache_file
        );
    }

    pub fn get_stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        CacheStats {
            total_entries: inner.entries.len(),
            cache_file: self.cache_file.clone(),
            file_exists: self.cache_file.exists(),
        }
    }
}

impl Drop for PersistentTtlCache {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.dirty {
                Self::save_locked(&self.cache_file, &mut inner, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn set_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");

        cache.set("k", json!({"a": [1, 2, 3]}));
        assert_eq!(cache.get("k", HOUR), Some(json!({"a": [1, 2, 3]})));
        assert_eq!(cache.get("missing", HOUR), None);
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");

        cache.set("k", json!("v"));
        // Zero TTL: now - timestamp >= 0 always holds.
        assert_eq!(cache.get("k", Duration::ZERO), None);
        assert_eq!(cache.get_stats().total_entries, 0);
    }

    #[test]
    fn values_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");
            cache.set("movie:inception", json!(8.8));
            cache.set("tv:dark", json!([2017, "Netflix"]));
        }

        let reloaded = PersistentTtlCache::new(dir.path(), "api_cache.json");
        assert_eq!(reloaded.get("movie:inception", HOUR), Some(json!(8.8)));
        assert_eq!(reloaded.get("tv:dark", HOUR), Some(json!([2017, "Netflix"])));
        assert_eq!(reloaded.get_stats().total_entries, 2);
    }

    #[test]
    fn file_created_eagerly_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "fresh.json");
        assert!(cache.get_stats().file_exists);
    }

    #[test]
    fn malformed_entries_are_skipped_and_garbage_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api_cache.json");

        fs::write(
            &path,
            r#"{"good": [1000.0, "kept"], "bad": "not a pair", "short": [1.0]}"#,
        )
        .unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");
        assert_eq!(cache.get_stats().total_entries, 1);

        fs::write(&path, "{{{{ not json").unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");
        assert_eq!(cache.get_stats().total_entries, 0);
    }

    #[test]
    fn eviction_flush_is_debounced() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");

        cache.set("k", json!("v"));
        // The eviction lands inside the debounce window of the set() flush,
        // so the file still carries the entry while memory does not.
        assert_eq!(cache.get("k", Duration::ZERO), None);
        assert_eq!(cache.get_stats().total_entries, 0);

        let on_disk = fs::read_to_string(dir.path().join("api_cache.json")).unwrap();
        assert!(on_disk.contains("\"k\""));
    }

    #[test]
    fn cleanup_expired_sweeps_old_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");

        cache.set("old", json!(1));
        cache.set("new", json!(2));
        cache.cleanup_expired(Duration::ZERO);
        assert_eq!(cache.get_stats().total_entries, 0);
    }

    #[test]
    fn clear_empties_cache_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentTtlCache::new(dir.path(), "api_cache.json");
        cache.set("k", json!("v"));
        cache.clear();
        assert_eq!(cache.get("k", HOUR), None);

        let reloaded = PersistentTtlCache::new(dir.path(), "api_cache.json");
        assert_eq!(reloaded.get_stats().total_entries, 0);
    }
}
