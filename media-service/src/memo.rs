//! Cache-aside memoization for content API calls.
//!
//! The Python-era decorator becomes an explicit handle: each tool operation
//! owns a [`CachedApi`] with its TTL fixed at construction, all sharing one
//! [`PersistentTtlCache`] file.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::PersistentTtlCache;

#[derive(Clone)]
pub struct CachedApi {
    cache: Arc<PersistentTtlCache>,
    ttl: Duration,
}

impl CachedApi {
    pub fn new(cache: Arc<PersistentTtlCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Deterministic key from function identity plus canonicalized arguments.
    /// Keyword arguments are sorted (BTreeMap iteration order) so call-site
    /// ordering never produces distinct keys.
    pub fn cache_key(func: &str, args: &[&str], kwargs: &BTreeMap<&str, String>) -> String {
        format!("{}:{:?}:{:?}", func, args, kwargs)
    }

    /// Consult the cache before invoking `fetch`. A failing call is never
    /// memoized and will be retried on the next invocation.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        func: &str,
        args: &[&str],
        kwargs: &BTreeMap<&str, String>,
        fetch: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let key = Self::cache_key(func, args, kwargs);

        if let Some(cached) = self.cache.get(&key, self.ttl) {
            if let Ok(value) = serde_json::from_value::<T>(cached) {
                debug!("cache HIT {}", key);
                return Ok(value);
            }
        }
        debug!("cache MISS {}", key);

        let result = fetch().await?;
        if let Ok(value) = serde_json::to_value(&result) {
            self.cache.set(key, value);
        }
        Ok(result)
    }
}
