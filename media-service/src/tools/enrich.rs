//! Direct (non-LLM) rating and TV-fact lookups used by the post-processor.
//!
//! Results go through the dedicated rating cache with a long TTL, distinct
//! from the general API cache, so repeated enrichment misses across the
//! whole process stay cheap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::TMDB_BASE;
use crate::cache::PersistentTtlCache;
use crate::model::MediaType;
use crate::postprocess::{EnrichmentSource, TvFacts};

const BOOKS_BASE: &str = "https://www.googleapis.com/books/v1";

pub struct ApiEnrichment {
    http: reqwest::Client,
    tmdb_api_key: Option<String>,
    google_books_api_key: Option<String>,
    rating_cache: Arc<PersistentTtlCache>,
    ttl: Duration,
}

impl ApiEnrichment {
    pub fn new(
        http: reqwest::Client,
        tmdb_api_key: Option<String>,
        google_books_api_key: Option<String>,
        rating_cache: Arc<PersistentTtlCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            http,
            tmdb_api_key,
            google_books_api_key,
            rating_cache,
            ttl,
        }
    }

    async fn tmdb_rating(&self, endpoint: &str, title: &str) -> Option<f64> {
        let api_key = self.tmdb_api_key.as_deref()?;

        let response = self
            .http
            .get(format!("{}/search/{}", TMDB_BASE, endpoint))
            .query(&[
                ("api_key", api_key),
                ("query", title),
                ("language", "en-US"),
                ("page", "1"),
            ])
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }
        let data: Value = response.json().await.ok()?;
        data["results"]
            .as_array()?
            .first()?
            .get("vote_average")?
            .as_f64()
            .filter(|r| *r > 0.0)
    }

    async fn book_rating(&self, title: &str) -> Option<f64> {
        let mut params: Vec<(&str, &str)> = vec![("q", title), ("maxResults", "1")];
        if let Some(key) = self.google_books_api_key.as_deref() {
            params.push(("key", key));
        }

        let response = self
            .http
            .get(format!("{}/volumes", BOOKS_BASE))
            .query(&params)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }
        let data: Value = response.json().await.ok()?;
        data["items"].as_array()?.first()?["volumeInfo"]["averageRating"].as_f64()
    }
}

#[async_trait]
impl EnrichmentSource for ApiEnrichment {
    async fn rating(&self, media_type: MediaType, title: &str) -> Option<f64> {
        let key = format!("{}:{}", media_type, title.to_lowercase());
        if let Some(cached) = self.rating_cache.get(&key, self.ttl) {
            debug!("rating cache HIT {}", key);
            return cached.as_f64();
        }

        let rating = match media_type {
            MediaType::Movie => self.tmdb_rating("movie", title).await,
            MediaType::Tv => self.tmdb_rating("tv", title).await,
            MediaType::Book => self.book_rating(title).await,
        }?;

        self.rating_cache.set(key, json!(rating));
        Some(rating)
    }

    async fn tv_facts(&self, title: &str) -> Option<TvFacts> {
        let key = format!("tvfacts:{}", title.to_lowercase());
        if let Some(cached) = self.rating_cache.get(&key, self.ttl) {
            return facts_from_value(&cached);
        }

        let api_key = self.tmdb_api_key.as_deref()?;

        let response = self
            .http
            .get(format!("{}/search/tv", TMDB_BASE))
            .query(&[
                ("api_key", api_key),
                ("query", title),
                ("language", "en-US"),
                ("page", "1"),
            ])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let data: Value = response.json().await.ok()?;
        let show_id = data["results"].as_array()?.first()?["id"].as_i64()?;

        let response = self
            .http
            .get(format!("{}/tv/{}", TMDB_BASE, show_id))
            .query(&[("api_key", api_key), ("language", "en-US")])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let details: Value = response.json().await.ok()?;

        let seasons = details["number_of_seasons"].as_i64()?;
        let episodes = details["number_of_episodes"].as_i64()?;
        let value = json!({"seasons": seasons, "episodes": episodes});
        self.rating_cache.set(key, value.clone());
        facts_from_value(&value)
    }
}

fn facts_from_value(value: &Value) -> Option<TvFacts> {
    Some(TvFacts {
        seasons: value["seasons"].as_i64()?.to_string(),
        episodes: value["episodes"].as_i64()?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cached_rating_short_circuits_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(PersistentTtlCache::new(dir.path(), "rating_cache.json"));
        cache.set("movie:inception", json!(8.8));

        // No API keys configured: only the cache can answer.
        let enrichment = ApiEnrichment::new(
            reqwest::Client::new(),
            None,
            None,
            cache,
            Duration::from_secs(86_400),
        );

        assert_eq!(
            enrichment.rating(MediaType::Movie, "Inception").await,
            Some(8.8)
        );
        assert_eq!(enrichment.rating(MediaType::Tv, "Nothing").await, None);
    }

    #[tokio::test]
    async fn cached_tv_facts_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(PersistentTtlCache::new(dir.path(), "rating_cache.json"));
        cache.set("tvfacts:dark", json!({"seasons": 3, "episodes": 26}));

        let enrichment = ApiEnrichment::new(
            reqwest::Client::new(),
            None,
            None,
            cache,
            Duration::from_secs(86_400),
        );

        assert_eq!(
            enrichment.tv_facts("Dark").await,
            Some(TvFacts {
                seasons: "3".to_string(),
                episodes: "26".to_string()
            })
        );
    }
}
