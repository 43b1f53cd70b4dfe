//! TMDB-backed TV tools: search, details, popular, discover.
//!
//! Search results are enriched with per-show season/episode counts from the
//! details endpoint, so specialists always see the full picture.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tracing::debug;

use super::{
    fmt_opt, fmt_rating, genre_id, genre_names, poster_url, year_of, MediaHit, TMDB_BASE,
    TV_GENRES, TV_GENRE_ALIASES,
};
use crate::cache::PersistentTtlCache;
use crate::memo::CachedApi;

const NO_KEY: &str =
    "TMDB API key not configured. Please set TMDB_API_KEY in your environment variables.";

pub struct TvTools {
    http: reqwest::Client,
    api_key: Option<String>,
    search_cache: CachedApi,
    detail_cache: CachedApi,
}

impl TvTools {
    pub fn new(
        http: reqwest::Client,
        api_key: Option<String>,
        cache: Arc<PersistentTtlCache>,
    ) -> Self {
        Self {
            http,
            api_key,
            search_cache: CachedApi::new(cache.clone(), Duration::from_secs(300)),
            detail_cache: CachedApi::new(cache, Duration::from_secs(3600)),
        }
    }

    pub async fn search_tv_shows(&self, query: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        self.search_cache
            .get_or_fetch("search_tv_shows", &[query], &BTreeMap::new(), || {
                self.fetch_search(api_key, query)
            })
            .await
            .unwrap_or_else(|e| format!("Error searching TV shows: {}", e))
    }

    async fn fetch_search(&self, api_key: &str, query: &str) -> anyhow::Result<String> {
        debug!("search_tv_shows: querying TMDB for {:?}", query);
        let response = self
            .http
            .get(format!("{}/search/tv", TMDB_BASE))
            .query(&[
                ("api_key", api_key),
                ("query", query),
                ("language", "en-US"),
                ("page", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(format!("API error: {}", response.status().as_u16()));
        }

        let data: Value = response.json().await?;
        let mut hits = Vec::new();
        for show in results_of(&data).iter().take(5) {
            let mut hit = tv_hit(show);
            if let Some((seasons, episodes)) = self.season_counts(hit.id).await {
                hit.seasons = Some(seasons);
                hit.episodes = Some(episodes);
            }
            hits.push(hit);
        }

        if hits.is_empty() {
            return Ok(format!("No TV shows found for query: '{}'", query));
        }
        Ok(format_tv_hits(&hits))
    }

    pub async fn get_tv_details(&self, tv_id: i64) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let id_arg = tv_id.to_string();
        self.detail_cache
            .get_or_fetch("get_tv_details", &[id_arg.as_str()], &BTreeMap::new(), || {
                self.fetch_details(api_key, tv_id)
            })
            .await
            .unwrap_or_else(|e| format!("Error getting TV details: {}", e))
    }

    async fn fetch_details(&self, api_key: &str, tv_id: i64) -> anyhow::Result<String> {
        let response = self
            .http
            .get(format!("{}/tv/{}", TMDB_BASE, tv_id))
            .query(&[
                ("api_key", api_key),
                ("language", "en-US"),
                ("append_to_response", "videos"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(format!(
                "Error fetching TV details: {}",
                response.status().as_u16()
            ));
        }

        let data: Value = response.json().await?;
        let genre = data["genres"]
            .as_array()
            .map(|genres| {
                genres
                    .iter()
                    .take(3)
                    .filter_map(|g| g["name"].as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(format!(
            "Title: {} ({})\nRating: {}\nGenre: {}\nSeasons: {} ({} episodes)\nDescription: {}\nImage: {}\nTrailer: {}",
            data["name"].as_str().unwrap_or("Unknown Title"),
            year_of(data["first_air_date"].as_str()),
            fmt_rating(data["vote_average"].as_f64(), 10),
            genre,
            data["number_of_seasons"].as_i64().unwrap_or(0),
            data["number_of_episodes"].as_i64().unwrap_or(0),
            data["overview"].as_str().unwrap_or("No description available"),
            fmt_opt(&poster_url(data["poster_path"].as_str())),
            trailer_from_videos(&data["videos"]).as_deref().unwrap_or("N/A"),
        ))
    }

    pub async fn get_popular_tv_shows(&self) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        self.detail_cache
            .get_or_fetch("get_popular_tv_shows", &[], &BTreeMap::new(), || async {
                let response = self
                    .http
                    .get(format!("{}/tv/popular", TMDB_BASE))
                    .query(&[("api_key", api_key), ("language", "en-US"), ("page", "1")])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Ok(format!("API error: {}", response.status().as_u16()));
                }

                let data: Value = response.json().await?;
                let hits: Vec<MediaHit> = results_of(&data).iter().take(5).map(tv_hit).collect();
                if hits.is_empty() {
                    return Ok("No popular TV shows found.".to_string());
                }
                Ok(format_tv_hits(&hits))
            })
            .await
            .unwrap_or_else(|e| format!("Error fetching popular TV shows: {}", e))
    }

    /// Genre discovery with a randomized page for diverse results; not
    /// memoized for the same reason as movie discovery.
    pub async fn discover_tv_shows(&self, genre: &str, min_rating: Option<f64>) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let Some(genre_id) = genre_id(TV_GENRES, TV_GENRE_ALIASES, genre) else {
            return format!("Unknown TV genre: '{}'", genre);
        };

        let page = rand::thread_rng().gen_range(1..=5);
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_string()),
            ("with_genres", genre_id.to_string()),
            ("sort_by", "popularity.desc".to_string()),
            ("language", "en-US".to_string()),
            ("page", page.to_string()),
            ("vote_count.gte", "100".to_string()),
        ];
        if let Some(min_rating) = min_rating {
            params.push(("vote_average.gte", min_rating.to_string()));
        }

        debug!(
            "discover_tv_shows: genre={} (id={}) min_rating={:?} page={}",
            genre, genre_id, min_rating, page
        );

        let result: anyhow::Result<String> = async {
            let response = self
                .http
                .get(format!("{}/discover/tv", TMDB_BASE))
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                return Ok(format!(
                    "Error discovering TV shows: {}",
                    response.status().as_u16()
                ));
            }

            let data: Value = response.json().await?;
            let mut hits = Vec::new();
            for show in results_of(&data).iter().take(5) {
                let mut hit = tv_hit(show);
                if let Some((seasons, episodes)) = self.season_counts(hit.id).await {
                    hit.seasons = Some(seasons);
                    hit.episodes = Some(episodes);
                }
                hits.push(hit);
            }

            if hits.is_empty() {
                return Ok(format!("No TV shows found for genre: {}", genre));
            }
            Ok(format_tv_hits(&hits))
        }
        .await;

        result.unwrap_or_else(|e| format!("Error executing discover_tv_shows: {}", e))
    }

    /// Season/episode counts for one show, memoized per id.
    async fn season_counts(&self, tv_id: Option<i64>) -> Option<(i64, i64)> {
        let tv_id = tv_id?;
        let api_key = self.api_key.as_deref()?;

        let id_arg = tv_id.to_string();
        self.detail_cache
            .get_or_fetch(
                "get_season_counts",
                &[id_arg.as_str()],
                &BTreeMap::new(),
                || async {
                    let response = self
                        .http
                        .get(format!("{}/tv/{}", TMDB_BASE, tv_id))
                        .query(&[("api_key", api_key), ("language", "en-US")])
                        .send()
                        .await?;

                    if !response.status().is_success() {
                        return Ok(None);
                    }
                    let data: Value = response.json().await?;
                    Ok(match (
                        data["number_of_seasons"].as_i64(),
                        data["number_of_episodes"].as_i64(),
                    ) {
                        (Some(s), Some(e)) => Some((s, e)),
                        _ => None,
                    })
                },
            )
            .await
            .ok()
            .flatten()
    }
}

fn results_of(data: &Value) -> Vec<Value> {
    data["results"].as_array().cloned().unwrap_or_default()
}

fn tv_hit(show: &Value) -> MediaHit {
    let genre_ids: Vec<i64> = show["genre_ids"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();

    MediaHit {
        id: show["id"].as_i64(),
        title: show["name"].as_str().unwrap_or("Unknown Title").to_string(),
        year: year_of(show["first_air_date"].as_str()),
        rating: show["vote_average"].as_f64(),
        genre: genre_names(TV_GENRES, &genre_ids),
        description: show["overview"]
            .as_str()
            .unwrap_or("No description available")
            .to_string(),
        image_url: poster_url(show["poster_path"].as_str()),
        ..Default::default()
    }
}

fn trailer_from_videos(videos: &Value) -> Option<String> {
    videos["results"].as_array()?.iter().find_map(|video| {
        if video["site"].as_str() == Some("YouTube") && video["type"].as_str() == Some("Trailer") {
            video["key"]
                .as_str()
                .map(|key| format!("https://www.youtube.com/watch?v={}", key))
        } else {
            None
        }
    })
}

fn format_tv_hits(hits: &[MediaHit]) -> String {
    hits.iter()
        .map(|hit| {
            let seasons = hit
                .seasons
                .map(|s| s.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            let episodes = hit
                .episodes
                .map(|e| e.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            format!(
                "Title: {} ({})\nRating: {}\nGenre: {}\nSeasons: {} Episodes: {}\nDescription: {}\nID: {}\nImage: {}",
                hit.title,
                hit.year,
                fmt_rating(hit.rating, 10),
                hit.genre,
                seasons,
                episodes,
                hit.description,
                hit.id.map(|id| id.to_string()).unwrap_or_else(|| "N/A".to_string()),
                fmt_opt(&hit.image_url),
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
