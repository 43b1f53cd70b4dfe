//! TMDB-backed movie tools: search, details, popular, discover.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tracing::debug;

use super::{
    fmt_opt, fmt_rating, genre_id, genre_names, poster_url, year_of, MediaHit, MOVIE_GENRES,
    MOVIE_GENRE_ALIASES, TMDB_BASE,
};
use crate::cache::PersistentTtlCache;
use crate::memo::CachedApi;

const NO_KEY: &str =
    "TMDB API key not configured. Please set TMDB_API_KEY in your environment variables.";

pub struct MovieTools {
    http: reqwest::Client,
    api_key: Option<String>,
    search_cache: CachedApi,
    detail_cache: CachedApi,
}

impl MovieTools {
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

    pub async fn search_movies(&self, query: &str, year: Option<&str>) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let mut kwargs = BTreeMap::new();
        if let Some(year) = sanitize_year(year) {
            kwargs.insert("year", year);
        }

        self.search_cache
            .get_or_fetch("search_movies", &[query], &kwargs, || {
                self.fetch_search(api_key, query, kwargs.get("year").cloned())
            })
            .await
            .unwrap_or_else(|e| format!("Error searching movies: {}", e))
    }

    async fn fetch_search(
        &self,
        api_key: &str,
        query: &str,
        year: Option<String>,
    ) -> anyhow::Result<String> {
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_string()),
            ("query", query.to_string()),
            ("language", "en-US".to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(year) = year {
            params.push(("year", year));
        }

        debug!("search_movies: querying TMDB for {:?}", query);
        let response = self
            .http
            .get(format!("{}/search/movie", TMDB_BASE))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(format!("API error: {}", response.status().as_u16()));
        }

        let data: Value = response.json().await?;
        let mut hits = Vec::new();
        for movie in results_of(&data).iter().take(5) {
            let mut hit = movie_hit(movie);
            hit.trailer_url = self.trailer_url(hit.id).await;
            hits.push(hit);
        }

        if hits.is_empty() {
            return Ok(format!("No movies found for query: '{}'", query));
        }
        Ok(format_movie_hits(&hits))
    }

    pub async fn get_movie_details(&self, movie_id: i64) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let id_arg = movie_id.to_string();
        self.detail_cache
            .get_or_fetch(
                "get_movie_details",
                &[id_arg.as_str()],
                &BTreeMap::new(),
                || self.fetch_details(api_key, movie_id),
            )
            .await
            .unwrap_or_else(|e| format!("Error getting movie details: {}", e))
    }

    async fn fetch_details(&self, api_key: &str, movie_id: i64) -> anyhow::Result<String> {
        let response = self
            .http
            .get(format!("{}/movie/{}", TMDB_BASE, movie_id))
            .query(&[
                ("api_key", api_key),
                ("language", "en-US"),
                ("append_to_response", "credits,videos"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(format!(
                "Error fetching movie details: {}",
                response.status().as_u16()
            ));
        }

        let data: Value = response.json().await?;
        let runtime = data["runtime"].as_i64().unwrap_or(0);
        let duration = if runtime > 0 {
            format!("{} min", runtime)
        } else {
            "N/A".to_string()
        };
        let cast: Vec<&str> = data["credits"]["cast"]
            .as_array()
            .map(|actors| {
                actors
                    .iter()
                    .take(3)
                    .filter_map(|a| a["name"].as_str())
                    .collect()
            })
            .unwrap_or_default();

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
            "Title: {} ({})\nRating: {}\nGenre: {}\nDuration: {}\nDescription: {}\nCast: {}\nImage: {}\nTrailer: {}",
            data["title"].as_str().unwrap_or("Unknown Title"),
            year_of(data["release_date"].as_str()),
            fmt_rating(data["vote_average"].as_f64(), 10),
            genre,
            duration,
            data["overview"].as_str().unwrap_or("No description available"),
            if cast.is_empty() { "N/A".to_string() } else { cast.join(", ") },
            fmt_opt(&poster_url(data["poster_path"].as_str())),
            trailer_from_videos(&data["videos"]).as_deref().unwrap_or("N/A"),
        ))
    }

    pub async fn get_popular_movies(&self) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        self.detail_cache
            .get_or_fetch("get_popular_movies", &[], &BTreeMap::new(), || async {
                let response = self
                    .http
                    .get(format!("{}/movie/popular", TMDB_BASE))
                    .query(&[("api_key", api_key), ("language", "en-US"), ("page", "1")])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Ok(format!("API error: {}", response.status().as_u16()));
                }

                let data: Value = response.json().await?;
                let hits: Vec<MediaHit> =
                    results_of(&data).iter().take(5).map(movie_hit).collect();
                if hits.is_empty() {
                    return Ok("No popular movies found.".to_string());
                }
                Ok(format_movie_hits(&hits))
            })
            .await
            .unwrap_or_else(|e| format!("Error fetching popular movies: {}", e))
    }

    /// Genre discovery with a randomized page for diverse results; the random
    /// page makes the output non-deterministic, so this call is not memoized.
    pub async fn discover_movies(
        &self,
        genre: &str,
        min_rating: Option<f64>,
        sort_by: Option<&str>,
    ) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let Some(genre_id) = genre_id(MOVIE_GENRES, MOVIE_GENRE_ALIASES, genre) else {
            return format!("Unknown movie genre: '{}'", genre);
        };

        let page = rand::thread_rng().gen_range(1..=5);
        let mut params: Vec<(&str, String)> = vec![
            ("api_key", api_key.to_string()),
            ("with_genres", genre_id.to_string()),
            ("sort_by", sort_by.unwrap_or("popularity.desc").to_string()),
            ("language", "en-US".to_string()),
            ("page", page.to_string()),
            ("vote_count.gte", "100".to_string()),
        ];
        if let Some(min_rating) = min_rating {
            params.push(("vote_average.gte", min_rating.to_string()));
        }

        debug!(
            "discover_movies: genre={} (id={}) min_rating={:?} page={}",
            genre, genre_id, min_rating, page
        );

        let result: anyhow::Result<String> = async {
            let response = self
                .http
                .get(format!("{}/discover/movie", TMDB_BASE))
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                return Ok(format!(
                    "Error discovering movies: {}",
                    response.status().as_u16()
                ));
            }

            let data: Value = response.json().await?;
            let mut hits = Vec::new();
            for movie in results_of(&data).iter().take(5) {
                let mut hit = movie_hit(movie);
                hit.trailer_url = self.trailer_url(hit.id).await;
                hits.push(hit);
            }

            if hits.is_empty() {
                return Ok(format!("No movies found for genre: {}", genre));
            }
            Ok(format_movie_hits(&hits))
        }
        .await;

        result.unwrap_or_else(|e| format!("Error executing discover_movies: {}", e))
    }

    /// YouTube trailer lookup, memoized per movie id.
    async fn trailer_url(&self, movie_id: Option<i64>) -> Option<String> {
        let movie_id = movie_id?;
        let api_key = self.api_key.as_deref()?;

        let id_arg = movie_id.to_string();
        self.detail_cache
            .get_or_fetch(
                "get_trailer_url",
                &[id_arg.as_str()],
                &BTreeMap::new(),
                || async {
                    let response = self
                        .http
                        .get(format!("{}/movie/{}/videos", TMDB_BASE, movie_id))
                        .query(&[("api_key", api_key), ("language", "en-US")])
                        .send()
                        .await?;

                    if !response.status().is_success() {
                        return Ok(None);
                    }
                    let data: Value = response.json().await?;
                    Ok(trailer_from_videos(&data))
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

fn sanitize_year(year: Option<&str>) -> Option<String> {
    let year = year?.trim();
    if year.is_empty() || year.eq_ignore_ascii_case("none") {
        return None;
    }
    let digits: String = year.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

fn movie_hit(movie: &Value) -> MediaHit {
    let genre_ids: Vec<i64> = movie["genre_ids"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();

    MediaHit {
        id: movie["id"].as_i64(),
        title: movie["title"].as_str().unwrap_or("Unknown Title").to_string(),
        year: year_of(movie["release_date"].as_str()),
        rating: movie["vote_average"].as_f64(),
        genre: genre_names(MOVIE_GENRES, &genre_ids),
        description: movie["overview"]
            .as_str()
            .unwrap_or("No description available")
            .to_string(),
        image_url: poster_url(movie["poster_path"].as_str()),
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

fn format_movie_hits(hits: &[MediaHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "Title: {} ({})\nRating: {}\nGenre: {}\nDescription: {}\nID: {}\nImage: {}\nTrailer: {}",
                hit.title,
                hit.year,
                fmt_rating(hit.rating, 10),
                hit.genre,
                hit.description,
                hit.id.map(|id| id.to_string()).unwrap_or_else(|| "N/A".to_string()),
                fmt_opt(&hit.image_url),
                fmt_opt(&hit.trailer_url),
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
