//! Google Books tools: search and details. Book ratings are on a 0-5 scale.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::PersistentTtlCache;
use crate::memo::CachedApi;

use super::{fmt_opt, MediaHit};

const BOOKS_BASE: &str = "https://www.googleapis.com/books/v1";
const NO_KEY: &str =
    "Google Books API key not configured. Please set GOOGLE_BOOKS_API_KEY in your environment variables.";

pub struct BookTools {
    http: reqwest::Client,
    api_key: Option<String>,
    search_cache: CachedApi,
    detail_cache: CachedApi,
}

impl BookTools {
    pub fn new(
        http: reqwest::Client,
        api_key: Option<String>,
        cache: Arc<PersistentTtlCache>,
    ) -> Self {
        Self {
            http,
            api_key,
            search_cache: CachedApi::new(cache.clone(), Duration::from_secs(600)),
            detail_cache: CachedApi::new(cache, Duration::from_secs(3600)),
        }
    }

    pub async fn search_books(&self, query: &str, genre: Option<&str>) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        let mut kwargs = BTreeMap::new();
        if let Some(genre) = genre {
            kwargs.insert("genre", genre.to_lowercase());
        }

        self.search_cache
            .get_or_fetch("search_books", &[query], &kwargs, || {
                self.fetch_search(api_key, query, kwargs.get("genre").cloned())
            })
            .await
            .unwrap_or_else(|e| format!("Error searching books: {}", e))
    }

    async fn fetch_search(
        &self,
        api_key: &str,
        query: &str,
        genre: Option<String>,
    ) -> anyhow::Result<String> {
        debug!("search_books: querying Google Books for {:?}", query);
        let response = self
            .http
            .get(format!("{}/volumes", BOOKS_BASE))
            .query(&[
                ("q", query),
                ("maxResults", "8"),
                ("printType", "books"),
                ("key", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(format!("API error: {}", response.status().as_u16()));
        }

        let data: Value = response.json().await?;
        let hits: Vec<MediaHit> = data["items"]
            .as_array()
            .map(|items| items.iter().take(5).map(book_hit).collect())
            .unwrap_or_default();

        // Optional client-side genre filter over the category string.
        let hits: Vec<MediaHit> = match genre {
            Some(genre) => hits
                .into_iter()
                .filter(|hit| hit.genre.to_lowercase().contains(&genre))
                .collect(),
            None => hits,
        };

        if hits.is_empty() {
            return Ok(format!("No books found for query: '{}'", query));
        }
        Ok(format_book_hits(&hits))
    }

    pub async fn get_book_details(&self, volume_id: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return NO_KEY.to_string();
        };

        self.detail_cache
            .get_or_fetch("get_book_details", &[volume_id], &BTreeMap::new(), || async {
                let response = self
                    .http
                    .get(format!("{}/volumes/{}", BOOKS_BASE, volume_id))
                    .query(&[("key", api_key)])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Ok(format!(
                        "Error fetching book details: {}",
                        response.status().as_u16()
                    ));
                }

                let data: Value = response.json().await?;
                let hit = book_hit(&data);
                Ok(format!(
                    "Title: {}\nAuthor(s): {}\nPublished: {}\nGenre: {}\nRating: {}\nDescription: {}\nImage: {}\nPreview: {}",
                    hit.title,
                    hit.authors.join(", "),
                    hit.year,
                    hit.genre,
                    super::fmt_rating(hit.rating, 5),
                    hit.description,
                    fmt_opt(&hit.image_url),
                    fmt_opt(&hit.preview_url),
                ))
            })
            .await
            .unwrap_or_else(|e| format!("Error getting book details: {}", e))
    }
}

fn book_hit(item: &Value) -> MediaHit {
    let info = &item["volumeInfo"];

    let authors: Vec<String> = info["authors"]
        .as_array()
        .map(|authors| {
            authors
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .filter(|a: &Vec<String>| !a.is_empty())
        .unwrap_or_else(|| vec!["Unknown Author".to_string()]);

    let genre = info["categories"]
        .as_array()
        .map(|cats| {
            cats.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| "General".to_string());

    let description: String = info["description"]
        .as_str()
        .unwrap_or("No description available.")
        .chars()
        .take(300)
        .collect();

    MediaHit {
        title: info["title"].as_str().unwrap_or("Unknown Title").to_string(),
        year: super::year_of(info["publishedDate"].as_str()),
        rating: info["averageRating"].as_f64(),
        genre,
        description,
        authors,
        image_url: info["imageLinks"]["thumbnail"]
            .as_str()
            .filter(|u| !u.is_empty())
            .map(|u| u.replacen("http://", "https://", 1)),
        preview_url: info["previewLink"]
            .as_str()
            .or_else(|| info["infoLink"].as_str())
            .map(str::to_string),
        ..Default::default()
    }
}

fn format_book_hits(hits: &[MediaHit]) -> String {
    hits.iter()
        .map(|hit| {
            let short: String = hit.description.chars().take(200).collect();
            format!(
                "Title: {}\nAuthor(s): {}\nPublished: {}\nGenre: {}\nRating: {}\nDescription: {}...\nImage: {}\nPreview: {}",
                hit.title,
                hit.authors.join(", "),
                hit.year,
                hit.genre,
                super::fmt_rating(hit.rating, 5),
                short,
                fmt_opt(&hit.image_url),
                fmt_opt(&hit.preview_url),
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_key_degrades_to_error_text() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(PersistentTtlCache::new(dir.path(), "api_cache.json"));
        let tools = BookTools::new(reqwest::Client::new(), None, cache);

        let out = tools.search_books("dune", None).await;
        assert!(out.contains("Google Books API key not configured"));
        let out = tools.get_book_details("zyTCAlFPjgYC").await;
        assert!(out.contains("Google Books API key not configured"));
    }

    #[test]
    fn book_hit_maps_volume_info() {
        let hit = book_hit(&json!({
            "volumeInfo": {
                "title": "Project Hail Mary",
                "authors": ["Andy Weir"],
                "publishedDate": "2021-05-04",
                "categories": ["Fiction", "Science Fiction"],
                "averageRating": 4.8,
                "description": "A lone astronaut must save the earth.",
                "imageLinks": {"thumbnail": "http://books.google.com/phm.jpg"},
                "previewLink": "https://books.google.com/preview/phm"
            }
        }));

        assert_eq!(hit.title, "Project Hail Mary");
        assert_eq!(hit.authors, vec!["Andy Weir"]);
        assert_eq!(hit.year, "2021");
        assert_eq!(hit.rating, Some(4.8));
        assert_eq!(hit.genre, "Fiction, Science Fiction");
        assert_eq!(
            hit.image_url.as_deref(),
            Some("https://books.google.com/phm.jpg")
        );
    }

    #[test]
    fn missing_volume_fields_get_placeholders() {
        let hit = book_hit(&json!({"volumeInfo": {"title": "Bare"}}));
        assert_eq!(hit.authors, vec!["Unknown Author"]);
        assert_eq!(hit.genre, "General");
        assert_eq!(hit.year, "N/A");
        assert_eq!(hit.rating, None);
    }
}
